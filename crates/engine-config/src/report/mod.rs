pub mod ingest;
pub mod validation;
