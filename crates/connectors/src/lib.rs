pub mod cql;
pub mod file;
