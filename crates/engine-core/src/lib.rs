pub mod connection;
pub mod error;
pub mod metrics;
