pub mod cluster;
pub mod error;
pub mod memory;
pub mod query;
pub mod session;
