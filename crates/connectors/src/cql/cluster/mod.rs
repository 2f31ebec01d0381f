pub mod adapter;
pub mod params;
pub mod row;

pub use adapter::{ScyllaSession, ScyllaSessionFactory};
