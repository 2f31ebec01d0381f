pub mod driver;
pub mod encoder;
pub mod error;
pub mod flow;
pub mod validator;
pub mod writer;
