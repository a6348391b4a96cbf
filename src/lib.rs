pub mod cleaning;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod table;

pub use error::{Error, Result};
