pub mod error;
pub mod hierarchy;
pub mod mapping;
pub mod queue;
pub mod relations;
pub mod storage;
pub mod upsert;

pub use error::{Error, Result};
