pub mod data_cache;
pub mod error;

pub use data_cache::*;
pub use error::*;
