pub mod schema;

pub use schema::{Config, FlattenerConfig, ReviewConfig, StorageConfig};
