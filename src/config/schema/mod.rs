mod core;
mod flattener;
mod review;
mod storage;

pub use self::core::Config;
pub use flattener::FlattenerConfig;
pub use review::ReviewConfig;
pub use storage::StorageConfig;
