#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod error;
pub mod providers;
pub mod review;
pub mod security;
pub mod storage;

pub use config::Config;
pub use error::{ArchitectError, Result};
pub use review::{ReviewOrchestrator, ReviewResponse};
pub use storage::Storage;
