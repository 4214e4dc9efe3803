pub mod engine;
pub mod flattener;
pub mod locks;
mod prompt;
pub mod reviewer;
pub mod types;

pub use engine::{ReviewOrchestrator, Timeouts};
pub use flattener::{CommandFlattener, Flattener};
pub use locks::{TaskLockGuard, TaskLocks};
pub use reviewer::{ModelReviewer, Reviewer};
pub use types::{
    CodebaseReviewKind, CodebaseReviewRequest, ImplementationReviewRequest, PlanReviewRequest,
    ReviewFeedback, ReviewMetadata, ReviewResponse, ReviewType,
};
