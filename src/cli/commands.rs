use clap::{Parser, Subcommand};

/// `software-architect` - plan and implementation reviews with a durable task record.
#[derive(Parser, Debug)]
#[command(name = "software-architect")]
#[command(version)]
#[command(about = "Review implementation plans and the code that follows them.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Review an implementation plan against the current codebase
    ReviewPlan {
        /// Task identifier shared by the plan and implementation reviews
        #[arg(long)]
        task_id: String,

        /// What the task is meant to achieve
        #[arg(long)]
        description: String,

        /// The implementation plan to review
        #[arg(long)]
        plan: String,

        /// Root of the codebase the plan applies to
        #[arg(long)]
        codebase: String,
    },

    /// Review a finished implementation by diffing before and after trees
    ReviewImplementation {
        #[arg(long)]
        task_id: String,

        #[arg(long)]
        description: String,

        /// The plan the implementation followed
        #[arg(long)]
        plan: String,

        /// What was implemented
        #[arg(long)]
        summary: String,

        /// Codebase before the change
        #[arg(long)]
        before: String,

        /// Codebase after the change
        #[arg(long)]
        after: String,
    },

    /// Review a codebase as a whole
    CodeReview {
        #[arg(long)]
        codebase: String,

        /// Area to concentrate on, e.g. performance or architecture
        #[arg(long)]
        focus: Option<String>,
    },

    /// Review a codebase for security vulnerabilities
    SecurityReview {
        #[arg(long)]
        codebase: String,

        /// Security area to concentrate on, e.g. authentication or cryptography
        #[arg(long)]
        focus: Option<String>,
    },

    /// Review a codebase against best practices
    BestPracticesReview {
        #[arg(long)]
        codebase: String,

        /// Practices to concentrate on, e.g. naming, testing or documentation
        #[arg(long)]
        focus: Option<String>,

        /// Primary language, for language-specific conventions
        #[arg(long)]
        language: Option<String>,
    },

    /// Print the stored context of a task
    ShowTask { task_id: String },

    /// Print the content of a stored snapshot
    Snapshot { snapshot_id: String },

    /// Remove snapshots older than the given age
    Cleanup {
        /// Defaults to `storage.cleanup_max_age_hours`
        #[arg(long)]
        max_age_hours: Option<u64>,
    },

    /// Remove every snapshot and the context of one task
    Purge { task_id: String },

    /// Show storage usage
    Stats,
}
