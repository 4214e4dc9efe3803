use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the review pipeline.
///
/// Each layer defines its own error variant. Callers match on [`ArchitectError::code`]
/// to decide recovery strategy; provider and CLI plumbing continue to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum ArchitectError {
    // ── Caller input ────────────────────────────────────────────────────
    #[error("validation failed: {0}")]
    Validation(String),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Snapshot / task context storage ─────────────────────────────────
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    // ── At-rest encryption ──────────────────────────────────────────────
    #[error("cipher: {0}")]
    Cipher(#[from] CipherError),

    // ── Flattener / reviewer collaborators ──────────────────────────────
    #[error("collaborator: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    // ── Workflow context wrapper ────────────────────────────────────────
    /// `subject` is the task id, or the codebase path for standalone reviews.
    #[error("{workflow} for {subject} failed during {step}: {source}")]
    Workflow {
        workflow: &'static str,
        subject: String,
        step: &'static str,
        #[source]
        source: Box<ArchitectError>,
    },

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Storage errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content size {size_bytes} bytes exceeds maximum size of {max_mb}MB")]
    SizeLimitExceeded { size_bytes: usize, max_mb: u64 },

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("malformed snapshot id: {0}")]
    InvalidSnapshotId(String),

    #[error("task context for {task_id} is corrupt: {message}")]
    CorruptContext { task_id: String, message: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ─── Cipher errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("authentication tag did not verify")]
    Integrity,

    #[error("malformed ciphertext record: {0}")]
    Format(String),
}

// ─── Collaborator errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to flatten codebase at {path}: {message}")]
    Codebase { path: String, message: String },

    #[error("failed to diff {before} against {after}: {message}")]
    Diff {
        before: String,
        after: String,
        message: String,
    },

    #[error("review service {model} failed: {message}")]
    ReviewService { model: String, message: String },
}

impl ArchitectError {
    /// Stable machine-readable code, looking through [`ArchitectError::Workflow`] wrappers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Storage(err) => match err {
                StorageError::SizeLimitExceeded { .. } => "SIZE_LIMIT_EXCEEDED",
                StorageError::SnapshotNotFound(_) => "NOT_FOUND",
                StorageError::InvalidSnapshotId(_) => "VALIDATION_ERROR",
                StorageError::CorruptContext { .. } => "FORMAT_ERROR",
                StorageError::Io { .. } => "STORAGE_ERROR",
            },
            Self::Cipher(err) => match err {
                CipherError::Integrity => "INTEGRITY_ERROR",
                CipherError::Format(_) => "FORMAT_ERROR",
            },
            Self::Collaborator(err) => match err {
                CollaboratorError::Codebase { .. } => "CODEBASE_ERROR",
                CollaboratorError::Diff { .. } => "DIFF_ERROR",
                CollaboratorError::ReviewService { .. } => "REVIEW_SERVICE_ERROR",
            },
            Self::Timeout { .. } => "TIMEOUT_ERROR",
            Self::Workflow { source, .. } => source.code(),
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }

    /// The innermost error, with any workflow context stripped.
    pub fn root(&self) -> &Self {
        match self {
            Self::Workflow { source, .. } => source.root(),
            other => other,
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ArchitectError>;
