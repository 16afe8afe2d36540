//! Error types for the rankflow library.
//!
//! All fallible operations return [`RankflowError`] through the [`Result`]
//! alias. The ranking engine recovers every error at the query boundary and
//! turns it into a [`Diagnostic`](crate::result::Diagnostic), so none of these
//! are process-fatal.
//!
//! # Examples
//!
//! ```
//! use rankflow::error::{RankflowError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(RankflowError::invalid_argument("limit overflow"))
//! }
//!
//! assert!(example_operation().is_err());
//! ```

use std::io;

use thiserror::Error;

use crate::result::DiagnosticKind;

/// The main error type for rankflow operations.
#[derive(Error, Debug)]
pub enum RankflowError {
    /// I/O errors (config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The candidate source returned doc id and score lists of different lengths.
    #[error("Candidate mismatch: {candidates} doc ids but {scores} scores")]
    CandidateMismatch { candidates: usize, scores: usize },

    /// A collaborator required by the query is not configured.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    /// Filter compilation errors.
    #[error("Filter error: {0}")]
    Filter(String),

    /// Document store errors.
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid argument (unknown sort property, bad operand).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with RankflowError.
pub type Result<T> = std::result::Result<T, RankflowError>;

impl RankflowError {
    /// Create a new candidate mismatch error.
    pub fn candidate_mismatch(candidates: usize, scores: usize) -> Self {
        RankflowError::CandidateMismatch { candidates, scores }
    }

    /// Create a new missing collaborator error.
    pub fn missing_collaborator<S: Into<String>>(msg: S) -> Self {
        RankflowError::MissingCollaborator(msg.into())
    }

    /// Create a new filter error.
    pub fn filter<S: Into<String>>(msg: S) -> Self {
        RankflowError::Filter(msg.into())
    }

    /// Create a new store error.
    pub fn store<S: Into<String>>(msg: S) -> Self {
        RankflowError::Store(msg.into())
    }

    /// Create a new invalid config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RankflowError::Config(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RankflowError::InvalidArgument(msg.into())
    }

    /// Classify this error for the diagnostic record attached to an aborted query.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            RankflowError::CandidateMismatch { .. } => DiagnosticKind::CandidateMismatch,
            RankflowError::MissingCollaborator(_) => DiagnosticKind::MissingCollaborator,
            RankflowError::Filter(_) => DiagnosticKind::InvalidFilter,
            RankflowError::InvalidArgument(_) => DiagnosticKind::InvalidArgument,
            RankflowError::Io(_)
            | RankflowError::Store(_)
            | RankflowError::Config(_)
            | RankflowError::Json(_) => DiagnosticKind::Internal,
        }
    }
}
