//! Error types for shapeseek.

use thiserror::Error;

/// Errors that can occur while normalizing, indexing, searching or evaluating.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Two vectors (or a vector and an average/std-dev pair) differ in length.
    #[error("length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Clustering requested more groups than there are items.
    #[error("cannot build {k} clusters from {items} items")]
    InsufficientItems { items: usize, k: usize },

    /// Normalization requested on an already-normalized database.
    #[error("feature database is already normalized")]
    AlreadyNormalized,

    /// Distance configuration, search limit or parameter is not valid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A normalized feature vector holds NaN or an infinite value.
    ///
    /// `FeatureDatabase::filter_nan_and_inf` recovers from this locally;
    /// it only surfaces when a caller asks for strict validation.
    #[error("feature vector of item {id} contains NaN or infinite values")]
    InvalidFeatureValue { id: u32 },

    /// The classification map has no label for a known item.
    #[error("no classification for item {id}")]
    MissingClassification { id: u32 },

    /// Two members of one collection share an identity.
    #[error("duplicate item id {id}")]
    DuplicateId { id: u32 },

    /// An id referenced by a persisted index is not in the database.
    #[error("unknown item id {id}")]
    UnknownItem { id: u32 },

    /// Operation needs at least one member.
    #[error("feature database is empty")]
    EmptyDatabase,

    /// A persisted record could not be decoded.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// I/O error while reading or writing persisted data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be decoded.
    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RetrieveError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RetrieveError>;
