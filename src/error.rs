//! Error types for the named cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::Shape;

// == Cache Error Enum ==
/// Unified error type for the named cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The producer or initializer failed on a miss. Never cached.
    ///
    /// The source error is passed through untouched so callers can
    /// downcast it back to their own error type.
    #[error(transparent)]
    Production(#[from] anyhow::Error),

    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key is already registered in the other namespace
    #[error("Key '{key}' is already used by the {existing} cache")]
    NamespaceConflict {
        key: String,
        existing: &'static str,
    },

    /// Key was first used with a producer of a different shape
    #[error("Key '{key}' is bound to {stored} producers, called with {requested}")]
    ShapeMismatch {
        key: String,
        stored: Shape,
        requested: Shape,
    },

    /// Stored value is not of the requested type
    #[error("Key '{key}' does not hold a value of type {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
    },
}

impl CacheError {
    /// Returns true if the error came from the caller's producer.
    pub fn is_production_failure(&self) -> bool {
        matches!(self, CacheError::Production(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the named cache.
pub type Result<T> = std::result::Result<T, CacheError>;
