//! Error types for the access control engine

use thiserror::Error;

/// Boxed error carried by a permission store failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a permission store
///
/// Stores return this unchanged; the engine wraps it in
/// [`AccessControlError::Store`] without retrying.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StoreError {
    /// Create a store error with a message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error wrapping an underlying cause
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Error message without the source chain
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Access control engine errors
#[derive(Debug, Error)]
pub enum AccessControlError {
    /// Permission store fetch failed
    #[error("Permission store error: {0}")]
    Store(#[from] StoreError),

    /// No resolver registered for the prefix of a scope
    #[error("No scope resolver registered for scope: {0}")]
    ResolverNotFound(String),

    /// Scope mutation failed for any other reason
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AccessControlError {
    /// Whether this error only means "no resolver covers the scope"
    pub fn is_resolver_not_found(&self) -> bool {
        matches!(self, Self::ResolverNotFound(_))
    }
}

/// Result type for access control operations
pub type Result<T> = std::result::Result<T, AccessControlError>;
