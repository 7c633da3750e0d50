//! Error types for pgshape

use thiserror::Error;

/// Result type alias for pgshape operations
pub type ShapeResult<T> = Result<T, ShapeError>;

/// Errors raised while composing or counting a query.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Missing or inconsistent configuration: an unknown filter key, an empty
    /// field request, a placeholder without a binding, conflicting bindings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied input that cannot be used as given (e.g. a bad sort order).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The database answered, but not in a shape we can use.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Query execution error from the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl ShapeError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for ShapeError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
