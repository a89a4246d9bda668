//! Error types for cache set management.

/// Error type for cache set operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A family with this name is already registered in the set.
    #[error("cache family already registered: {0}")]
    DuplicateFamily(String),

    /// No family with this name exists in the set.
    #[error("unknown cache family: {0}")]
    UnknownFamily(String),
}

/// Result type for cache set operations.
pub type Result<T> = std::result::Result<T, Error>;
