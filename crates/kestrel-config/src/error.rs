//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `[cache.families.<name>]` section names a family the gateway does
    /// not have.
    #[error("unknown cache family '{name}' (expected one of: {expected})")]
    UnknownFamily { name: String, expected: String },

    /// A duration that must be positive is zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: String },

    /// A count that must be positive is zero.
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: String },

    /// Health snapshots would outlive the cache data they describe.
    #[error(
        "health.ttl_secs ({health_secs}s) must be shorter than cache family '{family}' ttl ({family_secs}s)"
    )]
    HealthTtlTooLong {
        health_secs: u64,
        family: String,
        family_secs: u64,
    },

    /// A field holds a value that cannot be parsed.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
