//! Configuration for the Kestrel gateway.
//!
//! Provides TOML-based configuration with:
//! - Listener and per-session queue settings (`[server]`)
//! - Upstream provider endpoint, timeout and credentials (`[provider]`)
//! - Per-family cache TTLs and capacity bounds (`[cache.families.<name>]`)
//! - Health snapshot TTL (`[health]`)
//!
//! Configuration is read once at startup, validated, and treated as
//! immutable afterwards.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{LoadedConfig, default_config_path, load_config, load_config_file, load_config_with_env};
pub use error::{ConfigError, Result};
pub use types::*;
