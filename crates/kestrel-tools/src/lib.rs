//! Tool registry, dispatcher and built-in tools for the Kestrel gateway.
//!
//! A [`ToolRegistry`] is assembled once at startup and then frozen behind an
//! `Arc`. The [`Dispatcher`] looks tools up by name, validates arguments
//! against their JSON Schema and their own [`Tool::validate`], executes
//! them, and folds every outcome (including panics) into an [`Envelope`].
//!
//! Tools annotated idempotent can be registered with a
//! [`kestrel_cache::ResponseCache`]; repeated calls with equivalent
//! arguments are then served from cache until the family TTL elapses.

pub mod cached;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod params;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod tools;
pub mod upstream;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cached::CachedTool;
pub use dispatch::Dispatcher;
pub use envelope::Envelope;
pub use error::{ErrorKind, RegistryError, Result, ToolError, UpstreamError};
pub use params::{ParamExt, ParameterValidationError};
pub use registry::{RegisteredTool, ToolRegistry};
pub use schema::ArgumentSchema;
pub use tool::{CacheStatus, Tool, ToolContext, ToolDescriptor, ToolOutput};
pub use tools::{CacheStatsTool, ClearCacheTool, ProviderTool};
pub use upstream::{HttpUpstream, HttpUpstreamConfig, Upstream};
