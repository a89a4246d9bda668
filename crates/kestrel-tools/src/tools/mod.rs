//! Built-in tools.
//!
//! - Provider tools (`search`, `extract`, `quote`) forwarding to an upstream
//! - Cache administration (`clear_cache`, `cache_stats`)

mod cache_admin;
mod provider;

pub use cache_admin::{
    CacheStatsTool, ClearCacheTool, Recommendation, RecommendationKind, SCOPE_ALL,
    recommendations,
};
pub use provider::{DEFAULT_CALL_TIMEOUT, MAX_SEARCH_RESULTS, ProviderTool};
