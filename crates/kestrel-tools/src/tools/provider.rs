//! Tools that forward to an upstream provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kestrel_cache::KeyPolicy;
use kestrel_mcp::ToolAnnotations;
use serde_json::{Value, json};
use url::Url;

use crate::error::{Result, UpstreamError};
use crate::params::{ParamExt, ParameterValidationError};
use crate::tool::{Tool, ToolContext, ToolOutput};
use crate::upstream::Upstream;

/// Default upper bound on a single provider call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on `max_results` for `search`.
pub const MAX_SEARCH_RESULTS: u64 = 20;

type Validator = fn(&Value) -> Result<()>;

/// A declarative tool forwarding validated arguments to one upstream
/// operation.
pub struct ProviderTool {
    name: &'static str,
    description: &'static str,
    schema: Value,
    operation: &'static str,
    family: &'static str,
    case_sensitive: &'static [&'static str],
    validator: Validator,
    upstream: Arc<dyn Upstream>,
    timeout: Duration,
}

impl ProviderTool {
    /// Web search.
    pub fn search(upstream: Arc<dyn Upstream>) -> Self {
        Self {
            name: "search",
            description: "Search the web. Returns ranked results with titles, URLs and content snippets.",
            schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "minLength": 1,
                        "description": "The search query"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_SEARCH_RESULTS,
                        "description": "Maximum number of results (default 5)"
                    },
                    "topic": {
                        "type": "string",
                        "enum": ["general", "news", "finance"],
                        "description": "Search category"
                    },
                    "search_depth": {
                        "type": "string",
                        "enum": ["basic", "advanced"],
                        "description": "How thoroughly to search"
                    }
                },
                "required": ["query"]
            }),
            operation: "search",
            family: "search",
            case_sensitive: &[],
            validator: validate_search,
            upstream,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Page content extraction.
    pub fn extract(upstream: Arc<dyn Upstream>) -> Self {
        Self {
            name: "extract",
            description: "Fetch one or more web pages and extract their main content as text.",
            schema: json!({
                "type": "object",
                "properties": {
                    "urls": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": 20,
                        "description": "Absolute http(s) URLs to extract"
                    },
                    "include_images": {
                        "type": "boolean",
                        "description": "Also return image URLs found on the pages"
                    }
                },
                "required": ["urls"]
            }),
            operation: "extract",
            family: "extract",
            case_sensitive: &["urls"],
            validator: validate_extract,
            upstream,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Market quote lookup.
    pub fn quote(upstream: Arc<dyn Upstream>) -> Self {
        Self {
            name: "quote",
            description: "Look up the latest market quote and price history for a ticker symbol.",
            schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": 16,
                        "description": "Ticker symbol, e.g. AAPL"
                    },
                    "range": {
                        "type": "string",
                        "enum": ["1d", "5d", "1mo", "6mo", "1y", "5y"],
                        "description": "History window (default 1d)"
                    }
                },
                "required": ["symbol"]
            }),
            operation: "finance/quote",
            family: "finance",
            case_sensitive: &[],
            validator: validate_quote,
            upstream,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// All built-in provider tools.
    pub fn builtin(upstream: Arc<dyn Upstream>, timeout: Duration) -> Vec<Self> {
        vec![
            Self::search(Arc::clone(&upstream)).with_timeout(timeout),
            Self::extract(Arc::clone(&upstream)).with_timeout(timeout),
            Self::quote(upstream).with_timeout(timeout),
        ]
    }

    /// Override the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cache family this tool's results belong to.
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Upstream operation invoked.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Key derivation rules for this tool's cache family.
    pub fn key_policy(&self) -> KeyPolicy {
        self.case_sensitive
            .iter()
            .fold(KeyPolicy::new(), |policy, field| policy.case_sensitive(*field))
    }
}

#[async_trait]
impl Tool for ProviderTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::read_only_remote()
    }

    fn validate(&self, params: &Value) -> Result<()> {
        (self.validator)(params)
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let call = tokio::time::timeout(self.timeout, self.upstream.invoke(self.operation, params));

        let value = tokio::select! {
            _ = ctx.cancellation.cancelled() => {
                return Err(UpstreamError::Cancelled {
                    operation: self.operation.to_string(),
                }
                .into());
            }
            result = call => match result {
                Ok(inner) => inner?,
                Err(_) => {
                    return Err(UpstreamError::Timeout {
                        operation: self.operation.to_string(),
                        after: self.timeout,
                    }
                    .into());
                }
            },
        };

        Ok(ToolOutput::new(value))
    }
}

fn validate_search(params: &Value) -> Result<()> {
    params.required_str("query", "pass the text to search for")?;
    Ok(())
}

fn validate_extract(params: &Value) -> Result<()> {
    let urls = params.required_str_array("urls", "pass a list of absolute http(s) URLs")?;
    for raw in urls {
        let parsed = Url::parse(raw).map_err(|e| {
            ParameterValidationError::invalid_value("urls", raw, format!("not a valid URL: {}", e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ParameterValidationError::invalid_value(
                "urls",
                raw,
                "only http and https URLs can be extracted",
            )
            .into());
        }
    }
    Ok(())
}

fn validate_quote(params: &Value) -> Result<()> {
    let symbol = params.required_str("symbol", "pass a ticker symbol such as AAPL")?;
    let valid = symbol
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(ParameterValidationError::invalid_value(
            "symbol",
            symbol,
            "ticker symbols contain only letters, digits and . - ^ =",
        )
        .into());
    }
    Ok(())
}
