//! Validation and execution of tool invocations.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::envelope::Envelope;
use crate::error::{ErrorKind, Result, ToolError, UpstreamError};
use crate::registry::ToolRegistry;
use crate::tool::{ToolContext, ToolDescriptor, ToolOutput};

/// Routes invocations to registered tools.
///
/// Every call is checked against the tool's schema and its own `validate`
/// before `execute` runs. Errors and panics are converted to
/// [`Envelope::Error`]; nothing raw escapes to the caller.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a frozen registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Descriptors of every tool, sorted by name.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.registry.list()
    }

    /// Invoke `name` with `args`. Missing or `null` arguments are treated as
    /// an empty object.
    pub async fn invoke(&self, name: &str, args: Option<Value>, ctx: &ToolContext) -> Envelope {
        let started = Instant::now();
        let args = match args {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(v) => v,
        };

        let outcome = AssertUnwindSafe(self.run(name, args, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ToolError::internal(format!(
                    "tool '{}' panicked: {}",
                    name,
                    panic_message(panic.as_ref())
                )))
            });

        let envelope = match &outcome {
            Ok(output) => Envelope::success(output.clone()),
            Err(err) => Envelope::error(err),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let cache = envelope.cache().map(|c| c.as_str()).unwrap_or("none");
        match &outcome {
            Ok(_) => info!(
                tool = %name,
                duration_ms,
                outcome = envelope.outcome(),
                cache,
                "Tool call completed"
            ),
            Err(ToolError::Upstream(UpstreamError::Cancelled { .. })) => debug!(
                tool = %name,
                duration_ms,
                "Tool call cancelled with its session"
            ),
            Err(err) if err.kind() == ErrorKind::Internal => error!(
                tool = %name,
                duration_ms,
                outcome = envelope.outcome(),
                error = %err,
                "Tool call failed"
            ),
            Err(err) => warn!(
                tool = %name,
                duration_ms,
                outcome = envelope.outcome(),
                error = %err,
                "Tool call failed"
            ),
        }

        envelope
    }

    async fn run(&self, name: &str, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        entry.schema.validate(&args)?;
        entry.tool.validate(&args)?;

        entry.tool.execute(args, ctx).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
