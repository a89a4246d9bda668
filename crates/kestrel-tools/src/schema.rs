//! JSON Schema validation of tool arguments.

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::{RegistryError, ToolError};

/// A tool's input schema, compiled once at registration.
pub struct ArgumentSchema {
    compiled: JSONSchema,
}

impl ArgumentSchema {
    /// Compile `schema` for the named tool.
    pub fn compile(tool: &str, schema: &Value) -> Result<Self, RegistryError> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| RegistryError::InvalidSchema {
                tool: tool.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { compiled })
    }

    /// Check `args` against the schema.
    ///
    /// All violations are reported in one message, each prefixed with the
    /// JSON pointer of the offending value.
    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        if let Err(errors) = self.compiled.validate(args) {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect();
            return Err(ToolError::validation(format!(
                "invalid arguments: {}",
                messages.join("; ")
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ArgumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentSchema").finish_non_exhaustive()
    }
}
