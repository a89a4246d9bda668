//! Parameter extraction helpers for tool arguments.

use serde_json::Value;

/// Error type for tool parameter validation failures.
///
/// Messages are written for the client: they name the parameter and say
/// how to fix the call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParameterValidationError {
    /// A required parameter is missing.
    #[error("missing required parameter '{name}': {hint}")]
    MissingRequired {
        /// The parameter name.
        name: &'static str,
        /// How to supply it.
        hint: &'static str,
    },

    /// A parameter has an invalid type.
    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidType {
        /// The parameter name.
        name: &'static str,
        /// The expected type.
        expected: &'static str,
        /// The actual type found.
        actual: String,
    },

    /// A parameter value doesn't match an expected enum or pattern.
    #[error("'{name}' has invalid value '{value}': {message}")]
    InvalidValue {
        /// The parameter name.
        name: &'static str,
        /// The invalid value.
        value: String,
        /// Why it's invalid.
        message: String,
    },
}

impl ParameterValidationError {
    /// Create a missing required parameter error.
    pub fn missing(name: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { name, hint }
    }

    fn wrong_type(
        name: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            name,
            expected,
            actual: actual.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        name: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
            message: message.into(),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Helper trait for extracting and validating parameters from JSON.
pub trait ParamExt {
    /// Get a required, non-blank string parameter.
    fn required_str(
        &self,
        name: &'static str,
        hint: &'static str,
    ) -> Result<&str, ParameterValidationError>;

    /// Get an optional boolean parameter with default.
    fn optional_bool(&self, name: &str, default: bool) -> bool;

    /// Get a required, non-empty array of strings.
    fn required_str_array(
        &self,
        name: &'static str,
        hint: &'static str,
    ) -> Result<Vec<&str>, ParameterValidationError>;
}

impl ParamExt for Value {
    fn required_str(
        &self,
        name: &'static str,
        hint: &'static str,
    ) -> Result<&str, ParameterValidationError> {
        match self.get(name) {
            None | Some(Value::Null) => Err(ParameterValidationError::missing(name, hint)),
            Some(Value::String(s)) if s.trim().is_empty() => Err(
                ParameterValidationError::invalid_value(name, s.as_str(), "must not be blank"),
            ),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ParameterValidationError::wrong_type(
                name,
                "string",
                type_name(other),
            )),
        }
    }

    fn optional_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn required_str_array(
        &self,
        name: &'static str,
        hint: &'static str,
    ) -> Result<Vec<&str>, ParameterValidationError> {
        let items = match self.get(name) {
            None | Some(Value::Null) => return Err(ParameterValidationError::missing(name, hint)),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ParameterValidationError::wrong_type(
                    name,
                    "array of strings",
                    type_name(other),
                ));
            }
        };

        if items.is_empty() {
            return Err(ParameterValidationError::invalid_value(
                name,
                "[]",
                "must contain at least one entry",
            ));
        }

        items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    ParameterValidationError::wrong_type(
                        name,
                        "array of strings",
                        format!("array containing {}", type_name(item)),
                    )
                })
            })
            .collect()
    }
}
