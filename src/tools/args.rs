//! Raw and coerced tool arguments.

use crate::db::SqlValue;
use crate::error::{ToolkitError, ToolkitResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Arguments as received from a front-end, before coercion.
pub type RawArgs = Map<String, Value>;

/// Turn `--key value` pairs into raw arguments.
///
/// Values stay text (the schema decides their type); a `--flag` followed by
/// another flag or nothing becomes `true`.
pub fn parse_cli_args(tokens: &[String]) -> ToolkitResult<RawArgs> {
    let mut args = RawArgs::new();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        let Some(key) = token.strip_prefix("--") else {
            return Err(ToolkitError::invalid_parameter(
                token.as_str(),
                "expected --key value pairs",
            ));
        };
        if key.is_empty() {
            return Err(ToolkitError::invalid_parameter("--", "empty option name"));
        }

        let value = match iter.peek() {
            Some(next) if !next.starts_with("--") => Value::String((*next).clone()),
            _ => Value::Bool(true),
        };
        if value.is_string() {
            iter.next();
        }
        args.insert(key.to_string(), value);
    }

    Ok(args)
}

/// Arguments after coercion against a tool's schema.
///
/// Required parameters are guaranteed present; defaults are filled in.
#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    tool: &'static str,
    values: Map<String, Value>,
}

impl ParsedArgs {
    pub fn new(tool: &'static str, values: Map<String, Value>) -> Self {
        Self { tool, values }
    }

    pub fn tool(&self) -> &'static str {
        self.tool
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    fn require(&self, name: &str) -> ToolkitResult<&Value> {
        self.get(name)
            .ok_or_else(|| ToolkitError::missing_parameter(self.tool, name))
    }

    fn wrong_type(name: &str, expected: &str) -> ToolkitError {
        ToolkitError::invalid_parameter(name, format!("expected {}", expected))
    }

    pub fn text(&self, name: &str) -> ToolkitResult<String> {
        self.require(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Self::wrong_type(name, "a string"))
    }

    pub fn opt_text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_str).map(str::to_string)
    }

    pub fn integer(&self, name: &str) -> ToolkitResult<i64> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| Self::wrong_type(name, "an integer"))
    }

    pub fn opt_integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn number(&self, name: &str) -> ToolkitResult<f64> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| Self::wrong_type(name, "a number"))
    }

    pub fn opt_number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn flag(&self, name: &str) -> ToolkitResult<bool> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| Self::wrong_type(name, "a boolean"))
    }

    pub fn opt_flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// The value as a bind parameter, keeping integers integral.
    pub fn opt_value(&self, name: &str) -> Option<SqlValue> {
        self.get(name).map(SqlValue::from_json)
    }

    pub fn json(&self, name: &str) -> ToolkitResult<Value> {
        self.require(name).cloned()
    }

    /// Deserialize a structured parameter into a typed value.
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> ToolkitResult<T> {
        serde_json::from_value(self.json(name)?)
            .map_err(|e| ToolkitError::invalid_parameter(name, e.to_string()))
    }
}
