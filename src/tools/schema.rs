//! Parameter schemas for registered tools.
//!
//! Each parameter is a tagged type plus presence rule. Schemas are validated
//! when the registry is built and drive both argument coercion and the JSON
//! Schema advertised to MCP clients.

use crate::error::{ToolkitError, ToolkitResult};
use serde_json::{Map, Value, json};

/// Declared type of a tool parameter.
#[derive(Debug, Clone)]
pub enum ParamType {
    Text,
    Integer,
    Number,
    Boolean,
    /// Structured JSON; the optional function yields its JSON Schema.
    Json(Option<fn() -> Value>),
    Enum(&'static [&'static str]),
}

impl ParamType {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Text | Self::Enum(_) => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Json(_) => "object",
        }
    }

    /// Coerce a raw value to this type.
    ///
    /// Text input follows the CLI rules: numeric-looking strings become
    /// numbers, `"true"`/`"false"` become booleans, JSON text is parsed.
    fn coerce(&self, name: &str, value: Value) -> ToolkitResult<Value> {
        let invalid = |reason: String| ToolkitError::invalid_parameter(name, reason);

        match self {
            Self::Text => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(invalid(format!("expected a string, got {}", other))),
            },
            Self::Integer => match &value {
                Value::Number(n) if n.is_i64() => Ok(value),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(invalid(format!("expected an integer, got {}", n))),
                },
                Value::String(s) if is_numeric_text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| invalid(format!("expected an integer, got '{}'", s))),
                other => Err(invalid(format!("expected an integer, got {}", other))),
            },
            Self::Number => match &value {
                Value::Number(_) => Ok(value),
                Value::String(s) if is_numeric_text(s) => parse_number(s.trim())
                    .ok_or_else(|| invalid(format!("expected a number, got '{}'", s))),
                other => Err(invalid(format!("expected a number, got {}", other))),
            },
            Self::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                other => Err(invalid(format!("expected true or false, got {}", other))),
            },
            Self::Json(_) => match value {
                Value::Object(_) | Value::Array(_) => Ok(value),
                Value::String(s) => match serde_json::from_str::<Value>(&s) {
                    Ok(parsed @ (Value::Object(_) | Value::Array(_))) => Ok(parsed),
                    Ok(other) => Err(invalid(format!("expected a JSON object, got {}", other))),
                    Err(e) => Err(invalid(format!("invalid JSON: {}", e))),
                },
                other => Err(invalid(format!("expected a JSON object, got {}", other))),
            },
            Self::Enum(options) => match &value {
                Value::String(s) if options.contains(&s.as_str()) => Ok(value),
                other => Err(invalid(format!(
                    "expected one of {}, got {}",
                    options.join(", "),
                    other
                ))),
            },
        }
    }
}

/// `^-?\d+(\.\d+)?$`
pub fn is_numeric_text(s: &str) -> bool {
    let s = s.trim();
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.is_none_or(all_digits)
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Whether a parameter must be supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

/// One declared parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub presence: Presence,
    pub description: &'static str,
}

impl ParamSpec {
    fn new(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            presence: Presence::Required,
            description: "",
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ParamType::Text)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, ParamType::Integer)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, ParamType::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn json(name: &'static str, schema: Option<fn() -> Value>) -> Self {
        Self::new(name, ParamType::Json(schema))
    }

    pub fn one_of(name: &'static str, options: &'static [&'static str]) -> Self {
        Self::new(name, ParamType::Enum(options))
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.presence = Presence::Default(value.into());
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Check the declaration itself: name, enum options, default type.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("parameter name is empty".to_string());
        }
        if let ParamType::Enum(options) = &self.ty {
            if options.is_empty() {
                return Err(format!("enum parameter '{}' has no options", self.name));
            }
        }
        if let Presence::Default(default) = &self.presence {
            match self.ty.coerce(self.name, default.clone()) {
                Ok(coerced) if coerced == *default => {}
                _ => {
                    return Err(format!(
                        "default {} of '{}' is not a valid {}",
                        default,
                        self.name,
                        self.ty.type_name()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Coerce a supplied value.
    pub fn coerce(&self, value: Value) -> ToolkitResult<Value> {
        self.ty.coerce(self.name, value)
    }

    /// JSON Schema for this parameter.
    pub fn json_schema(&self) -> Value {
        let mut schema = match &self.ty {
            ParamType::Json(Some(schema_fn)) => schema_fn(),
            ParamType::Enum(options) => json!({ "type": "string", "enum": options }),
            ty => json!({ "type": ty.type_name() }),
        };
        if let Value::Object(map) = &mut schema {
            if !self.description.is_empty() {
                map.insert("description".into(), Value::from(self.description));
            }
            if let Presence::Default(default) = &self.presence {
                map.insert("default".into(), default.clone());
            }
        }
        schema
    }
}

/// Build the `inputSchema` object for a list of parameters.
pub fn object_schema(params: &[ParamSpec]) -> Map<String, Value> {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| (p.name.to_string(), p.json_schema()))
        .collect();
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.is_required())
        .map(|p| p.name)
        .collect();

    let mut schema = Map::new();
    schema.insert("type".into(), Value::from("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    schema
}
