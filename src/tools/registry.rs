//! The tool registry shared by the CLI and the MCP server.

use super::args::{ParsedArgs, RawArgs};
use super::context::ToolContext;
use super::schema::{ParamSpec, Presence, object_schema};
use super::{communities, documents, pipeline, public_data, registrations, research, tenants};
use crate::error::{ToolkitError, ToolkitResult};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Async tool body.
pub type Handler = fn(Arc<ToolContext>, ParsedArgs) -> BoxFuture<'static, ToolkitResult<Value>>;

/// One registered tool.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    /// Mutating tools are blocked by the write gate.
    pub mutating: bool,
    pub handler: Handler,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("mutating", &self.mutating)
            .field("params", &self.params.len())
            .finish()
    }
}

impl ToolSpec {
    pub fn read(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
            mutating: false,
            handler,
        }
    }

    pub fn write(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            mutating: true,
            ..Self::read(name, description, handler)
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// JSON Schema of the tool's arguments.
    pub fn input_schema(&self) -> Map<String, Value> {
        object_schema(&self.params)
    }

    /// Check the declaration. Run once when the registry is built.
    pub fn validate(&self) -> ToolkitResult<()> {
        if self.name.is_empty() {
            return Err(ToolkitError::config("tool name is empty"));
        }
        let mut seen = HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name) {
                return Err(ToolkitError::config(format!(
                    "tool '{}' declares parameter '{}' twice",
                    self.name, param.name
                )));
            }
            param
                .validate()
                .map_err(|e| ToolkitError::config(format!("tool '{}': {}", self.name, e)))?;
        }
        Ok(())
    }

    /// Coerce raw arguments against the declared parameters.
    ///
    /// Null counts as absent. Defaults are filled in, unknown keys dropped.
    pub fn coerce(&self, mut raw: RawArgs) -> ToolkitResult<ParsedArgs> {
        let mut values = Map::new();

        for param in &self.params {
            match raw.remove(param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    values.insert(param.name.to_string(), param.coerce(value)?);
                }
                None => match &param.presence {
                    Presence::Required => {
                        return Err(ToolkitError::missing_parameter(self.name, param.name));
                    }
                    Presence::Default(default) => {
                        values.insert(param.name.to_string(), default.clone());
                    }
                    Presence::Optional => {}
                },
            }
        }

        for key in raw.keys() {
            debug!(tool = self.name, argument = %key, "Ignoring unknown argument");
        }

        Ok(ParsedArgs::new(self.name, values))
    }
}

/// Ordered, validated set of tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build a registry, failing on duplicate names or invalid declarations.
    pub fn build(specs: Vec<ToolSpec>) -> ToolkitResult<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            spec.validate()?;
            if index.insert(spec.name, i).is_some() {
                return Err(ToolkitError::config(format!(
                    "tool '{}' registered twice",
                    spec.name
                )));
            }
        }
        Ok(Self {
            tools: specs,
            index,
        })
    }

    /// Every tool the toolkit ships.
    pub fn standard() -> ToolkitResult<Self> {
        let mut specs = Vec::new();
        specs.extend(registrations::tools());
        specs.extend(communities::tools());
        specs.extend(tenants::tools());
        specs.extend(research::tools());
        specs.extend(public_data::tools());
        specs.extend(pipeline::tools());
        specs.extend(documents::tools());
        Self::build(specs)
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool listing for `invoke help`.
    pub fn usage(&self) -> String {
        let mut lines = vec![
            "Usage: leg-toolkit invoke <command> [--key value ...]".to_string(),
            String::new(),
            "Commands:".to_string(),
        ];
        for spec in &self.tools {
            lines.push(format!("  {:<30} {}", spec.name, spec.description));
            let flags = if spec.params.is_empty() {
                "(no params)".to_string()
            } else {
                spec.params
                    .iter()
                    .map(|p| format!("--{}", p.name))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            lines.push(format!("    {}", flags));
        }
        lines.join("\n")
    }
}
