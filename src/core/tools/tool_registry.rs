// Tool registry.
//
// Filled once at start-up and only read afterwards. Registration compiles
// the tool's input schema and rejects a second descriptor under a name
// that is already taken.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::tool_catalog::{descriptor, ToolDescriptor};
use super::tool_models::ToolName;
use super::tool_schema::{CompiledSchema, SchemaCompileError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    Duplicate(ToolName),

    #[error("tool `{tool}` has an unusable input schema: {source}")]
    Schema {
        tool: ToolName,
        #[source]
        source: SchemaCompileError,
    },
}

/// A descriptor together with its compiled input schema.
#[derive(Debug)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub schema: CompiledSchema,
}

impl RegisteredTool {
    /// `{name, description, inputSchema}` as shown in tool listings.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.descriptor.name.as_str(),
            "description": self.descriptor.description,
            "inputSchema": self.schema.document(),
        })
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tool in the catalogue.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for tool in ToolName::ALL {
            registry.register(descriptor(tool))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        let schema = descriptor
            .schema
            .compile()
            .map_err(|source| RegistryError::Schema {
                tool: descriptor.name,
                source,
            })?;

        tracing::debug!(tool = %descriptor.name, "Registered tool");
        self.tools
            .insert(descriptor.name, RegisteredTool { descriptor, schema });
        Ok(())
    }

    /// Looks a tool up by its wire name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        ToolName::parse(name).and_then(|tool| self.tools.get(&tool))
    }

    /// Registered tools in catalogue order.
    pub fn tools(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
