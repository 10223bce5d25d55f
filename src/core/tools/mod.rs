pub mod document_tools;
pub mod tool_catalog;
pub mod tool_dispatcher;
pub mod tool_models;
pub mod tool_registry;
pub mod tool_schema;

#[cfg(test)]
pub mod test_fakes;

pub use tool_catalog::ToolDescriptor;
pub use tool_dispatcher::ToolDispatcher;
pub use tool_models::{DispatchResult, ErrorKind, ToolError, ToolName};
pub use tool_registry::{RegistryError, ToolRegistry};
