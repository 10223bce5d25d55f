// =============================================================================
// STREAMING FACADE (MODEL CONTEXT PROTOCOL OVER STDIO)
// =============================================================================
//
// `rmcp` owns the protocol: framing, `initialize`, `ping`, notifications and
// JSON-RPC error codes. This file only maps the two tool methods onto the
// dispatcher.
//
// **Methods:**
// - `tools/list` -> one `Tool` per registered descriptor
// - `tools/call` -> dispatch; tool failures come back in-band with
//                   `isError: true` and the `DispatchResult` as
//                   `structuredContent`, never as JSON-RPC errors

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::Value;
use std::sync::Arc;

use super::TransportError;
use crate::core::tools::ToolDispatcher;

/// MCP server handler over the shared dispatcher.
#[derive(Clone)]
pub struct DocsToolServer {
    dispatcher: Arc<ToolDispatcher>,
}

impl DocsToolServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .tools()
            .map(|tool| {
                let schema = tool.schema.document().as_object().cloned().unwrap_or_default();
                Tool::new(
                    tool.descriptor.name.as_str(),
                    tool.descriptor.description,
                    Arc::new(schema),
                )
            })
            .collect()
    }

    async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let args = arguments.map(Value::Object).unwrap_or(Value::Null);
        let result = self.dispatcher.dispatch(name, args).await;

        let content = vec![Content::text(result.display_text())];
        let mut reply = if result.is_success() {
            CallToolResult::success(content)
        } else {
            CallToolResult::error(content)
        };
        reply.structured_content = Some(
            serde_json::to_value(&result)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?,
        );
        Ok(reply)
    }
}

impl ServerHandler for DocsToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Google Docs tools: read_document, get_document_info, create_document, \
                 append_text, replace_text, format_text, search_documents."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move { Ok(ListToolsResult::with_all_items(self.tools())) }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.call(&request.name, request.arguments).await }
    }
}

pub async fn serve_stdio(dispatcher: Arc<ToolDispatcher>) -> Result<(), TransportError> {
    tracing::info!("Stdio transport ready");

    let running = DocsToolServer::new(dispatcher)
        .serve(stdio())
        .await
        .map_err(|e| TransportError::Protocol(e.to_string()))?;
    let reason = running
        .waiting()
        .await
        .map_err(|e| TransportError::Protocol(e.to_string()))?;

    tracing::info!(?reason, "Stdio transport closed");
    Ok(())
}
