// This is the entry point of the Google Docs tool server.
//
// **Architecture Overview:**
// - `core/` = Business logic (credentials, document rendering, tool dispatch)
// - `infra/` = Implementations of core traits (Google OAuth, Docs/Drive REST)
// - `transport/` = Facades that expose the dispatcher (HTTP, stdio MCP)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the selected transport

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "transport/transport_layer.rs"]
mod transport;

mod config;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, TransportKind};
use crate::core::credentials::CachingCredentialResolver;
use crate::core::tools::{ToolDispatcher, ToolRegistry};
use crate::infra::google_auth::GoogleSessionFactory;
use crate::infra::google_docs::GoogleDocsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logs go to stderr: on the stdio transport, stdout is the protocol channel.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let factory = GoogleSessionFactory::new(http.clone())
        .validate_on_open(config.validate_token)
        .with_tokeninfo_url(config.tokeninfo_url.clone())
        .with_token_uri(config.token_uri_override.clone());

    // Credentials resolve lazily on the first tool call, so the server can
    // start (and list tools) before a token exists.
    let resolver = Arc::new(CachingCredentialResolver::new(
        config.credentials.clone(),
        factory,
    ));

    let docs = Arc::new(GoogleDocsClient::with_base_urls(
        http,
        &config.docs_api_base,
        &config.drive_api_base,
    ));

    let registry = ToolRegistry::standard().context("failed to register tools")?;
    anyhow::ensure!(!registry.is_empty(), "no tools registered");
    tracing::info!(tools = registry.len(), "Tool registry ready");

    let dispatcher = Arc::new(ToolDispatcher::new(registry, resolver, docs));

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    match config.transport {
        TransportKind::Http => {
            transport::http::serve(config.http_bind, dispatcher, config.max_body_bytes).await?
        }
        TransportKind::Stdio => {
            transport::stream::serve_stdio(dispatcher).await?
        }
    }

    Ok(())
}
