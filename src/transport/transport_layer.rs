// The transport module binds the tool dispatcher to the outside world.
// Each facade parses requests, calls `ToolDispatcher::dispatch`, and
// serializes the result; none of them contains tool logic. The stdio facade
// leaves the protocol itself to `rmcp`.

use thiserror::Error;

#[path = "http_facade.rs"]
pub mod http;

#[path = "stream_facade.rs"]
pub mod stream;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("protocol session failed: {0}")]
    Protocol(String),
}
