//! # JSON-RPC over HTTP
//!
//! HTTP/1.1 transport for [`turul_jsonrpc_engine`]. A POST to the configured
//! path is handed to the engine as a byte stream; the engine writes the
//! single response through a sink and signals completion, and the handler
//! turns that into an `application/json` response.
//!
//! ## Features
//! - Path routing with 404/405/413 handling
//! - Request body size limit
//! - Optional CORS headers and preflight support
//! - Deactivation through the engine configuration

pub mod cors;
pub mod handler;
pub mod prelude;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export main types
pub use cors::CorsLayer;
pub use handler::JsonRpcHttpHandler;
pub use server::{JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig};

// Re-export the engine so applications need a single dependency
pub use turul_jsonrpc_engine;

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Registration error: {0}")]
    Registry(#[from] turul_jsonrpc_engine::RegistryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Engine produced no response")]
    NoResponse,
}
