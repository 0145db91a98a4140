//! HTTP server hosting a JSON-RPC endpoint
//!
//! One hyper HTTP/1.1 connection task per client; every request on the
//! configured path is answered by [`JsonRpcHttpHandler`].

use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use turul_jsonrpc_engine::{EngineConfig, HandlerRegistry, JsonRpcEngine, Registration};

use crate::{JsonRpcHttpHandler, Result};

/// Configuration for the JSON-RPC HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the JSON-RPC endpoint
    pub path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Complete responses through a hook instead of the engine timeout
    pub async_dispatch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            path: "/jsonrpc".to_string(),
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
            async_dispatch: true,
        }
    }
}

/// Builder for [`JsonRpcHttpServer`]
pub struct JsonRpcHttpServerBuilder {
    config: ServerConfig,
    engine: JsonRpcEngine,
}

impl JsonRpcHttpServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            engine: JsonRpcEngine::default(),
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn async_dispatch(mut self, enable: bool) -> Self {
        self.config.async_dispatch = enable;
        self
    }

    /// Replace the engine configuration, keeping registered methods
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        let registry = self.engine.registry().clone();
        self.engine = JsonRpcEngine::with_registry(config, registry);
        self
    }

    /// Serve an existing registry
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.engine = JsonRpcEngine::with_registry(self.engine.config().clone(), registry);
        self
    }

    /// Register a method for the lifetime of the server
    pub fn register(self, registration: Registration) -> Result<Self> {
        self.engine.register(registration)?;
        Ok(self)
    }

    pub fn build(self) -> JsonRpcHttpServer {
        JsonRpcHttpServer {
            handler: JsonRpcHttpHandler::new(self.config, self.engine),
        }
    }
}

impl Default for JsonRpcHttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP server for a [`JsonRpcEngine`]
#[derive(Clone)]
pub struct JsonRpcHttpServer {
    handler: JsonRpcHttpHandler,
}

impl JsonRpcHttpServer {
    pub fn builder() -> JsonRpcHttpServerBuilder {
        JsonRpcHttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    pub fn engine(&self) -> &JsonRpcEngine {
        self.handler.engine()
    }

    pub fn handler(&self) -> &JsonRpcHttpHandler {
        &self.handler
    }

    /// Accept connections until the listener fails
    pub async fn run(&self) -> Result<()> {
        let config = self.handler.config();
        let listener = TcpListener::bind(&config.bind_address).await?;
        info!("JSON-RPC server listening on {}", config.bind_address);
        info!("JSON-RPC endpoint available at: {}", config.path);
        info!(
            "Registered methods: {}",
            self.handler.engine().registry().methods().join(", ")
        );

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle_request(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8000");
        assert_eq!(config.path, "/jsonrpc");
        assert!(config.enable_cors);
        assert!(config.async_dispatch);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000);
        let server = JsonRpcHttpServer::builder()
            .bind_address(addr)
            .path("/api/rpc")
            .cors(false)
            .max_body_size(2048)
            .async_dispatch(false)
            .build();

        assert_eq!(server.config().bind_address, addr);
        assert_eq!(server.config().path, "/api/rpc");
        assert!(!server.config().enable_cors);
        assert!(!server.config().async_dispatch);
        assert_eq!(server.config().max_body_size, 2048);
    }

    #[test]
    fn test_engine_config_keeps_registered_methods() {
        let server = JsonRpcHttpServer::builder()
            .register(
                Registration::builder("ping")
                    .invoke(|_| turul_jsonrpc_engine::Invocation::ready("pong"))
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .engine_config(EngineConfig::default().with_timeout(Duration::from_secs(5)))
            .build();

        assert!(server.engine().registry().contains("ping"));
        assert_eq!(server.engine().config().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let ping = || {
            Registration::builder("ping")
                .invoke(|_| turul_jsonrpc_engine::Invocation::ready("pong"))
                .build()
                .unwrap()
        };
        let result = JsonRpcHttpServer::builder()
            .register(ping())
            .unwrap()
            .register(ping());
        assert!(matches!(result, Err(crate::HttpError::Registry(_))));
    }
}
