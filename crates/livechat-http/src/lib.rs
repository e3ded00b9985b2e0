//! HTTP server exposing the chat relay over WebSocket.
//!
//! One route, `/ws`, carries every participant's events. Static files (the
//! client bundle) can optionally be served as a fallback.

mod state;
mod websocket;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

pub use state::SharedState;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Listener and routing options.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    /// Allowed browser origin, or `*` for any.
    pub cors_origin: String,
    /// Directory served for requests that match no route.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            cors_origin: "http://localhost:3000".to_string(),
            static_dir: None,
        }
    }
}

/// Handle to a running HTTP server.
pub struct HttpServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HttpServerHandle {
    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Check if the server is running.
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Stop the server gracefully and wait for it to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Wait until the server exits on its own.
    pub async fn wait(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

fn cors_layer(origin: &str) -> Result<CorsLayer, ServerError> {
    let allow_origin = if origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin)
            .map_err(|_| ServerError::InvalidOrigin(origin.to_string()))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST]))
}

/// Build the router for the relay.
pub fn router(state: Arc<SharedState>, options: &ServerOptions) -> Result<Router, ServerError> {
    let mut app = Router::new()
        .route("/ws", get(websocket::ws_handler))
        .layer(cors_layer(&options.cors_origin)?)
        .with_state(state);

    // Serve static files if directory provided
    if let Some(dir) = &options.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app)
}

/// Bind and start serving on the current tokio runtime.
///
/// Returns once the listener is bound; the server keeps running until
/// [`HttpServerHandle::stop`] is called.
pub async fn start(
    state: Arc<SharedState>,
    options: ServerOptions,
) -> Result<HttpServerHandle, ServerError> {
    let addr: SocketAddr = format!("{}:{}", options.host, options.port)
        .parse()
        .map_err(|e| {
            ServerError::InvalidAddress(format!("{}:{} ({})", options.host, options.port, e))
        })?;

    let app = router(state, &options)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;

    log::info!("Chat relay listening on ws://{}/ws", local_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                log::info!("HTTP server shutting down");
            })
            .await;
        if let Err(e) = result {
            log::error!("HTTP server error: {}", e);
        }
    });

    Ok(HttpServerHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use livechat_core::{RelayConfig, RelayContext};
    use tempfile::tempdir;

    fn test_state(dir: &std::path::Path) -> Arc<SharedState> {
        let relay = RelayContext::start(RelayConfig {
            history_path: dir.join("chat_history.json"),
            ..RelayConfig::default()
        });
        Arc::new(SharedState::new(relay))
    }

    #[test]
    fn default_options_match_relay_defaults() {
        let options = ServerOptions::default();
        assert_eq!(options.port, 5001);
        assert_eq!(options.cors_origin, "http://localhost:3000");
        assert!(options.static_dir.is_none());
    }

    #[test]
    fn cors_layer_accepts_wildcard_and_origins() {
        assert!(cors_layer("*").is_ok());
        assert!(cors_layer("http://localhost:3000").is_ok());
    }

    #[test]
    fn cors_layer_rejects_invalid_header() {
        assert!(matches!(
            cors_layer("bad\norigin"),
            Err(ServerError::InvalidOrigin(_))
        ));
    }

    #[tokio::test]
    async fn start_rejects_invalid_address() {
        let dir = tempdir().unwrap();
        let options = ServerOptions {
            host: "not a host".to_string(),
            ..ServerOptions::default()
        };
        let result = start(test_state(dir.path()), options).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn server_starts_and_stops() {
        let dir = tempdir().unwrap();
        let options = ServerOptions {
            port: 0,
            ..ServerOptions::default()
        };
        let mut handle = start(test_state(dir.path()), options).await.unwrap();

        assert!(handle.is_running());
        assert_ne!(handle.local_addr().port(), 0);

        handle.stop().await;
        assert!(!handle.is_running());
    }
}
