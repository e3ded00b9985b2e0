//! RelayContext - the shared state every transport needs.
//!
//! ## Architecture
//!
//! ```text
//!      WebSocket task ──┐                      ┌──> RelayGateway ──> sockets
//!      WebSocket task ──┼─> CoordinatorHandle ─┤
//!      WebSocket task ──┘     (mpsc queue)     └──> EventLog ──> chat_history.json
//!                                  │
//!                          SessionCoordinator
//!                         (one task, one owner)
//! ```
//!
//! The gateway is shared by reference: transports register and unregister
//! connections on it directly, while only the coordinator task delivers
//! events through it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::history::{self, EventLog, HistoryFormat};
use crate::relay::RelayGateway;
use crate::session::{CoordinatorActor, CoordinatorHandle, SessionCoordinator};

/// Where and how the audit trail is stored.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub history_path: PathBuf,
    pub history_format: HistoryFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("chat_history.json"),
            history_format: HistoryFormat::Json,
        }
    }
}

/// Configuration for building a RelayContext.
#[derive(Default)]
pub struct RelayContextBuilder {
    config: RelayConfig,
    gateway: Option<Arc<RelayGateway>>,
    event_log: Option<Box<dyn EventLog>>,
}

impl RelayContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing gateway (for testing or custom configurations).
    pub fn gateway(mut self, gateway: Arc<RelayGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Use a custom event log instead of opening one from the config.
    pub fn event_log(mut self, log: Box<dyn EventLog>) -> Self {
        self.event_log = Some(log);
        self
    }

    /// Initialize the event log and spawn the coordinator task.
    ///
    /// Must be called from within a tokio runtime. A log that cannot be
    /// initialized is reported and the relay starts anyway.
    pub fn start(self) -> RelayContext {
        let gateway = self
            .gateway
            .unwrap_or_else(|| Arc::new(RelayGateway::new()));
        let mut event_log = self.event_log.unwrap_or_else(|| {
            history::open(self.config.history_path.clone(), self.config.history_format)
        });

        if let Err(e) = event_log.initialize() {
            log::error!(
                "Failed to initialize chat history {}: {}",
                self.config.history_path.display(),
                e
            );
        }

        let coordinator = SessionCoordinator::new(gateway.clone(), event_log);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (sessions, _task) = CoordinatorActor::spawn(coordinator, shutdown_rx);

        RelayContext {
            gateway,
            sessions,
            shutdown_tx: Arc::new(shutdown_tx),
            config: self.config,
        }
    }
}

/// Central shared state for the relay. Cloning is cheap.
#[derive(Clone)]
pub struct RelayContext {
    /// Live participant channels.
    pub gateway: Arc<RelayGateway>,
    /// Entry point for every session transition.
    pub sessions: CoordinatorHandle,
    shutdown_tx: Arc<watch::Sender<bool>>,
    config: RelayConfig,
}

impl RelayContext {
    pub fn builder() -> RelayContextBuilder {
        RelayContextBuilder::new()
    }

    /// Start a relay with default wiring for `config`.
    pub fn start(config: RelayConfig) -> Self {
        Self::builder().config(config).start()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Stop the coordinator task. Commands sent afterwards fail.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
