//! Shared state for the HTTP server.
//!
//! Wraps the relay context and anything else HTTP handlers need.

use livechat_core::RelayContext;

/// Shared state available to all HTTP handlers.
#[derive(Clone)]
pub struct SharedState {
    /// Gateway and coordinator handle.
    pub relay: RelayContext,
}

impl SharedState {
    pub fn new(relay: RelayContext) -> Self {
        Self { relay }
    }
}
