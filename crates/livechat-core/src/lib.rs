//! # livechat-core
//!
//! Core logic for the live-support chat relay.
//!
//! This crate knows nothing about HTTP or WebSockets and can be driven by:
//! - the axum WebSocket front end (`livechat-http`)
//! - tests, through a recording [`relay::Notifier`]
//!
//! ## Key Concepts
//!
//! - **Participant**: one live connection, identified by a [`ParticipantId`]
//! - **ChatRequest / ActiveChat**: the at-most-one pending request and chat
//! - **LogRecord**: one entry of the append-only audit trail

pub mod context;
pub mod history;
pub mod participant;
pub mod protocol;
pub mod relay;
pub mod session;

// Re-export commonly used types
pub use context::{RelayConfig, RelayContext};
pub use participant::{Endpoint, ParticipantId, Sender};
pub use protocol::{ChatPayload, ClientEvent, ServerEvent};
pub use relay::{Notifier, RelayGateway};
pub use session::{CoordinatorHandle, SessionCoordinator, SessionPhase};
