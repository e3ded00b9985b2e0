//! Relay gateway: live participant channels and event delivery.
//!
//! The gateway maps each connected participant to the sending half of an
//! unbounded channel. The transport side (one WebSocket task per connection)
//! owns the receiving half and forwards whatever arrives to the socket.
//!
//! # Example
//!
//! ```rust
//! use livechat_core::protocol::ServerEvent;
//! use livechat_core::relay::{Notifier, RelayGateway};
//!
//! let gateway = RelayGateway::new();
//! let (id, mut rx) = gateway.register();
//!
//! assert!(gateway.notify_one(&id, ServerEvent::ChatStarted));
//! assert_eq!(rx.try_recv().unwrap(), ServerEvent::ChatStarted);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::participant::ParticipantId;
use crate::protocol::ServerEvent;

/// Receiving half handed to the transport for one connection.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Outbound delivery used by the session coordinator.
pub trait Notifier: Send + Sync {
    /// Deliver to every connected participant. Returns how many received it.
    fn notify_all(&self, event: ServerEvent) -> usize;

    /// Deliver to exactly one participant. Returns `false` (and drops the
    /// event) when that participant is no longer connected.
    fn notify_one(&self, id: &ParticipantId, event: ServerEvent) -> bool;
}

type Channels = HashMap<ParticipantId, mpsc::UnboundedSender<ServerEvent>>;

/// Registry of live participant channels.
#[derive(Default)]
pub struct RelayGateway {
    channels: Mutex<Channels>,
}

impl RelayGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, Channels> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connection under a freshly minted identity.
    pub fn register(&self) -> (ParticipantId, EventReceiver) {
        let id = ParticipantId::new();
        let rx = self.register_with_id(id.clone());
        (id, rx)
    }

    /// Register a connection under a caller-chosen identity, replacing any
    /// previous channel for it.
    pub fn register_with_id(&self, id: ParticipantId) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.channels().insert(id.clone(), tx).is_some() {
            log::warn!("Participant {} re-registered, previous channel dropped", id);
        }
        rx
    }

    /// Forget a connection. Returns whether it was registered.
    pub fn unregister(&self, id: &ParticipantId) -> bool {
        self.channels().remove(id).is_some()
    }

    pub fn is_connected(&self, id: &ParticipantId) -> bool {
        self.channels().contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.channels().len()
    }
}

impl Notifier for RelayGateway {
    fn notify_all(&self, event: ServerEvent) -> usize {
        let channels = self.channels();
        channels
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    fn notify_one(&self, id: &ParticipantId, event: ServerEvent) -> bool {
        let channels = self.channels();
        match channels.get(id) {
            Some(tx) => {
                let name = event.name();
                let delivered = tx.send(event).is_ok();
                if !delivered {
                    log::debug!("Dropped {} for closed channel {}", name, id);
                }
                delivered
            }
            None => {
                log::debug!("Dropped {} for unknown participant {}", event.name(), id);
                false
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Sender;
    use crate::protocol::ChatPayload;

    mod registry {
        use super::*;

        #[test]
        fn new_gateway_is_empty() {
            let gateway = RelayGateway::new();
            assert_eq!(gateway.connection_count(), 0);
        }

        #[test]
        fn register_assigns_unique_identities() {
            let gateway = RelayGateway::new();
            let (a, _rx_a) = gateway.register();
            let (b, _rx_b) = gateway.register();

            assert_ne!(a, b);
            assert_eq!(gateway.connection_count(), 2);
            assert!(gateway.is_connected(&a));
            assert!(gateway.is_connected(&b));
        }

        #[test]
        fn unregister_removes_connection() {
            let gateway = RelayGateway::new();
            let (id, _rx) = gateway.register();

            assert!(gateway.unregister(&id));
            assert!(!gateway.is_connected(&id));
            assert!(!gateway.unregister(&id));
        }

        #[test]
        fn register_with_id_replaces_previous_channel() {
            let gateway = RelayGateway::new();
            let id = ParticipantId::from("fixed");
            let mut old_rx = gateway.register_with_id(id.clone());
            let mut new_rx = gateway.register_with_id(id.clone());

            gateway.notify_one(&id, ServerEvent::ChatEnded);

            assert!(old_rx.try_recv().is_err());
            assert_eq!(new_rx.try_recv().unwrap(), ServerEvent::ChatEnded);
            assert_eq!(gateway.connection_count(), 1);
        }
    }

    mod delivery {
        use super::*;

        #[test]
        fn notify_one_reaches_only_target() {
            let gateway = RelayGateway::new();
            let (a, mut rx_a) = gateway.register();
            let (_b, mut rx_b) = gateway.register();

            let payload = ChatPayload {
                sender: Sender::User,
                text: "hi".to_string(),
                time: "10:00".to_string(),
            };
            assert!(gateway.notify_one(&a, ServerEvent::ReceiveMessage(payload.clone())));

            assert_eq!(
                rx_a.try_recv().unwrap(),
                ServerEvent::ReceiveMessage(payload)
            );
            assert!(rx_b.try_recv().is_err());
        }

        #[test]
        fn notify_one_unknown_is_silently_dropped() {
            let gateway = RelayGateway::new();
            assert!(!gateway.notify_one(&ParticipantId::from("gone"), ServerEvent::ChatStarted));
        }

        #[test]
        fn notify_one_after_receiver_dropped_returns_false() {
            let gateway = RelayGateway::new();
            let (id, rx) = gateway.register();
            drop(rx);

            assert!(!gateway.notify_one(&id, ServerEvent::ChatStarted));
        }

        #[test]
        fn notify_all_reaches_every_connection() {
            let gateway = RelayGateway::new();
            let (_a, mut rx_a) = gateway.register();
            let (_b, mut rx_b) = gateway.register();

            assert_eq!(gateway.notify_all(ServerEvent::NewChatRequest), 2);
            assert_eq!(rx_a.try_recv().unwrap(), ServerEvent::NewChatRequest);
            assert_eq!(rx_b.try_recv().unwrap(), ServerEvent::NewChatRequest);
        }

        #[test]
        fn notify_all_with_no_connections_returns_zero() {
            let gateway = RelayGateway::new();
            assert_eq!(gateway.notify_all(ServerEvent::NewChatRequest), 0);
        }

        #[test]
        fn notify_all_skips_closed_channels() {
            let gateway = RelayGateway::new();
            let (_a, rx_a) = gateway.register();
            let (_b, mut rx_b) = gateway.register();
            drop(rx_a);

            assert_eq!(gateway.notify_all(ServerEvent::NewChatRequest), 1);
            assert_eq!(rx_b.try_recv().unwrap(), ServerEvent::NewChatRequest);
        }

        #[tokio::test]
        async fn events_arrive_in_order() {
            let gateway = RelayGateway::new();
            let (id, mut rx) = gateway.register();

            gateway.notify_one(&id, ServerEvent::ChatStarted);
            gateway.notify_all(ServerEvent::NewChatRequest);
            gateway.notify_one(&id, ServerEvent::ChatEnded);

            assert_eq!(rx.recv().await.unwrap(), ServerEvent::ChatStarted);
            assert_eq!(rx.recv().await.unwrap(), ServerEvent::NewChatRequest);
            assert_eq!(rx.recv().await.unwrap(), ServerEvent::ChatEnded);
        }
    }
}
