//! Single-writer actor around the [`SessionCoordinator`].
//!
//! Every transport task talks to the coordinator through a cloneable
//! [`CoordinatorHandle`]. Commands are queued on one mpsc channel and applied
//! in arrival order by a dedicated task, so no two transitions ever overlap
//! regardless of how many runtime threads serve connections.
//!
//! Appending to the event log is blocking file I/O, so the actor runs on
//! tokio's blocking pool rather than on a runtime worker.

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use crate::participant::ParticipantId;
use crate::protocol::ClientEvent;

use super::coordinator::SessionCoordinator;
use super::state::SessionSnapshot;

/// Bound on queued commands before senders wait.
pub const CHANNEL_CAPACITY: usize = 256;

/// Work items for the coordinator task.
#[derive(Debug)]
pub enum SessionCommand {
    /// A decoded frame from a connected participant.
    Client {
        origin: ParticipantId,
        event: ClientEvent,
    },
    /// The transport for this participant has closed.
    Disconnect(ParticipantId),
    /// Reply with a copy of the current state.
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Session coordinator has stopped")]
    Stopped,
}

/// Handle for submitting commands. Cheap to clone.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl CoordinatorHandle {
    pub async fn client_event(
        &self,
        origin: ParticipantId,
        event: ClientEvent,
    ) -> Result<(), CoordinatorError> {
        self.send(SessionCommand::Client { origin, event }).await
    }

    pub async fn disconnect(&self, id: ParticipantId) -> Result<(), CoordinatorError> {
        self.send(SessionCommand::Disconnect(id)).await
    }

    /// Current state, after every previously submitted command has applied.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    async fn send(&self, command: SessionCommand) -> Result<(), CoordinatorError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CoordinatorError::Stopped)
    }
}

/// Task that owns the coordinator.
pub struct CoordinatorActor {
    coordinator: SessionCoordinator,
    command_rx: mpsc::Receiver<SessionCommand>,
    shutdown_rx: watch::Receiver<bool>,
}

impl CoordinatorActor {
    /// Spawn the actor on the current tokio runtime.
    ///
    /// The task ends when every handle is dropped or `true` is published on
    /// the shutdown channel.
    pub fn spawn(
        coordinator: SessionCoordinator,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (CoordinatorHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let actor = Self {
            coordinator,
            command_rx: rx,
            shutdown_rx,
        };
        let runtime = Handle::current();
        let handle = tokio::task::spawn_blocking(move || runtime.block_on(actor.run()));
        (CoordinatorHandle { tx }, handle)
    }

    async fn run(mut self) {
        let mut watching_shutdown = true;
        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                changed = self.shutdown_rx.changed(), if watching_shutdown => match changed {
                    Ok(()) if *self.shutdown_rx.borrow() => break,
                    Ok(()) => {}
                    Err(_) => watching_shutdown = false,
                },
            }
        }
        log::debug!("Session coordinator stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Client { origin, event } => {
                log::debug!("{} from {}", event.name(), origin);
                self.coordinator.apply(origin, event);
            }
            SessionCommand::Disconnect(id) => {
                self.coordinator.disconnect(&id);
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.coordinator.snapshot());
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
