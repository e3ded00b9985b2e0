//! Chat session coordination.
//!
//! At most one pending request and one active chat exist per relay. The
//! coordinator owns both; the actor serializes every mutation.

mod actor;
mod coordinator;
mod state;

pub use actor::{CoordinatorActor, CoordinatorError, CoordinatorHandle, SessionCommand};
pub use coordinator::{display_time, SessionCoordinator};
pub use state::{chat_id_for, ActiveChat, ChatRequest, SessionPhase, SessionSnapshot};
