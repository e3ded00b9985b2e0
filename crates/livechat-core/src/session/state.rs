//! Session state owned by the coordinator.

use serde::Serialize;

use crate::history::NO_ACTIVE_CHAT;
use crate::participant::ParticipantId;

/// A user waiting for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub requesting_participant: ParticipantId,
}

/// The one live pairing of a user and an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChat {
    pub user_participant: ParticipantId,
    pub agent_participant: ParticipantId,
}

impl ActiveChat {
    /// `{user}-{agent}`, the id stamped on every record of this chat.
    pub fn chat_id(&self) -> String {
        format!("{}-{}", self.user_participant, self.agent_participant)
    }

    pub fn involves(&self, id: &ParticipantId) -> bool {
        &self.user_participant == id || &self.agent_participant == id
    }
}

/// Chat id for records written while `chat` is (or is not) active.
pub fn chat_id_for(chat: Option<&ActiveChat>) -> String {
    chat.map(ActiveChat::chat_id)
        .unwrap_or_else(|| NO_ACTIVE_CHAT.to_string())
}

/// Coarse view of the coordinator.
///
/// A request may be pending while a chat is active; `Active` wins then.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Pending,
    Active,
}

/// Point-in-time copy of the coordinator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub pending_request: Option<ChatRequest>,
    pub active_chat: Option<ActiveChat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> ActiveChat {
        ActiveChat {
            user_participant: ParticipantId::from("u1"),
            agent_participant: ParticipantId::from("a1"),
        }
    }

    #[test]
    fn chat_id_joins_user_and_agent() {
        assert_eq!(chat().chat_id(), "u1-a1");
    }

    #[test]
    fn chat_id_for_without_chat_is_sentinel() {
        assert_eq!(chat_id_for(None), "no-active-chat");
        assert_eq!(chat_id_for(Some(&chat())), "u1-a1");
    }

    #[test]
    fn involves_matches_either_party() {
        let chat = chat();
        assert!(chat.involves(&ParticipantId::from("u1")));
        assert!(chat.involves(&ParticipantId::from("a1")));
        assert!(!chat.involves(&ParticipantId::from("x9")));
    }

    #[test]
    fn snapshot_serializes_phase_lowercase() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::Pending,
            pending_request: Some(ChatRequest {
                requesting_participant: ParticipantId::from("u1"),
            }),
            active_chat: None,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["phase"], "pending");
        assert_eq!(value["pendingRequest"]["requestingParticipant"], "u1");
    }
}
