//! Participant identities and message addressing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Transport-assigned identity of one live connection.
///
/// A fresh identity is minted for every WebSocket connection and becomes
/// meaningless once that connection closes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// Value of the `from` / `to` fields of a logged message.
///
/// Either a concrete participant or one of the fixed sentinels used by
/// system records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Participant(ParticipantId),
    AllAgents,
    System,
    Both,
}

impl Endpoint {
    const ALL_AGENTS: &'static str = "all-agents";
    const SYSTEM: &'static str = "system";
    const BOTH: &'static str = "both";

    pub fn as_str(&self) -> &str {
        match self {
            Endpoint::Participant(id) => id.as_str(),
            Endpoint::AllAgents => Self::ALL_AGENTS,
            Endpoint::System => Self::SYSTEM,
            Endpoint::Both => Self::BOTH,
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            Self::ALL_AGENTS => Endpoint::AllAgents,
            Self::SYSTEM => Endpoint::System,
            Self::BOTH => Endpoint::Both,
            other => Endpoint::Participant(ParticipantId::from(other)),
        }
    }
}

impl From<ParticipantId> for Endpoint {
    fn from(id: ParticipantId) -> Self {
        Endpoint::Participant(id)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Endpoint::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod participant_id {
        use super::*;

        #[test]
        fn new_generates_unique_ids() {
            assert_ne!(ParticipantId::new(), ParticipantId::new());
        }

        #[test]
        fn display_shows_inner_string() {
            let id = ParticipantId::from("socket-1");
            assert_eq!(id.to_string(), "socket-1");
        }

        #[test]
        fn serializes_as_plain_string() {
            let id = ParticipantId::from("socket-1");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"socket-1\"");
        }
    }

    mod sender {
        use super::*;

        #[test]
        fn uses_lowercase_wire_names() {
            assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
            assert_eq!(serde_json::to_string(&Sender::Agent).unwrap(), "\"agent\"");
            assert_eq!(
                serde_json::to_string(&Sender::System).unwrap(),
                "\"system\""
            );
        }

        #[test]
        fn rejects_unknown_role() {
            assert!(serde_json::from_str::<Sender>("\"admin\"").is_err());
        }
    }

    mod endpoint {
        use super::*;

        #[test]
        fn sentinels_serialize_to_fixed_strings() {
            assert_eq!(
                serde_json::to_string(&Endpoint::AllAgents).unwrap(),
                "\"all-agents\""
            );
            assert_eq!(
                serde_json::to_string(&Endpoint::System).unwrap(),
                "\"system\""
            );
            assert_eq!(serde_json::to_string(&Endpoint::Both).unwrap(), "\"both\"");
        }

        #[test]
        fn participant_serializes_to_its_id() {
            let endpoint = Endpoint::from(ParticipantId::from("abc"));
            assert_eq!(serde_json::to_string(&endpoint).unwrap(), "\"abc\"");
        }

        #[test]
        fn deserializes_sentinels_and_ids() {
            let both: Endpoint = serde_json::from_str("\"both\"").unwrap();
            assert_eq!(both, Endpoint::Both);

            let other: Endpoint = serde_json::from_str("\"socket-9\"").unwrap();
            assert_eq!(
                other,
                Endpoint::Participant(ParticipantId::from("socket-9"))
            );
        }
    }
}
