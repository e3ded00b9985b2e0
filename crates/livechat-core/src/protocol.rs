//! Wire protocol spoken over each participant's WebSocket.
//!
//! Every text frame is a JSON object `{"event": <name>, "payload": <value>}`.
//! The payload is omitted for events that carry none.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::participant::{ParticipantId, Sender};

/// `{sender, text, time}` as typed by a client and relayed to its peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender: Sender,
    pub text: String,
    /// Display-formatted time chosen by the sending client (e.g. "10:05 AM").
    #[serde(default)]
    pub time: String,
}

/// Raw frame envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

/// Intent events sent by a client view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    RequestChat,
    /// The agent identity to pair with the pending request. `None` means
    /// "the connection that sent this frame".
    AcceptChat(Option<ParticipantId>),
    SendMessage(ChatPayload),
    EndChat,
}

impl ClientEvent {
    /// Decode a client text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let frame: Frame = serde_json::from_str(text)?;
        match frame.event.as_str() {
            "requestChat" => Ok(ClientEvent::RequestChat),
            "acceptChat" => {
                let agent = match frame.payload {
                    Value::String(id) if !id.is_empty() => Some(ParticipantId(id)),
                    _ => None,
                };
                Ok(ClientEvent::AcceptChat(agent))
            }
            "sendMessage" => Ok(ClientEvent::SendMessage(serde_json::from_value(
                frame.payload,
            )?)),
            "endChat" => Ok(ClientEvent::EndChat),
            _ => Err(ProtocolError::UnknownEvent(frame.event)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RequestChat => "requestChat",
            ClientEvent::AcceptChat(_) => "acceptChat",
            ClientEvent::SendMessage(_) => "sendMessage",
            ClientEvent::EndChat => "endChat",
        }
    }
}

/// Notifications pushed from the relay to client views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// First frame on every connection; tells the client its own identity.
    Connected { id: ParticipantId },
    NewChatRequest,
    ChatStarted,
    ReceiveMessage(ChatPayload),
    ChatEnded,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::NewChatRequest => "newChatRequest",
            ServerEvent::ChatStarted => "chatStarted",
            ServerEvent::ReceiveMessage(_) => "receiveMessage",
            ServerEvent::ChatEnded => "chatEnded",
        }
    }

    pub fn to_frame(&self) -> Frame {
        let payload = match self {
            ServerEvent::Connected { id } => serde_json::json!({ "id": id }),
            ServerEvent::ReceiveMessage(message) => {
                serde_json::to_value(message).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };
        Frame {
            event: self.name().to_string(),
            payload,
        }
    }

    /// Serialize as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&self.to_frame())?)
    }
}
