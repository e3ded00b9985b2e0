//! SessionCoordinator - the one-request, one-chat state machine.
//!
//! Every transition runs to completion against `&mut self`; callers are
//! expected to funnel all mutations through a single owner (see
//! [`super::actor`]). Invalid transitions are silent no-ops.

use std::sync::Arc;

use chrono::Local;

use crate::history::{ChatMessage, EventLog};
use crate::participant::{Endpoint, ParticipantId, Sender};
use crate::protocol::{ChatPayload, ClientEvent, ServerEvent};
use crate::relay::Notifier;

use super::state::{chat_id_for, ActiveChat, ChatRequest, SessionPhase, SessionSnapshot};

const TEXT_REQUESTED: &str = "Chat requested";
const TEXT_STARTED: &str = "Chat started";
const TEXT_ENDED: &str = "Chat ended";
const TEXT_ENDED_DISCONNECT: &str = "Chat ended (client disconnected)";

/// Local wall-clock time as shown in chat transcripts, e.g. `09:41 AM`.
pub fn display_time() -> String {
    Local::now().format("%I:%M %p").to_string()
}

/// Owns the pending request and the active chat.
pub struct SessionCoordinator {
    pending: Option<ChatRequest>,
    active: Option<ActiveChat>,
    notifier: Arc<dyn Notifier>,
    log: Box<dyn EventLog>,
}

impl SessionCoordinator {
    pub fn new(notifier: Arc<dyn Notifier>, log: Box<dyn EventLog>) -> Self {
        Self {
            pending: None,
            active: None,
            notifier,
            log,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.pending, &self.active) {
            (_, Some(_)) => SessionPhase::Active,
            (Some(_), None) => SessionPhase::Pending,
            (None, None) => SessionPhase::Idle,
        }
    }

    pub fn pending_request(&self) -> Option<&ChatRequest> {
        self.pending.as_ref()
    }

    pub fn active_chat(&self) -> Option<&ActiveChat> {
        self.active.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            pending_request: self.pending.clone(),
            active_chat: self.active.clone(),
        }
    }

    /// Dispatch a decoded client frame sent by `origin`.
    pub fn apply(&mut self, origin: ParticipantId, event: ClientEvent) {
        match event {
            ClientEvent::RequestChat => self.request_chat(origin),
            ClientEvent::AcceptChat(agent) => {
                self.accept_chat(agent.unwrap_or(origin));
            }
            ClientEvent::SendMessage(payload) => {
                self.send_message(&origin, payload);
            }
            ClientEvent::EndChat => {
                self.end_chat();
            }
        }
    }

    /// Record `user` as the pending request, replacing any earlier one, and
    /// tell every connection about it.
    pub fn request_chat(&mut self, user: ParticipantId) {
        if let Some(previous) = &self.pending {
            log::debug!(
                "Chat request from {} replaces pending request from {}",
                user,
                previous.requesting_participant
            );
        }
        log::info!("Chat requested by {}", user);

        self.pending = Some(ChatRequest {
            requesting_participant: user.clone(),
        });
        self.notifier.notify_all(ServerEvent::NewChatRequest);

        self.record(ChatMessage {
            sender: Sender::System,
            text: TEXT_REQUESTED.to_string(),
            time: display_time(),
            from: user.into(),
            to: Endpoint::AllAgents,
        });
    }

    /// Pair `agent` with the pending request. Returns `false` when nothing
    /// was pending.
    pub fn accept_chat(&mut self, agent: ParticipantId) -> bool {
        let Some(request) = self.pending.take() else {
            log::debug!("Ignoring accept from {}: no pending request", agent);
            return false;
        };
        let user = request.requesting_participant;

        if let Some(previous) = &self.active {
            log::warn!("Accept replaces active chat {}", previous.chat_id());
        }
        let chat = ActiveChat {
            user_participant: user.clone(),
            agent_participant: agent.clone(),
        };
        log::info!("Chat started: {}", chat.chat_id());
        self.active = Some(chat);

        self.notifier.notify_one(&user, ServerEvent::ChatStarted);
        self.notifier.notify_one(&agent, ServerEvent::ChatStarted);

        self.record(ChatMessage {
            sender: Sender::System,
            text: TEXT_STARTED.to_string(),
            time: display_time(),
            from: agent.into(),
            to: user.into(),
        });
        true
    }

    /// Relay a message to the other party of the active chat. Returns
    /// `false` when no chat is active.
    pub fn send_message(&mut self, origin: &ParticipantId, payload: ChatPayload) -> bool {
        let Some(chat) = &self.active else {
            log::debug!("Ignoring message from {}: no active chat", origin);
            return false;
        };

        let receiver = match payload.sender {
            Sender::User => chat.agent_participant.clone(),
            Sender::Agent | Sender::System => chat.user_participant.clone(),
        };

        self.record(ChatMessage {
            sender: payload.sender,
            text: payload.text.clone(),
            time: payload.time.clone(),
            from: origin.clone().into(),
            to: receiver.clone().into(),
        });
        self.notifier
            .notify_one(&receiver, ServerEvent::ReceiveMessage(payload));
        true
    }

    /// End the active chat on request. Returns `false` when none is active.
    pub fn end_chat(&mut self) -> bool {
        self.finish_chat(TEXT_ENDED)
    }

    /// Handle a closed connection. Ends the active chat when `id` is one of
    /// its parties; a pending request from `id` is left in place.
    pub fn disconnect(&mut self, id: &ParticipantId) -> bool {
        let is_party = self.active.as_ref().is_some_and(|chat| chat.involves(id));
        if !is_party {
            if self
                .pending
                .as_ref()
                .is_some_and(|request| &request.requesting_participant == id)
            {
                log::debug!("Requester {} disconnected, pending request kept", id);
            }
            return false;
        }

        log::info!("Participant {} disconnected mid-chat", id);
        self.finish_chat(TEXT_ENDED_DISCONNECT)
    }

    fn finish_chat(&mut self, text: &str) -> bool {
        let Some(chat) = &self.active else {
            log::debug!("Ignoring end: no active chat");
            return false;
        };

        self.notifier
            .notify_one(&chat.user_participant, ServerEvent::ChatEnded);
        self.notifier
            .notify_one(&chat.agent_participant, ServerEvent::ChatEnded);

        self.record(ChatMessage {
            sender: Sender::System,
            text: text.to_string(),
            time: display_time(),
            from: Endpoint::System,
            to: Endpoint::Both,
        });

        if let Some(chat) = self.active.take() {
            log::info!("Chat ended: {}", chat.chat_id());
        }
        true
    }

    /// Append to the trail; failures are logged and never affect the flow.
    fn record(&mut self, message: ChatMessage) {
        let chat_id = chat_id_for(self.active.as_ref());
        if let Err(e) = self.log.append(message, &chat_id) {
            log::error!("Error writing to chat history: {}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
