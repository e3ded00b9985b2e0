//! WebSocket handler: one connection per participant.
//!
//! Clients connect to `/ws`. The first frame they receive is `connected`
//! with their identity; after that, intent frames they send are forwarded
//! to the session coordinator and notifications addressed to them are
//! written back.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use livechat_core::protocol::{ClientEvent, ServerEvent};
use livechat_core::relay::Notifier;

use super::SharedState;

/// Handler for GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SharedState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<SharedState>) {
    let (mut sender, mut receiver) = socket.split();

    let (id, mut events) = state.relay.gateway.register();
    log::info!("New client connected: {}", id);

    // Queued ahead of anything the coordinator might send.
    state
        .relay
        .gateway
        .notify_one(&id, ServerEvent::Connected { id: id.clone() });

    // Forward intents to the coordinator
    let sessions = state.relay.sessions.clone();
    let origin = id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match ClientEvent::parse(text.as_str()) {
                    Ok(event) => {
                        if sessions.client_event(origin.clone(), event).await.is_err() {
                            log::warn!("Session coordinator unavailable, closing {}", origin);
                            break;
                        }
                    }
                    Err(e) => log::debug!("Ignoring frame from {}: {}", origin, e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Forward notifications to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(message) = encode(&event) else {
                continue;
            };
            if sender.send(message).await.is_err() {
                break; // Client disconnected
            }
        }
    });

    // Wait for either side to finish, then tear down the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    state.relay.gateway.unregister(&id);
    log::info!("Client disconnected: {}", id);
    if state.relay.sessions.disconnect(id).await.is_err() {
        log::warn!("Session coordinator unavailable during disconnect");
    }
}

/// Encode a notification as a text frame.
fn encode(event: &ServerEvent) -> Option<Message> {
    match event.to_json() {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            log::warn!("Failed to serialize {}: {}", event.name(), e);
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use livechat_core::participant::{ParticipantId, Sender};
    use livechat_core::protocol::ChatPayload;

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text.as_str().to_string(),
            other => panic!("Expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn encode_produces_text_frame() {
        let message = encode(&ServerEvent::ChatEnded).unwrap();
        assert_eq!(text_of(message), r#"{"event":"chatEnded"}"#);
    }

    #[test]
    fn encode_connected_includes_identity() {
        let message = encode(&ServerEvent::Connected {
            id: ParticipantId::from("socket-1"),
        })
        .unwrap();
        assert_eq!(
            text_of(message),
            r#"{"event":"connected","payload":{"id":"socket-1"}}"#
        );
    }

    #[test]
    fn encode_receive_message_keeps_field_order() {
        let message = encode(&ServerEvent::ReceiveMessage(ChatPayload {
            sender: Sender::User,
            text: "hi".to_string(),
            time: "10:00".to_string(),
        }))
        .unwrap();
        assert_eq!(
            text_of(message),
            r#"{"event":"receiveMessage","payload":{"sender":"user","text":"hi","time":"10:00"}}"#
        );
    }
}
