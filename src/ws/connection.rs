//! Event-feed connection loop.
//!
//! Handles the read/write loop for a single `/ws/events` connection,
//! dispatching subscription commands and forwarding filtered registry
//! events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::RegistryEvent;

/// Runs the read/write loop for a single event-feed connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<RegistryEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(text.as_str(), &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if subs.matches(&event.service.name) {
                            let msg = WsMessage::new(
                                event.event_id.to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&event).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("event feed connection closed");
}

/// Handles a text message from the client, returning an optional JSON
/// response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return error_reply(String::new(), 400, "malformed JSON");
    };

    let response = match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(WsCommand::Subscribe { services }) => {
            subs.subscribe(services.iter().map(String::as_str));
            serde_json::json!({
                "subscribed": services,
                "count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        Ok(WsCommand::Unsubscribe { services }) => {
            subs.unsubscribe(services.iter().map(String::as_str));
            serde_json::json!({
                "unsubscribed": services,
                "remaining_count": subs.count(),
            })
        }
        Err(_) => return error_reply(msg.id, 404, "unknown command"),
    };

    serde_json::to_string(&WsMessage::new(msg.id, WsMessageType::Response, response)).ok()
}

fn error_reply(id: String, code: u16, message: &str) -> Option<String> {
    let err = WsMessage::new(
        id,
        WsMessageType::Error,
        serde_json::json!({ "code": code, "message": message }),
    );
    serde_json::to_string(&err).ok()
}
