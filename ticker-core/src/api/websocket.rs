// api/websocket.rs
//
// Subscriber channel. Each connection gets one reader (handling
// subscribe/unsubscribe frames and keeping the hot-set counts current) and
// one writer task that drains the hub-owned outbound queue to the socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::ApiState;
use crate::hub::SubscriberId;
use ticker_common::types::StreamMessage;

#[derive(Debug, Deserialize)]
struct ClientAction {
    action: ActionKind,
    symbol: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ActionKind {
    Subscribe,
    Unsubscribe,
}

pub(super) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let id: SubscriberId = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<StreamMessage>(state.queue_capacity);

    // Frames produced by the reader itself (error envelopes) share the
    // outbound queue so per-subscriber ordering holds.
    let feedback_tx = tx.clone();
    state.hub.register(id, tx);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(text) => {
                    if ws_tx.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("failed to serialize outbound frame: {}", e),
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut subscribed: HashSet<String> = HashSet::new();

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_action(&state, id, &text, &mut subscribed, &feedback_tx).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.hub.unregister(id);
    if let Some(hot_set) = &state.hot_set {
        for symbol in &subscribed {
            if let Err(e) = hot_set.decrement_subscriber_count(symbol).await {
                debug!("failed to decrement hot-set count for {}: {}", symbol, e);
            }
        }
    }
    drop(feedback_tx);

    let _ = writer.await;
}

async fn handle_action(
    state: &ApiState,
    id: SubscriberId,
    text: &str,
    subscribed: &mut HashSet<String>,
    feedback_tx: &mpsc::Sender<StreamMessage>,
) {
    let action: ClientAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(_) => {
            let _ = feedback_tx.try_send(StreamMessage::error("", "invalid message format"));
            return;
        }
    };

    let symbol = match state.validator.normalize(&action.symbol) {
        Ok(symbol) => symbol,
        Err(e) => {
            let _ = feedback_tx.try_send(StreamMessage::error(action.symbol, e.to_string()));
            return;
        }
    };

    match action.action {
        ActionKind::Subscribe => {
            if state.hub.subscribe(id, &symbol) && subscribed.insert(symbol.clone()) {
                if let Some(hot_set) = &state.hot_set {
                    if let Err(e) = hot_set.increment_subscriber_count(&symbol).await {
                        debug!("failed to increment hot-set count for {}: {}", symbol, e);
                    }
                }
            }
        }
        ActionKind::Unsubscribe => {
            if state.hub.unsubscribe(id, &symbol) && subscribed.remove(&symbol) {
                if let Some(hot_set) = &state.hot_set {
                    if let Err(e) = hot_set.decrement_subscriber_count(&symbol).await {
                        debug!("failed to decrement hot-set count for {}: {}", symbol, e);
                    }
                }
            }
        }
    }
}
