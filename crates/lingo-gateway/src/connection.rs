use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lingo_types::events::GatewayEvent;

use crate::broadcaster::Broadcaster;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serve one authenticated WebSocket connection until either side closes.
///
/// The bearer token is checked at the HTTP upgrade, so the socket starts
/// straight at Ready. Clients only listen; anything they send other than
/// Pong/Close is ignored.
pub async fn handle_connection(
    socket: WebSocket,
    broadcaster: Broadcaster,
    user_id: Uuid,
    username: String,
) {
    let (mut sender, mut receiver) = socket.split();

    // Register before Ready so anything published after the client sees
    // Ready is guaranteed to reach it.
    let mut subscription = broadcaster.connect(user_id).await;
    let conn_id = subscription.conn_id;
    let live = broadcaster.connection_count().await;
    info!("{} ({}) connected to gateway, {} live connections", username, user_id, live);

    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    };
    let delivered = match encode(&ready) {
        Some(text) => sender.send(Message::Text(text.into())).await.is_ok(),
        None => false,
    };
    if !delivered {
        broadcaster.disconnect(conn_id).await;
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward broadcasts -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = subscription.events.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(n)) => {
                            warn!("Gateway subscriber {} lagged by {} events", conn_id, n);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let Some(text) = encode(&event) else { continue };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_username = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Text(text) => {
                    debug!(
                        "{} ({}) sent unsupported frame: {}",
                        recv_username,
                        user_id,
                        text.as_str().chars().take(200).collect::<String>()
                    );
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    broadcaster.disconnect(conn_id).await;
    let live = broadcaster.connection_count().await;
    info!("{} ({}) disconnected from gateway, {} live connections", username, user_id, live);
}

fn encode(event: &GatewayEvent) -> Option<String> {
    serde_json::to_string(event)
        .map_err(|e| warn!("Failed to encode {} event: {}", event.kind(), e))
        .ok()
}
