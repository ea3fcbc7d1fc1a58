use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};

use cramr_types::events::push_channel;

use crate::hub::PushHub;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Consecutive unanswered pings after which a device counts as gone.
const MAX_MISSED_PONGS: u8 = 2;

/// Pong bookkeeping shared by the two halves of a push socket.
#[derive(Clone, Default)]
struct Liveness {
    ponged: Arc<AtomicBool>,
}

impl Liveness {
    fn pong(&self) {
        self.ponged.store(true, Ordering::Release);
    }

    /// Called on each heartbeat tick before the next ping goes out.
    /// Returns false once the device has missed too many pongs.
    fn check(&self, missed: &mut u8) -> bool {
        if self.ponged.swap(false, Ordering::Acquire) {
            *missed = 0;
        } else {
            *missed += 1;
        }
        *missed < MAX_MISSED_PONGS
    }
}

/// Serve one device's push socket. The bearer token was already validated
/// at the HTTP upgrade, so the socket goes straight to delivery.
pub async fn handle_push_socket(socket: WebSocket, hub: PushHub, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let channel = push_channel(&user_id);
    let (conn_id, mut push_rx) = hub.subscribe(&channel).await;
    info!("Device for {} connected to push channel {}", user_id, channel);

    let liveness = Liveness::default();
    liveness.pong();
    let on_pong = liveness.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed = 0;

        loop {
            tokio::select! {
                payload = push_rx.recv() => {
                    let Some(payload) = payload else { break };
                    let text = match serde_json::to_string(&payload) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode push payload: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if !liveness.check(&mut missed) {
                        warn!("Push socket missed {} pongs, closing", missed);
                        break;
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Devices only answer pings and close; anything else is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => on_pong.pong(),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unsubscribe(&channel, conn_id).await;
    info!("Device for {} disconnected from push channel {}", user_id, channel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_device_is_dropped_after_two_ticks() {
        let liveness = Liveness::default();
        let mut missed = 0;
        liveness.pong();

        assert!(liveness.check(&mut missed));
        assert!(liveness.check(&mut missed));
        assert_eq!(missed, 1);
        assert!(!liveness.check(&mut missed));
    }

    #[test]
    fn pong_resets_the_count() {
        let liveness = Liveness::default();
        let mut missed = 0;

        assert!(liveness.check(&mut missed));
        liveness.pong();
        assert!(liveness.check(&mut missed));
        assert_eq!(missed, 0);
    }
}
