use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use cramr_types::events::PushPayload;

/// Routes push payloads to the device currently subscribed to a channel.
#[derive(Clone, Default)]
pub struct PushHub {
    inner: Arc<PushHubInner>,
}

#[derive(Default)]
struct PushHubInner {
    /// Per-channel targeted senders: channel -> (conn_id, sender).
    /// The most recent subscription for a channel wins.
    channels: RwLock<HashMap<String, (Uuid, mpsc::UnboundedSender<PushPayload>)>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `channel`. Returns (conn_id, receiver).
    pub async fn subscribe(&self, channel: &str) -> (Uuid, mpsc::UnboundedReceiver<PushPayload>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .channels
            .write()
            .await
            .insert(channel.to_string(), (conn_id, tx));
        debug!("Push channel {} subscribed ({})", channel, conn_id);
        (conn_id, rx)
    }

    /// Unregister a subscriber, but only if conn_id still owns the channel.
    pub async fn unsubscribe(&self, channel: &str, conn_id: Uuid) {
        let mut channels = self.inner.channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(channel) {
            if *stored_conn_id == conn_id {
                channels.remove(channel);
                debug!("Push channel {} unsubscribed ({})", channel, conn_id);
            }
        }
    }

    /// Publish a payload. Returns whether a live subscriber received it.
    pub async fn publish(&self, channel: &str, payload: PushPayload) -> bool {
        let channels = self.inner.channels.read().await;
        match channels.get(channel) {
            Some((_, tx)) => tx.send(payload).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(seshid: &str) -> PushPayload {
        PushPayload {
            alert: "Ada invited you to work on Algorithms".into(),
            seshid: seshid.into(),
            course_name: "CS 161: Algorithms".into(),
            message: "Ada invited you to work on Algorithms".into(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let hub = PushHub::new();
        let (_, mut rx) = hub.subscribe("a42").await;

        assert!(hub.publish("a42", payload("s1")).await);
        assert_eq!(rx.recv().await.unwrap().seshid, "s1");
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_not_delivered() {
        let hub = PushHub::new();
        assert!(!hub.publish("a42", payload("s1")).await);
    }

    #[tokio::test]
    async fn newer_subscription_takes_over() {
        let hub = PushHub::new();
        let (old_conn, mut old_rx) = hub.subscribe("a42").await;
        let (_, mut new_rx) = hub.subscribe("a42").await;

        // The stale connection going away must not drop the new one
        hub.unsubscribe("a42", old_conn).await;

        assert!(hub.publish("a42", payload("s2")).await);
        assert_eq!(new_rx.recv().await.unwrap().seshid, "s2");
        assert!(old_rx.recv().await.is_none());
    }
}
