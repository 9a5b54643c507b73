use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use farmaid_types::events::GatewayEvent;

/// Manages all connected admin sessions and broadcasts store events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events — all connected clients receive all events
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<String, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    pub async fn register_user_channel(
        &self,
        user_id: &str,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(user_id.to_string(), (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    /// A newer connection may have taken the slot over in the meantime.
    pub async fn unregister_user_channel(&self, user_id: &str, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(user_id);
            }
        }
    }

    /// Send a targeted event to a specific user, if connected.
    pub async fn send_to_user(&self, user_id: &str, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(user_id) {
            let _ = tx.send(event);
        }
    }

    /// Route an event: targeted events go to their user only, everything
    /// else is broadcast.
    pub async fn publish(&self, event: GatewayEvent) {
        match event.target_user() {
            Some(user_id) => {
                let user_id = user_id.to_string();
                self.send_to_user(&user_id, event).await;
            }
            None => self.broadcast(event),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use farmaid_types::models::Notification;

    use super::*;

    fn notification_for(user_id: &str) -> GatewayEvent {
        GatewayEvent::NotificationCreate {
            notification: Notification {
                id: Uuid::new_v4(),
                user_id: user_id.into(),
                title: None,
                message: "donation received".into(),
                image_url: None,
                read: false,
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn publish_routes_notifications_to_their_user_only() {
        let dispatcher = Dispatcher::new();
        let (_conn_a, mut rx_a) = dispatcher.register_user_channel("admin-a").await;
        let (_conn_b, mut rx_b) = dispatcher.register_user_channel("admin-b").await;

        dispatcher.publish(notification_for("admin-a")).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_broadcasts_unscoped_events() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher
            .publish(GatewayEvent::Ready {
                user_id: "demo".into(),
                name: "Demo Admin".into(),
            })
            .await;

        assert!(matches!(rx.try_recv(), Ok(GatewayEvent::Ready { .. })));
    }

    #[tokio::test]
    async fn stale_connections_cannot_unregister_their_successor() {
        let dispatcher = Dispatcher::new();
        let (old_conn, _old_rx) = dispatcher.register_user_channel("admin-a").await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel("admin-a").await;

        dispatcher.unregister_user_channel("admin-a", old_conn).await;
        dispatcher.send_to_user("admin-a", notification_for("admin-a")).await;

        assert!(new_rx.try_recv().is_ok());
    }
}
