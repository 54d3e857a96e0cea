use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

use crate::features::notifications::models::Notification;

/// Bounded per-connection event queue; a publish against a full queue drops
/// the notification rather than blocking the publisher.
pub const NOTIFY_QUEUE_CAPACITY: usize = 8;

struct ConnectionEntry {
    conn_id: u64,
    tx: mpsc::Sender<Notification>,
    displace: watch::Sender<bool>,
}

/// Manages the live server-push connections, at most one per user.
///
/// Subscribing while a connection already exists displaces the old one: its
/// delivery loop terminates and the new connection takes the slot.
pub struct NotificationHub {
    inner: Mutex<HashMap<String, ConnectionEntry>>,
    next_conn_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            next_conn_id: AtomicU64::new(0),
        }
    }

    fn connections(&self) -> MutexGuard<'_, HashMap<String, ConnectionEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a live connection for `user_id`, displacing any existing one.
    pub fn subscribe(self: Arc<Self>, user_id: impl Into<String>) -> ConnectionHandle {
        let user_id = user_id.into();
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE_CAPACITY);
        let (displace_tx, displace_rx) = watch::channel(false);

        let previous = self.connections().insert(
            user_id.clone(),
            ConnectionEntry {
                conn_id,
                tx,
                displace: displace_tx,
            },
        );
        if let Some(old) = previous {
            // Fires before the old entry drops so the displaced loop sees a
            // signal, not a closed channel.
            let _ = old.displace.send(true);
            tracing::debug!(user_id = %user_id, "Displaced existing connection");
        }

        tracing::debug!(user_id = %user_id, conn_id, "Subscribed");

        ConnectionHandle {
            hub: self,
            user_id,
            conn_id,
            rx,
            displaced: displace_rx,
        }
    }

    /// Fire-and-forget delivery. No connection or a full queue is a silent
    /// drop; publishers never block and never observe backpressure.
    pub fn publish(&self, user_id: &str, notification: Notification) {
        let connections = self.connections();
        let Some(entry) = connections.get(user_id) else {
            return;
        };

        match entry.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                tracing::debug!(user_id = %user_id, kind = ?n.kind, "Queue full, dropping notification");
            }
            // Receiver mid-teardown; the entry goes away with it.
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Number of live connections, used for logging and tests
    pub fn connection_count(&self) -> usize {
        self.connections().len()
    }

    fn unsubscribe(&self, user_id: &str, conn_id: u64) {
        let mut connections = self.connections();
        // A displaced handle's cleanup must never evict its successor.
        if connections
            .get(user_id)
            .is_some_and(|entry| entry.conn_id == conn_id)
        {
            connections.remove(user_id);
            tracing::debug!(user_id = %user_id, conn_id, "Unsubscribed");
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One live connection's receiving end.
///
/// The handle is the delivery loop's single suspension point: [`next`]
/// resolves when a notification arrives or when the connection is displaced.
/// Dropping the handle (client disconnect) releases the hub entry.
///
/// [`next`]: ConnectionHandle::next
pub struct ConnectionHandle {
    hub: Arc<NotificationHub>,
    user_id: String,
    conn_id: u64,
    rx: mpsc::Receiver<Notification>,
    displaced: watch::Receiver<bool>,
}

impl ConnectionHandle {
    /// Wait for the next notification. Returns None once the connection is
    /// displaced; displacement wins over items still sitting in the queue.
    pub async fn next(&mut self) -> Option<Notification> {
        tokio::select! {
            biased;
            _ = self.displaced.changed() => None,
            notification = self.rx.recv() => notification,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.user_id, self.conn_id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn publish_without_subscriber_is_a_noop() {
        let hub = Arc::new(NotificationHub::new());

        hub.publish("nobody", Notification::info("into the void"));
        assert_eq!(hub.connection_count(), 0);

        // A later subscriber must not see anything published before it attached.
        let mut handle = Arc::clone(&hub).subscribe("nobody");
        assert!(timeout(WAIT, handle.next()).await.is_err());
    }

    #[tokio::test]
    async fn delivery_is_fifo() {
        let hub = Arc::new(NotificationHub::new());
        let mut handle = Arc::clone(&hub).subscribe("u1");

        for n in 0..3 {
            hub.publish("u1", Notification::info(format!("n{}", n)));
        }

        for n in 0..3 {
            let got = handle.next().await.unwrap();
            assert_eq!(got.message, format!("n{}", n));
        }
    }

    #[tokio::test]
    async fn overflow_drops_newest_and_keeps_fifo() {
        let hub = Arc::new(NotificationHub::new());
        let mut handle = Arc::clone(&hub).subscribe("u1");

        // Publish past the queue capacity before the connection drains.
        for n in 0..(NOTIFY_QUEUE_CAPACITY + 4) {
            hub.publish("u1", Notification::info(format!("n{}", n)));
        }

        for n in 0..NOTIFY_QUEUE_CAPACITY {
            let got = handle.next().await.unwrap();
            assert_eq!(got.message, format!("n{}", n));
        }
        assert!(timeout(WAIT, handle.next()).await.is_err());
    }

    #[tokio::test]
    async fn resubscribe_displaces_the_previous_connection() {
        let hub = Arc::new(NotificationHub::new());
        let mut first = Arc::clone(&hub).subscribe("u1");
        let mut second = Arc::clone(&hub).subscribe("u1");

        // The displaced loop terminates even with nothing queued.
        assert_eq!(first.next().await, None);
        assert_eq!(hub.connection_count(), 1);

        hub.publish("u1", Notification::info("for the successor"));
        assert_eq!(second.next().await.unwrap().message, "for the successor");
    }

    #[tokio::test]
    async fn displacement_beats_queued_items() {
        let hub = Arc::new(NotificationHub::new());
        let mut first = Arc::clone(&hub).subscribe("u1");
        hub.publish("u1", Notification::info("queued before displacement"));

        let _second = Arc::clone(&hub).subscribe("u1");

        assert_eq!(first.next().await, None);
    }

    #[tokio::test]
    async fn dropped_handle_releases_the_slot() {
        let hub = Arc::new(NotificationHub::new());
        let handle = Arc::clone(&hub).subscribe("u1");
        assert_eq!(hub.connection_count(), 1);

        drop(handle);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn displaced_handle_drop_leaves_successor_attached() {
        let hub = Arc::new(NotificationHub::new());
        let first = Arc::clone(&hub).subscribe("u1");
        let mut second = Arc::clone(&hub).subscribe("u1");

        drop(first);
        assert_eq!(hub.connection_count(), 1);

        hub.publish("u1", Notification::info("still here"));
        assert_eq!(second.next().await.unwrap().message, "still here");
    }

    #[tokio::test]
    async fn connections_are_isolated_per_user() {
        let hub = Arc::new(NotificationHub::new());
        let mut alice = Arc::clone(&hub).subscribe("alice");
        let mut bob = Arc::clone(&hub).subscribe("bob");

        hub.publish("alice", Notification::warning("only alice"));

        assert_eq!(alice.next().await.unwrap().message, "only alice");
        assert!(timeout(WAIT, bob.next()).await.is_err());
    }
}
