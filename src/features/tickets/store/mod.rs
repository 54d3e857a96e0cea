use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::tickets::models::{Board, Ticket, TicketStatus};

mod memory;
mod postgres;

pub use memory::MemoryTicketStore;
pub use postgres::PostgresTicketStore;

/// The per-user ticket collection contract.
///
/// Every operation is keyed by an opaque user identifier. Implementations
/// must keep each user's sequence linearizable across concurrent callers
/// and bump the user's last-activity stamp on every mutation, since the
/// eviction sweep keys off it.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Allocate a fresh user seeded with the default ticket set.
    async fn create_user(&self) -> Result<String>;

    /// Append a ticket to the user's sequence.
    async fn add_ticket(&self, user_id: &str, ticket: Ticket) -> Result<()>;

    /// All tickets for the user, in insertion order.
    async fn get_all(&self, user_id: &str) -> Result<Vec<Ticket>>;

    /// Tickets partitioned by status, bucket order preserving sequence order.
    async fn get_all_by_status(&self, user_id: &str) -> Result<Board>;

    /// Remove the first ticket with a matching id.
    async fn delete_ticket(&self, user_id: &str, ticket_id: Uuid) -> Result<()>;

    /// Wholesale replacement of the user's sequence. Membership in the prior
    /// set is not validated; callers are responsible for filtering.
    async fn replace_all(&self, user_id: &str, tickets: Vec<Ticket>) -> Result<()>;

    /// Remove the user entirely. Idempotent.
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    /// One sweep tick: evict every user idle for longer than `max_idle`.
    /// Returns the number of users evicted.
    async fn evict_idle(&self, max_idle: Duration) -> Result<usize>;
}

/// Default ticket set seeded into every new user
pub(crate) fn seed_tickets() -> Vec<Ticket> {
    (1..=5)
        .map(|n| {
            Ticket::new(
                format!("Test {}", n),
                "this is a test description".to_string(),
                TicketStatus::Todo,
            )
        })
        .collect()
}

/// Handle to a running eviction sweep. Dropping it (or calling [`stop`])
/// stops future ticks; a tick already holding the store lock always runs to
/// completion.
///
/// [`stop`]: SweepHandle::stop
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the recurring eviction sweep for `store`.
///
/// A failed tick is logged and the loop continues; the sweep never takes the
/// process down.
pub fn spawn_eviction_sweep(
    store: Arc<dyn TicketStore>,
    interval: Duration,
    max_idle: Duration,
) -> SweepHandle {
    let (shutdown, mut rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        tracing::info!(
            interval_secs = interval.as_secs(),
            max_idle_secs = max_idle.as_secs(),
            "Starting eviction sweep"
        );

        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.evict_idle(max_idle).await {
                        Ok(0) => {}
                        Ok(evicted) => tracing::info!(evicted, "Evicted idle users"),
                        Err(e) => tracing::error!("Eviction sweep failed: {:?}", e),
                    }
                }
                _ = rx.changed() => {
                    tracing::info!("Eviction sweep stopped");
                    break;
                }
            }
        }
    });

    SweepHandle { shutdown, task }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_evicts_on_tick_and_stops_cleanly() {
        let store = Arc::new(MemoryTicketStore::new());
        let user_id = store.create_user().await.unwrap();

        let handle = spawn_eviction_sweep(
            Arc::clone(&store) as Arc<dyn TicketStore>,
            Duration::from_millis(10),
            Duration::from_millis(1),
        );

        // Give the sweep a few ticks to notice the idle user.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;

        let err = store.get_all(&user_id).await.unwrap_err();
        assert!(matches!(
            err,
            crate::core::error::AppError::UserNotFound(_)
        ));
    }
}
