use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::tickets::models::{Board, Ticket};

use super::{seed_tickets, TicketStore};

struct UserRecord {
    tickets: Vec<Ticket>,
    last_activity: Instant,
}

impl UserRecord {
    fn new(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            last_activity: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// In-memory ticket store: one map of user records behind a single
/// reader/writer lock.
///
/// Reads take the shared lock, every mutation and the eviction sweep take
/// the exclusive lock, which makes operations on a single user's sequence
/// linearizable. The sweep scans the whole map under one write lock per
/// tick - an O(n) pause, acceptable for bounded user counts.
pub struct MemoryTicketStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, UserRecord>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, UserRecord>> {
        self.users.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn create_user(&self) -> Result<String> {
        let user_id = Uuid::new_v4().to_string();
        self.write()
            .insert(user_id.clone(), UserRecord::new(seed_tickets()));
        Ok(user_id)
    }

    async fn add_ticket(&self, user_id: &str, ticket: Ticket) -> Result<()> {
        let mut users = self.write();
        let record = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::UserNotFound(format!("User '{}' not found", user_id)))?;

        record.tickets.push(ticket);
        record.touch();
        Ok(())
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<Ticket>> {
        let users = self.read();
        let record = users
            .get(user_id)
            .ok_or_else(|| AppError::UserNotFound(format!("User '{}' not found", user_id)))?;

        Ok(record.tickets.clone())
    }

    async fn get_all_by_status(&self, user_id: &str) -> Result<Board> {
        let tickets = self.get_all(user_id).await?;
        Ok(Board::partition(tickets))
    }

    async fn delete_ticket(&self, user_id: &str, ticket_id: Uuid) -> Result<()> {
        let mut users = self.write();
        let record = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::UserNotFound(format!("User '{}' not found", user_id)))?;

        // Only the first match goes; duplicate ids within a user are the
        // caller's problem but must not cascade into a multi-delete.
        let position = record
            .tickets
            .iter()
            .position(|t| t.id == ticket_id)
            .ok_or_else(|| AppError::TicketNotFound(format!("Ticket '{}' not found", ticket_id)))?;

        record.tickets.remove(position);
        record.touch();
        Ok(())
    }

    async fn replace_all(&self, user_id: &str, tickets: Vec<Ticket>) -> Result<()> {
        let mut users = self.write();
        let record = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::UserNotFound(format!("User '{}' not found", user_id)))?;

        record.tickets = tickets;
        record.touch();
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.write().remove(user_id);
        Ok(())
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize> {
        let mut users = self.write();
        let before = users.len();

        users.retain(|user_id, record| {
            let keep = record.last_activity.elapsed() <= max_idle;
            if !keep {
                tracing::info!(user_id = %user_id, "Evicted idle user");
            }
            keep
        });

        Ok(before - users.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::features::tickets::models::TicketStatus;

    fn ticket(title: &str, status: TicketStatus) -> Ticket {
        Ticket::new(title.to_string(), String::new(), status)
    }

    #[tokio::test]
    async fn create_user_seeds_default_tickets() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        let tickets = store.get_all(&user_id).await.unwrap();
        assert_eq!(tickets.len(), 5);

        let mut ids: Vec<_> = tickets.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Todo));
    }

    #[tokio::test]
    async fn operations_on_unknown_user_fail() {
        let store = MemoryTicketStore::new();

        assert!(matches!(
            store.get_all("nope").await.unwrap_err(),
            AppError::UserNotFound(_)
        ));
        assert!(matches!(
            store
                .add_ticket("nope", ticket("t", TicketStatus::Todo))
                .await
                .unwrap_err(),
            AppError::UserNotFound(_)
        ));
        assert!(matches!(
            store.replace_all("nope", vec![]).await.unwrap_err(),
            AppError::UserNotFound(_)
        ));
        assert!(matches!(
            store
                .delete_ticket("nope", Uuid::new_v4())
                .await
                .unwrap_err(),
            AppError::UserNotFound(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let store = Arc::new(MemoryTicketStore::new());
        let user_id = store.create_user().await.unwrap();

        // Start from an empty sequence so only the concurrent adds remain.
        store.replace_all(&user_id, vec![]).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..5 {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add_ticket(&user_id, ticket(&format!("t{}", n), TicketStatus::Todo))
                    .await
            }));
        }
        for handle in handles {
            assert_ok!(handle.await.unwrap());
        }

        let tickets = store.get_all(&user_id).await.unwrap();
        assert_eq!(tickets.len(), 5);

        let mut ids: Vec<_> = tickets.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn concurrent_mixed_writers_serialize_per_user() {
        let store = Arc::new(MemoryTicketStore::new());
        let user_id = store.create_user().await.unwrap();
        store.replace_all(&user_id, vec![]).await.unwrap();

        let mut handles = Vec::new();
        for worker in 0..4 {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..25 {
                    store
                        .add_ticket(
                            &user_id,
                            ticket(&format!("w{}-{}", worker, n), TicketStatus::Todo),
                        )
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 4 writers x 25 adds, all serialized by the store lock.
        assert_eq!(store.get_all(&user_id).await.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn idle_user_is_evicted_after_one_tick() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let evicted = store.evict_idle(Duration::from_millis(1)).await.unwrap();

        assert_eq!(evicted, 1);
        assert!(matches!(
            store.get_all(&user_id).await.unwrap_err(),
            AppError::UserNotFound(_)
        ));
    }

    #[tokio::test]
    async fn recently_active_user_survives_the_sweep() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        let evicted = store.evict_idle(Duration::from_secs(60)).await.unwrap();

        assert_eq!(evicted, 0);
        assert_ok!(store.get_all(&user_id).await);
    }

    #[tokio::test]
    async fn mutations_reset_the_idle_clock() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        store
            .add_ticket(&user_id, ticket("fresh", TicketStatus::Todo))
            .await
            .unwrap();

        let evicted = store.evict_idle(Duration::from_millis(8)).await.unwrap();
        assert_eq!(evicted, 0);
    }

    #[tokio::test]
    async fn delete_missing_ticket_leaves_sequence_unchanged() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();
        let before = store.get_all(&user_id).await.unwrap();

        let err = store
            .delete_ticket(&user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TicketNotFound(_)));

        let after = store.get_all(&user_id).await.unwrap();
        assert_eq!(before.len(), after.len());
        assert!(before.iter().zip(&after).all(|(a, b)| a.id == b.id));
    }

    #[tokio::test]
    async fn delete_removes_only_the_first_match() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        let duplicated = ticket("dup", TicketStatus::Todo);
        store
            .replace_all(&user_id, vec![duplicated.clone(), duplicated.clone()])
            .await
            .unwrap();

        store.delete_ticket(&user_id, duplicated.id).await.unwrap();

        let remaining = store.get_all(&user_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, duplicated.id);
    }

    #[tokio::test]
    async fn replace_with_empty_yields_empty_board() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        store.replace_all(&user_id, vec![]).await.unwrap();
        let board = store.get_all_by_status(&user_id).await.unwrap();

        assert!(board.todo.is_empty());
        assert!(board.in_progress.is_empty());
        assert!(board.done.is_empty());
    }

    #[tokio::test]
    async fn delete_user_is_idempotent() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        assert_ok!(store.delete_user(&user_id).await);
        assert_ok!(store.delete_user(&user_id).await);
        assert_ok!(store.delete_user("never-existed").await);

        assert_err!(store.get_all(&user_id).await);
    }

    #[tokio::test]
    async fn board_buckets_follow_sequence_order() {
        let store = MemoryTicketStore::new();
        let user_id = store.create_user().await.unwrap();

        let a = ticket("a", TicketStatus::InProgress);
        let b = ticket("b", TicketStatus::Done);
        let c = ticket("c", TicketStatus::InProgress);
        store
            .replace_all(&user_id, vec![a.clone(), b.clone(), c.clone()])
            .await
            .unwrap();

        let board = store.get_all_by_status(&user_id).await.unwrap();
        assert_eq!(
            board.in_progress.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![a.id, c.id]
        );
        assert_eq!(board.done[0].id, b.id);
        assert!(board.todo.is_empty());
    }
}
