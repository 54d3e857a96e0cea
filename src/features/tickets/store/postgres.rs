use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::tickets::models::{Board, Ticket};

use super::{seed_tickets, TicketStore};

/// Retry budget for optimistic-concurrency conflicts on one mutation
const MAX_WRITE_RETRIES: u32 = 3;

/// Durable ticket store backed by Postgres.
///
/// Each user's entire ticket sequence lives in one JSONB column and every
/// mutation is a read-modify-write of that blob. A `version` column with a
/// compare-and-swap update keeps concurrent writers for the same user from
/// losing updates; the losing writer reloads and retries.
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, user_id: &str) -> Result<(Vec<Ticket>, i64)> {
        let row = sqlx::query("SELECT tickets, version FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::UserNotFound(format!("User '{}' not found", user_id)))?;

        let tickets_json: serde_json::Value = row.try_get("tickets")?;
        let version: i64 = row.try_get("version")?;

        let tickets = serde_json::from_value(tickets_json)?;
        Ok((tickets, version))
    }

    /// Write back a new ticket sequence if the row is still at
    /// `expected_version`. Returns false when another writer got there first.
    async fn store_if_unchanged(
        &self,
        user_id: &str,
        tickets: &[Ticket],
        expected_version: i64,
    ) -> Result<bool> {
        let tickets_json = serde_json::to_value(tickets)?;

        let result = sqlx::query(
            "UPDATE users \
             SET tickets = $2, version = version + 1, updated_at = $3 \
             WHERE id = $1 AND version = $4",
        )
        .bind(user_id)
        .bind(tickets_json)
        .bind(Utc::now())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Read-modify-write one user's sequence under optimistic concurrency.
    async fn mutate<F>(&self, user_id: &str, mut apply: F) -> Result<()>
    where
        F: FnMut(Vec<Ticket>) -> Result<Vec<Ticket>> + Send,
    {
        for attempt in 0..MAX_WRITE_RETRIES {
            let (tickets, version) = self.load(user_id).await?;
            let updated = apply(tickets)?;

            if self.store_if_unchanged(user_id, &updated, version).await? {
                return Ok(());
            }

            // Another writer bumped the version (or the sweep deleted the
            // row; the reload surfaces that as UserNotFound).
            tracing::debug!(user_id = %user_id, attempt, "Version conflict, retrying");
        }

        Err(AppError::Conflict(format!(
            "Concurrent updates for user '{}' exceeded the retry budget",
            user_id
        )))
    }
}

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn create_user(&self) -> Result<String> {
        let user_id = Uuid::new_v4().to_string();
        let tickets_json = serde_json::to_value(seed_tickets())?;

        sqlx::query(
            "INSERT INTO users (id, tickets, version, updated_at) VALUES ($1, $2, 0, $3)",
        )
        .bind(&user_id)
        .bind(tickets_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn add_ticket(&self, user_id: &str, ticket: Ticket) -> Result<()> {
        self.mutate(user_id, move |mut tickets| {
            tickets.push(ticket.clone());
            Ok(tickets)
        })
        .await
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<Ticket>> {
        let (tickets, _) = self.load(user_id).await?;
        Ok(tickets)
    }

    async fn get_all_by_status(&self, user_id: &str) -> Result<Board> {
        let tickets = self.get_all(user_id).await?;
        Ok(Board::partition(tickets))
    }

    async fn delete_ticket(&self, user_id: &str, ticket_id: Uuid) -> Result<()> {
        self.mutate(user_id, move |mut tickets| {
            let position = tickets
                .iter()
                .position(|t| t.id == ticket_id)
                .ok_or_else(|| {
                    AppError::TicketNotFound(format!("Ticket '{}' not found", ticket_id))
                })?;

            tickets.remove(position);
            Ok(tickets)
        })
        .await
    }

    async fn replace_all(&self, user_id: &str, tickets: Vec<Ticket>) -> Result<()> {
        self.mutate(user_id, move |_| Ok(tickets.clone())).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize> {
        let max_idle = chrono::Duration::from_std(max_idle)
            .map_err(|e| AppError::Internal(format!("Invalid max_idle duration: {}", e)))?;
        let cutoff = Utc::now() - max_idle;

        let result = sqlx::query("DELETE FROM users WHERE updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }
}
