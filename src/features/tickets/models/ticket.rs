use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Ticket status enum matching the board columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Todo => write!(f, "todo"),
            TicketStatus::InProgress => write!(f, "in-progress"),
            TicketStatus::Done => write!(f, "done"),
        }
    }
}

/// A single unit of work on a user's board.
///
/// The id is immutable and unique within one user's sequence; everything
/// else may be updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub status: TicketStatus,
}

impl Ticket {
    pub fn new(title: String, description: String, status: TicketStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            created_at: now,
            last_updated_at: now,
            status,
        }
    }
}

/// A user's tickets partitioned by status, bucket order preserving the
/// underlying sequence order.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub todo: Vec<Ticket>,
    pub in_progress: Vec<Ticket>,
    pub done: Vec<Ticket>,
}

impl Board {
    pub fn partition(tickets: Vec<Ticket>) -> Self {
        let mut board = Board::default();
        for ticket in tickets {
            match ticket.status {
                TicketStatus::Todo => board.todo.push(ticket),
                TicketStatus::InProgress => board.in_progress.push(ticket),
                TicketStatus::Done => board.done.push(ticket),
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_preserves_sequence_order() {
        let t1 = Ticket::new("a".into(), "".into(), TicketStatus::Todo);
        let t2 = Ticket::new("b".into(), "".into(), TicketStatus::Done);
        let t3 = Ticket::new("c".into(), "".into(), TicketStatus::Todo);

        let board = Board::partition(vec![t1.clone(), t2.clone(), t3.clone()]);

        assert_eq!(board.todo.len(), 2);
        assert_eq!(board.todo[0].id, t1.id);
        assert_eq!(board.todo[1].id, t3.id);
        assert_eq!(board.done.len(), 1);
        assert_eq!(board.done[0].id, t2.id);
        assert!(board.in_progress.is_empty());
    }

    #[test]
    fn status_serialises_to_kebab_case() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(TicketStatus::InProgress.to_string(), "in-progress");
    }
}
