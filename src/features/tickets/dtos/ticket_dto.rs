use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::tickets::models::{Board, Ticket, TicketStatus};

/// Response DTO for ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponseDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponseDto {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            status: t.status,
            created_at: t.created_at,
            last_updated_at: t.last_updated_at,
        }
    }
}

/// The board split into its three status columns
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoardResponseDto {
    pub todo: Vec<TicketResponseDto>,
    pub in_progress: Vec<TicketResponseDto>,
    pub done: Vec<TicketResponseDto>,
}

impl From<Board> for BoardResponseDto {
    fn from(board: Board) -> Self {
        Self {
            todo: board.todo.into_iter().map(Into::into).collect(),
            in_progress: board.in_progress.into_iter().map(Into::into).collect(),
            done: board.done.into_iter().map(Into::into).collect(),
        }
    }
}

/// DTO for creating a ticket
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTicketDto {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TicketStatus,
}

/// One entry of a bulk status update
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketStatusUpdateDto {
    pub id: Uuid,
    pub status: TicketStatus,
}

/// DTO for the bulk status update: the full board as the client wants it.
/// Tickets not listed here are dropped from the user's sequence.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusesDto {
    #[validate(length(min = 1, message = "at least one update is required"))]
    pub updates: Vec<TicketStatusUpdateDto>,
}

/// Response DTO for session creation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponseDto {
    pub user_id: String,
}
