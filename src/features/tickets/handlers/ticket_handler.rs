use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, UserId};
use crate::features::notifications::Notification;
use crate::features::tickets::dtos::{
    BoardResponseDto, CreateTicketDto, TicketResponseDto, UpdateStatusesDto,
};
use crate::features::tickets::models::Ticket;
use crate::shared::types::ApiResponse;

use super::TicketState;

/// List the current user's tickets
#[utoipa::path(
    get,
    path = "/api/tickets",
    responses(
        (status = 200, description = "All tickets in insertion order", body = ApiResponse<Vec<TicketResponseDto>>),
        (status = 401, description = "Missing user id"),
        (status = 404, description = "User not found")
    ),
    security(("user_id" = [])),
    tag = "tickets"
)]
pub async fn list_tickets(
    user: UserId,
    State(state): State<TicketState>,
) -> Result<Json<ApiResponse<Vec<TicketResponseDto>>>> {
    let tickets = state.store.get_all(&user.0).await?;
    let tickets: Vec<TicketResponseDto> = tickets.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(Some(tickets), None, None)))
}

/// The board split by status
#[utoipa::path(
    get,
    path = "/api/tickets/board",
    responses(
        (status = 200, description = "Tickets partitioned into the three columns", body = ApiResponse<BoardResponseDto>),
        (status = 401, description = "Missing user id"),
        (status = 404, description = "User not found")
    ),
    security(("user_id" = [])),
    tag = "tickets"
)]
pub async fn get_board(
    user: UserId,
    State(state): State<TicketState>,
) -> Result<Json<ApiResponse<BoardResponseDto>>> {
    let board = state.store.get_all_by_status(&user.0).await?;

    Ok(Json(ApiResponse::success(Some(board.into()), None, None)))
}

/// Create a ticket on the current user's board
#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketDto,
    responses(
        (status = 200, description = "Ticket created", body = ApiResponse<TicketResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing user id"),
        (status = 404, description = "User not found")
    ),
    security(("user_id" = [])),
    tag = "tickets"
)]
pub async fn create_ticket(
    user: UserId,
    State(state): State<TicketState>,
    AppJson(dto): AppJson<CreateTicketDto>,
) -> Result<Json<ApiResponse<TicketResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let ticket = Ticket::new(dto.title, dto.description, dto.status);
    let ticket_id = ticket.id;

    if let Err(e) = state.store.add_ticket(&user.0, ticket.clone()).await {
        tracing::error!(user_id = %user.0, "Error adding ticket: {:?}", e);
        state
            .hub
            .publish(&user.0, Notification::error("Error adding ticket"));
        return Err(e);
    }

    state
        .hub
        .publish(&user.0, Notification::info(format!("Added ticket {}", ticket_id)));

    Ok(Json(ApiResponse::success(Some(ticket.into()), None, None)))
}

/// Delete one ticket by id
#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket deleted"),
        (status = 401, description = "Missing user id"),
        (status = 404, description = "User or ticket not found")
    ),
    security(("user_id" = [])),
    tag = "tickets"
)]
pub async fn delete_ticket(
    user: UserId,
    State(state): State<TicketState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    tracing::info!(user_id = %user.0, ticket_id = %id, "Deleting ticket");

    if let Err(e) = state.store.delete_ticket(&user.0, id).await {
        tracing::warn!(user_id = %user.0, ticket_id = %id, "Error deleting ticket: {:?}", e);
        state
            .hub
            .publish(&user.0, Notification::error("Error removing ticket"));
        return Err(e);
    }

    state
        .hub
        .publish(&user.0, Notification::info(format!("Removed ticket {}", id)));

    Ok(Json(ApiResponse::success(None, None, None)))
}

/// Bulk status update: the client posts the whole board
#[utoipa::path(
    put,
    path = "/api/tickets/status",
    request_body = UpdateStatusesDto,
    responses(
        (status = 200, description = "Board updated", body = ApiResponse<BoardResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing user id"),
        (status = 404, description = "User not found")
    ),
    security(("user_id" = [])),
    tag = "tickets"
)]
pub async fn update_statuses(
    user: UserId,
    State(state): State<TicketState>,
    AppJson(dto): AppJson<UpdateStatusesDto>,
) -> Result<Json<ApiResponse<BoardResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    let current = state.store.get_all(&user.0).await?;

    // Keep the posted order, first occurrence per id wins; tickets the user
    // does not own are silently ignored, tickets not posted are dropped.
    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut updated = Vec::with_capacity(current.len());
    for update in &dto.updates {
        for ticket in &current {
            if ticket.id != update.id {
                continue;
            }
            if !seen.insert(ticket.id) {
                continue;
            }

            let mut ticket = ticket.clone();
            ticket.status = update.status;
            ticket.last_updated_at = now;
            updated.push(ticket);
        }
    }

    let count = updated.len();
    if let Err(e) = state.store.replace_all(&user.0, updated).await {
        tracing::error!(user_id = %user.0, "Error updating tickets: {:?}", e);
        state
            .hub
            .publish(&user.0, Notification::error("Error updating tickets"));
        return Err(e);
    }

    state
        .hub
        .publish(&user.0, Notification::info(format!("Updated {} tickets", count)));

    let board = state.store.get_all_by_status(&user.0).await?;
    Ok(Json(ApiResponse::success(Some(board.into()), None, None)))
}
