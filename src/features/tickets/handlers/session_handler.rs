use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::core::extractor::UserId;
use crate::features::notifications::Notification;
use crate::features::tickets::dtos::SessionResponseDto;
use crate::shared::types::ApiResponse;

use super::TicketState;

/// Create a fresh user seeded with the default board
#[utoipa::path(
    post,
    path = "/api/session",
    responses(
        (status = 200, description = "User created", body = ApiResponse<SessionResponseDto>),
    ),
    tag = "session"
)]
pub async fn create_session(
    State(state): State<TicketState>,
) -> Result<Json<ApiResponse<SessionResponseDto>>> {
    let user_id = state.store.create_user().await?;
    tracing::info!(user_id = %user_id, "Created user");

    state.hub.publish(&user_id, Notification::info("New user"));

    Ok(Json(ApiResponse::success(
        Some(SessionResponseDto { user_id }),
        None,
        None,
    )))
}

/// Delete the current user and all their tickets
#[utoipa::path(
    delete,
    path = "/api/session",
    responses(
        (status = 200, description = "User deleted (idempotent)"),
        (status = 401, description = "Missing user id")
    ),
    security(("user_id" = [])),
    tag = "session"
)]
pub async fn delete_session(
    user: UserId,
    State(state): State<TicketState>,
) -> Result<Json<ApiResponse<()>>> {
    tracing::info!(user_id = %user.0, "Resetting session");
    state.store.delete_user(&user.0).await?;

    Ok(Json(ApiResponse::success(None, None, None)))
}
