use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::notifications::handlers::sse_handler;
use crate::features::notifications::hub::NotificationHub;

/// Create routes for the notifications feature
pub fn routes(hub: Arc<NotificationHub>) -> Router {
    Router::new()
        .route(
            "/api/notifications",
            get(sse_handler::notification_stream),
        )
        .with_state(hub)
}
