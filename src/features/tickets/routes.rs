use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::features::tickets::handlers::{session_handler, ticket_handler, TicketState};

/// Create routes for the tickets feature
pub fn routes(state: TicketState) -> Router {
    Router::new()
        .route(
            "/api/session",
            post(session_handler::create_session).delete(session_handler::delete_session),
        )
        .route(
            "/api/tickets",
            get(ticket_handler::list_tickets).post(ticket_handler::create_ticket),
        )
        .route("/api/tickets/board", get(ticket_handler::get_board))
        .route("/api/tickets/status", put(ticket_handler::update_statuses))
        .route("/api/tickets/{id}", delete(ticket_handler::delete_ticket))
        .with_state(state)
}
