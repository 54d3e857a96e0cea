use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::notifications::handlers::sse_handler;
use crate::features::notifications::models as notifications_models;
use crate::features::tickets::handlers::{session_handler, ticket_handler};
use crate::features::tickets::{dtos as tickets_dtos, models as tickets_models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Session
        session_handler::create_session,
        session_handler::delete_session,
        // Tickets
        ticket_handler::list_tickets,
        ticket_handler::get_board,
        ticket_handler::create_ticket,
        ticket_handler::delete_ticket,
        ticket_handler::update_statuses,
        // Notifications
        sse_handler::notification_stream,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Session
            tickets_dtos::SessionResponseDto,
            ApiResponse<tickets_dtos::SessionResponseDto>,
            // Tickets
            tickets_models::TicketStatus,
            tickets_dtos::TicketResponseDto,
            tickets_dtos::BoardResponseDto,
            tickets_dtos::CreateTicketDto,
            tickets_dtos::TicketStatusUpdateDto,
            tickets_dtos::UpdateStatusesDto,
            ApiResponse<Vec<tickets_dtos::TicketResponseDto>>,
            ApiResponse<tickets_dtos::TicketResponseDto>,
            ApiResponse<tickets_dtos::BoardResponseDto>,
            // Notifications (SSE payload)
            notifications_models::NotificationKind,
            notifications_models::Notification,
        )
    ),
    tags(
        (name = "session", description = "Anonymous session lifecycle"),
        (name = "tickets", description = "Per-user ticket board"),
        (name = "notifications", description = "Live server-push notifications (SSE)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Taskboard API",
        version = "0.1.0",
        description = "API documentation for the session task board",
    )
)]
pub struct ApiDoc;

/// Adds the x-user-id header security scheme to the OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-id"))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
