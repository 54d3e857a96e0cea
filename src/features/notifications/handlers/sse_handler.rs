use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};

use crate::core::extractor::UserId;
use crate::features::notifications::hub::NotificationHub;
use crate::features::notifications::models::Notification;

/// Frame one notification for the wire.
///
/// A render failure is substituted with an error frame instead of tearing
/// the stream down; the delivery loop keeps going.
fn render_notification(notification: &Notification) -> (&'static str, String) {
    match serde_json::to_string(notification) {
        Ok(json) => ("notification", json),
        Err(e) => {
            tracing::warn!("Failed to render notification: {}", e);
            ("error", "error rendering notification".to_string())
        }
    }
}

/// Attach the user's live notification stream
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "SSE stream of notification events", content_type = "text/event-stream"),
        (status = 401, description = "Missing user id")
    ),
    security(("user_id" = [])),
    tag = "notifications"
)]
pub async fn notification_stream(
    user: UserId,
    State(hub): State<Arc<NotificationHub>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let handle = Arc::clone(&hub).subscribe(user.0);
    tracing::info!(
        user_id = %handle.user_id(),
        connections = hub.connection_count(),
        "SSE connection attached"
    );

    // The handle is the stream state; dropping it on client disconnect (or
    // after displacement ends the stream) releases the hub entry.
    let stream = stream::unfold(handle, |mut handle| async move {
        let notification = handle.next().await?;
        let (event_type, data) = render_notification(&notification);
        let event = Event::default().event(event_type).data(data);

        Some((Ok::<_, Infallible>(event), handle))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_notification_frames_as_json() {
        let (event_type, data) = render_notification(&Notification::info("Added ticket 42"));

        assert_eq!(event_type, "notification");
        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["kind"], "info");
        assert_eq!(value["message"], "Added ticket 42");
    }
}
