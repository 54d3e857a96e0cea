pub mod handlers;
pub mod hub;
pub mod models;
pub mod routes;

pub use hub::{ConnectionHandle, NotificationHub};
pub use models::{Notification, NotificationKind};
