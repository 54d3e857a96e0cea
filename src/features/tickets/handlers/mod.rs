use std::sync::Arc;

use crate::features::notifications::NotificationHub;
use crate::features::tickets::store::TicketStore;

pub mod session_handler;
pub mod ticket_handler;

/// State for ticket and session handlers
#[derive(Clone)]
pub struct TicketState {
    pub store: Arc<dyn TicketStore>,
    pub hub: Arc<NotificationHub>,
}
