mod ticket;

pub use ticket::{Board, Ticket, TicketStatus};
