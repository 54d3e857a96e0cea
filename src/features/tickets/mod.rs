pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;

pub use handlers::TicketState;
pub use store::{
    spawn_eviction_sweep, MemoryTicketStore, PostgresTicketStore, SweepHandle, TicketStore,
};
