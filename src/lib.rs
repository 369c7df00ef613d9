pub mod api;
pub mod config;
pub mod model;
pub mod store;

pub use config::ServerConfig;
pub use model::{Ticket, TicketId, TicketStatus};
pub use store::{Redemption, StoreError, TicketStore};
