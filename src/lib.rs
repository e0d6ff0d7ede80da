//! ClubHub backend
//!
//! Campus club and event management: club membership, event approval,
//! registrations with QR attendance, and paid checkout through a payment
//! gateway. The HTTP surface sits on top of engines that only talk to the
//! storage, blob and gateway traits, so every engine runs against Postgres
//! in production and against in-memory stores in tests.

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{ClubHubError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, MemoryStore, Stores};
pub use handlers::router;
pub use services::ServiceFactory;
pub use state::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
