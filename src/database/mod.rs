//! Database module
//!
//! This module handles database connections, the storage traits the engines
//! depend on, and their Postgres and in-memory implementations.

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool};
pub use memory::MemoryStore;
pub use repositories::{
    ClubRepository, EventRepository, PaymentRepository, RegistrationRepository, ReportRepository,
    UserRepository,
};
pub use service::DatabaseService;
pub use store::{ClubStore, EventStore, PaymentStore, RegistrationStore, ReportStore, Stores, UserStore};
