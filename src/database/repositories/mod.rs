//! Database repositories module
//!
//! Postgres implementations of the storage traits

pub mod club;
pub mod event;
pub mod payment;
pub mod registration;
pub mod report;
pub mod user;

// Re-export repositories
pub use club::ClubRepository;
pub use event::EventRepository;
pub use payment::PaymentRepository;
pub use registration::RegistrationRepository;
pub use report::ReportRepository;
pub use user::UserRepository;
