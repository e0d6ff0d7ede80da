//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod club;
pub mod event;
pub mod payment;
pub mod registration;
pub mod report;
pub mod user;

// Re-export commonly used models
pub use club::{AssignLeaderRequest, Club, ClubListing, CreateClubRequest, JoinClubRequest, MembershipRequest, RequestDecision, RequestStatus, ReviewMembershipRequest};
pub use event::{CreateEventRequest, Event, EventStatus, NewEvent, ReviewDecision, ReviewEventRequest, Visibility};
pub use payment::{CheckoutSummary, CreateOrderRequest, NewPayment, OrderSummary, Payment, PaymentStatus, VerificationOutcome, VerifyPaymentRequest};
pub use registration::{AttendanceReceipt, MarkAttendanceRequest, NewRegistration, RegisteredEvent, Registration};
pub use report::{AdminStats, EventAttendanceSummary, StudentDashboard};
pub use user::{CreateUserRequest, Role, User};
