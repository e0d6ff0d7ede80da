//! Storage traits
//!
//! The engines only talk to storage through these traits. Every method that
//! guards a once-only transition is a single atomic primitive in the backing
//! store (conditional update or uniqueness constraint), never a read followed
//! by a write in application memory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::models::*;
use crate::utils::errors::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, request: CreateUserRequest) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Every non-admin account, newest first
    async fn list_users(&self) -> Result<Vec<User>>;

    /// `None` when no such user exists
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>>;
}

#[async_trait]
pub trait ClubStore: Send + Sync {
    async fn insert_club(&self, request: CreateClubRequest) -> Result<Club>;

    async fn find_club(&self, id: Uuid) -> Result<Option<Club>>;

    async fn find_club_by_leader(&self, leader_id: Uuid) -> Result<Option<Club>>;

    async fn list_clubs(&self) -> Result<Vec<Club>>;

    /// Promote `user_id` to leader of `club_id`, demoting any previous leader
    /// and adding the new leader to the member set, as one unit.
    async fn assign_leader(&self, club_id: Uuid, user_id: Uuid) -> Result<Club>;

    /// Set-add; returns `false` when the user was already a member
    async fn add_member(&self, club_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn is_member(&self, club_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn member_club_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    async fn member_count(&self, club_id: Uuid) -> Result<i64>;

    /// Fails with `Conflict` when a pending request already exists for the pair
    async fn insert_request(&self, club_id: Uuid, student_id: Uuid, reason: Option<String>) -> Result<MembershipRequest>;

    async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>>;

    async fn has_pending_request(&self, club_id: Uuid, student_id: Uuid) -> Result<bool>;

    /// Newest first
    async fn pending_requests(&self, club_id: Uuid) -> Result<Vec<MembershipRequest>>;

    /// Moves a pending request to `status`; approval set-adds the student to the
    /// club in the same unit. Returns `None` when the request is no longer pending.
    async fn review_request(
        &self,
        id: Uuid,
        status: RequestStatus,
        reviewer: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<MembershipRequest>>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: NewEvent) -> Result<Event>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>>;

    /// Conditional `pending -> status`; `None` when the event is not pending
    async fn review_event(&self, id: Uuid, status: EventStatus) -> Result<Option<Event>>;

    /// Newest first
    async fn pending_events(&self) -> Result<Vec<Event>>;

    /// Newest first
    async fn club_events(&self, club_id: Uuid) -> Result<Vec<Event>>;

    /// Approved events dated on or after `today`, date ascending, fetched lazily
    fn approved_upcoming(&self, today: NaiveDate) -> BoxStream<'_, Result<Event>>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Fails with `Conflict` when the (event, student) pair already holds a registration
    /// `Conflict` on a duplicate pair, or when `capacity` is set and already
    /// reached. The capacity count and the insert are one atomic unit.
    async fn insert_registration(&self, registration: NewRegistration) -> Result<Registration>;

    async fn find_registration(&self, event_id: Uuid, student_id: Uuid) -> Result<Option<Registration>>;

    /// Exact match on all three components
    async fn find_by_qr(&self, event_id: Uuid, student_id: Uuid, qr_token: &str) -> Result<Option<Registration>>;

    async fn count_for_event(&self, event_id: Uuid) -> Result<i64>;

    async fn registered_event_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>>;

    /// Conditional `attended = false -> true` plus a set-add of the student into the
    /// event's attended set, as one unit. `None` when already attended.
    async fn mark_attended(&self, registration_id: Uuid, at: DateTime<Utc>) -> Result<Option<Registration>>;

    /// Unattended registrations for events on or after `today`, date ascending
    async fn registered_upcoming(&self, student_id: Uuid, today: NaiveDate) -> Result<Vec<RegisteredEvent>>;

    /// Attended registrations, most recent attendance first
    async fn attended_history(&self, student_id: Uuid) -> Result<Vec<RegisteredEvent>>;

    /// Attended registrations of one event, most recent attendance first
    async fn attendees(&self, event_id: Uuid) -> Result<Vec<Registration>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment>;

    async fn find_paid(&self, student_id: Uuid, event_id: Uuid) -> Result<Option<Payment>>;

    async fn find_by_order(&self, order_id: &str, student_id: Uuid, event_id: Uuid) -> Result<Option<Payment>>;

    /// Conditional `created -> paid`; `None` when the payment was already completed
    async fn complete_payment(
        &self,
        id: Uuid,
        gateway_payment_id: &str,
        gateway_signature: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Payment>>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn admin_stats(&self) -> Result<AdminStats>;

    async fn event_attendance(&self, event_id: Uuid) -> Result<EventAttendanceSummary>;

    async fn student_dashboard(&self, student_id: Uuid, today: NaiveDate) -> Result<StudentDashboard>;
}

/// Handles to every store, shared by the services
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub clubs: Arc<dyn ClubStore>,
    pub events: Arc<dyn EventStore>,
    pub registrations: Arc<dyn RegistrationStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub reports: Arc<dyn ReportStore>,
}

/// Whole percent, 0 when nothing was registered
pub fn attendance_rate(attended: i64, registered: i64) -> i64 {
    if registered <= 0 {
        return 0;
    }
    ((attended as f64 / registered as f64) * 100.0).round() as i64
}
