//! In-memory storage
//!
//! Implements every storage trait over plain maps behind one async mutex.
//! Each trait method takes the lock once, so the uniqueness checks and
//! conditional updates below are atomic in the same way the Postgres
//! constraints and `WHERE` guards are.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::BoxStream;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::store::*;
use crate::models::*;
use crate::utils::errors::{ClubHubError, Result};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    clubs: HashMap<Uuid, Club>,
    members: HashSet<(Uuid, Uuid)>,
    requests: HashMap<Uuid, MembershipRequest>,
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, Registration>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    fn registered_event(&self, registration: &Registration) -> Option<RegisteredEvent> {
        let event = self.events.get(&registration.event_id)?;
        Some(RegisteredEvent {
            registration_id: registration.id,
            event_id: event.id,
            club_id: event.club_id,
            title: event.title.clone(),
            date: event.date,
            time: event.time.clone(),
            venue: event.venue.clone(),
            poster: event.poster.clone(),
            qr_code: registration.qr_code.clone(),
            registered_at: registration.registered_at,
            attended: registration.attended,
            attended_at: registration.attended_at,
        })
    }

    fn is_upcoming_unattended(&self, registration: &Registration, today: NaiveDate) -> bool {
        !registration.attended
            && self
                .events
                .get(&registration.event_id)
                .map(|event| event.is_upcoming(today))
                .unwrap_or(false)
    }
}

/// Storage backed by process memory; used by tests and local tooling
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object handles sharing this store
    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            users: self.clone(),
            clubs: self.clone(),
            events: self.clone(),
            registrations: self.clone(),
            payments: self.clone(),
            reports: self.clone(),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, request: CreateUserRequest) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email == request.email) {
            return Err(ClubHubError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            role: request.role,
            club_id: None,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.role != Role::Admin)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_active = active;
            user.clone()
        }))
    }
}

#[async_trait]
impl ClubStore for MemoryStore {
    async fn insert_club(&self, request: CreateClubRequest) -> Result<Club> {
        let mut tables = self.tables.lock().await;
        if tables.clubs.values().any(|c| c.name == request.name) {
            return Err(ClubHubError::Conflict(
                "a club with this name already exists".to_string(),
            ));
        }

        let club = Club {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            leader_id: None,
            created_at: Utc::now(),
        };
        tables.clubs.insert(club.id, club.clone());
        Ok(club)
    }

    async fn find_club(&self, id: Uuid) -> Result<Option<Club>> {
        Ok(self.tables.lock().await.clubs.get(&id).cloned())
    }

    async fn find_club_by_leader(&self, leader_id: Uuid) -> Result<Option<Club>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .clubs
            .values()
            .find(|c| c.leader_id == Some(leader_id))
            .cloned())
    }

    async fn list_clubs(&self) -> Result<Vec<Club>> {
        let tables = self.tables.lock().await;
        let mut clubs: Vec<Club> = tables.clubs.values().cloned().collect();
        clubs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clubs)
    }

    async fn assign_leader(&self, club_id: Uuid, user_id: Uuid) -> Result<Club> {
        let mut tables = self.tables.lock().await;
        let previous = tables
            .clubs
            .get(&club_id)
            .ok_or_else(|| ClubHubError::not_found("club", club_id))?
            .leader_id;

        if tables
            .clubs
            .values()
            .any(|c| c.id != club_id && c.leader_id == Some(user_id))
        {
            return Err(ClubHubError::Conflict(
                "user already leads another club".to_string(),
            ));
        }

        if let Some(previous) = previous.filter(|id| *id != user_id) {
            if let Some(user) = tables.users.get_mut(&previous) {
                user.role = Role::Student;
                user.club_id = None;
            }
        }
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.role = Role::Leader;
            user.club_id = Some(club_id);
        }
        tables.members.insert((club_id, user_id));

        let club = tables
            .clubs
            .get_mut(&club_id)
            .ok_or_else(|| ClubHubError::not_found("club", club_id))?;
        club.leader_id = Some(user_id);
        Ok(club.clone())
    }

    async fn add_member(&self, club_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self.tables.lock().await.members.insert((club_id, user_id)))
    }

    async fn is_member(&self, club_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self.tables.lock().await.members.contains(&(club_id, user_id)))
    }

    async fn member_club_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .members
            .iter()
            .filter(|(_, member)| *member == user_id)
            .map(|(club, _)| *club)
            .collect())
    }

    async fn member_count(&self, club_id: Uuid) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.members.iter().filter(|(club, _)| *club == club_id).count() as i64)
    }

    async fn insert_request(&self, club_id: Uuid, student_id: Uuid, reason: Option<String>) -> Result<MembershipRequest> {
        let mut tables = self.tables.lock().await;
        if tables.requests.values().any(|r| {
            r.club_id == club_id && r.student_id == student_id && r.status == RequestStatus::Pending
        }) {
            return Err(ClubHubError::Conflict(
                "a join request for this club is already pending".to_string(),
            ));
        }

        let request = MembershipRequest {
            id: Uuid::new_v4(),
            club_id,
            student_id,
            status: RequestStatus::Pending,
            reason,
            rejection_reason: None,
            requested_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };
        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>> {
        Ok(self.tables.lock().await.requests.get(&id).cloned())
    }

    async fn has_pending_request(&self, club_id: Uuid, student_id: Uuid) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.requests.values().any(|r| {
            r.club_id == club_id && r.student_id == student_id && r.status == RequestStatus::Pending
        }))
    }

    async fn pending_requests(&self, club_id: Uuid) -> Result<Vec<MembershipRequest>> {
        let tables = self.tables.lock().await;
        let mut requests: Vec<MembershipRequest> = tables
            .requests
            .values()
            .filter(|r| r.club_id == club_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    async fn review_request(
        &self,
        id: Uuid,
        status: RequestStatus,
        reviewer: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<MembershipRequest>> {
        let mut tables = self.tables.lock().await;
        let request = match tables.requests.get_mut(&id) {
            Some(request) if request.status == RequestStatus::Pending => request,
            _ => return Ok(None),
        };

        request.status = status;
        request.reviewed_at = Some(Utc::now());
        request.reviewed_by = Some(reviewer);
        request.rejection_reason = rejection_reason;
        let reviewed = request.clone();

        if reviewed.status == RequestStatus::Approved {
            tables.members.insert((reviewed.club_id, reviewed.student_id));
        }
        Ok(Some(reviewed))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: NewEvent) -> Result<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            club_id: event.club_id,
            created_by: event.created_by,
            title: event.title,
            description: event.description,
            date: event.date,
            time: event.time,
            venue: event.venue,
            visibility: event.visibility,
            status: EventStatus::Pending,
            is_paid: event.is_paid,
            price: event.price,
            max_participants: event.max_participants,
            registration_deadline: event.registration_deadline,
            poster: event.poster,
            attended: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn review_event(&self, id: Uuid, status: EventStatus) -> Result<Option<Event>> {
        let mut tables = self.tables.lock().await;
        match tables.events.get_mut(&id) {
            Some(event) if event.status == EventStatus::Pending => {
                event.status = status;
                event.updated_at = Utc::now();
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn pending_events(&self) -> Result<Vec<Event>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.status == EventStatus::Pending)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn club_events(&self, club_id: Uuid) -> Result<Vec<Event>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.club_id == club_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    fn approved_upcoming(&self, today: NaiveDate) -> BoxStream<'_, Result<Event>> {
        Box::pin(async_stream::stream! {
            let mut events: Vec<Event> = {
                let tables = self.tables.lock().await;
                tables
                    .events
                    .values()
                    .filter(|e| e.status == EventStatus::Approved && e.is_upcoming(today))
                    .cloned()
                    .collect()
            };
            events.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));

            for event in events {
                yield Ok::<Event, ClubHubError>(event);
            }
        })
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn insert_registration(&self, registration: NewRegistration) -> Result<Registration> {
        let mut tables = self.tables.lock().await;
        if tables.registrations.values().any(|r| {
            (r.event_id == registration.event_id && r.student_id == registration.student_id)
                || r.qr_token == registration.qr_token
        }) {
            return Err(ClubHubError::Conflict(
                "already registered for this event".to_string(),
            ));
        }
        if let Some(capacity) = registration.capacity {
            let registered = tables
                .registrations
                .values()
                .filter(|r| r.event_id == registration.event_id)
                .count();
            if registered >= usize::try_from(capacity).unwrap_or(0) {
                return Err(ClubHubError::Conflict("event is full".to_string()));
            }
        }

        let registration = Registration {
            id: Uuid::new_v4(),
            event_id: registration.event_id,
            student_id: registration.student_id,
            qr_token: registration.qr_token,
            qr_code: registration.qr_code,
            registered_at: Utc::now(),
            attended: false,
            attended_at: None,
        };
        tables.registrations.insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn find_registration(&self, event_id: Uuid, student_id: Uuid) -> Result<Option<Registration>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .values()
            .find(|r| r.event_id == event_id && r.student_id == student_id)
            .cloned())
    }

    async fn find_by_qr(&self, event_id: Uuid, student_id: Uuid, qr_token: &str) -> Result<Option<Registration>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .values()
            .find(|r| r.event_id == event_id && r.student_id == student_id && r.qr_token == qr_token)
            .cloned())
    }

    async fn count_for_event(&self, event_id: Uuid) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .count() as i64)
    }

    async fn registered_event_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .values()
            .filter(|r| r.student_id == student_id)
            .map(|r| r.event_id)
            .collect())
    }

    async fn mark_attended(&self, registration_id: Uuid, at: DateTime<Utc>) -> Result<Option<Registration>> {
        let mut tables = self.tables.lock().await;
        let marked = match tables.registrations.get_mut(&registration_id) {
            Some(registration) if !registration.attended => {
                registration.attended = true;
                registration.attended_at = Some(at);
                registration.clone()
            }
            _ => return Ok(None),
        };

        if let Some(event) = tables.events.get_mut(&marked.event_id) {
            if !event.attended.contains(&marked.student_id) {
                event.attended.push(marked.student_id);
            }
        }
        Ok(Some(marked))
    }

    async fn registered_upcoming(&self, student_id: Uuid, today: NaiveDate) -> Result<Vec<RegisteredEvent>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<RegisteredEvent> = tables
            .registrations
            .values()
            .filter(|r| r.student_id == student_id && tables.is_upcoming_unattended(r, today))
            .filter_map(|r| tables.registered_event(r))
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.registered_at.cmp(&b.registered_at)));
        Ok(events)
    }

    async fn attended_history(&self, student_id: Uuid) -> Result<Vec<RegisteredEvent>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<RegisteredEvent> = tables
            .registrations
            .values()
            .filter(|r| r.student_id == student_id && r.attended)
            .filter_map(|r| tables.registered_event(r))
            .collect();
        events.sort_by(|a, b| b.attended_at.cmp(&a.attended_at));
        Ok(events)
    }

    async fn attendees(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let tables = self.tables.lock().await;
        let mut registrations: Vec<Registration> = tables
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && r.attended)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| b.attended_at.cmp(&a.attended_at));
        Ok(registrations)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment> {
        let mut tables = self.tables.lock().await;
        if tables
            .payments
            .values()
            .any(|p| p.gateway_order_id == payment.gateway_order_id)
        {
            return Err(ClubHubError::Conflict(
                "gateway order id already recorded".to_string(),
            ));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            student_id: payment.student_id,
            event_id: payment.event_id,
            amount: payment.amount,
            currency: payment.currency,
            gateway_order_id: payment.gateway_order_id,
            gateway_payment_id: None,
            gateway_signature: None,
            status: PaymentStatus::Created,
            created_at: Utc::now(),
            paid_at: None,
        };
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_paid(&self, student_id: Uuid, event_id: Uuid) -> Result<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.student_id == student_id && p.event_id == event_id && p.status == PaymentStatus::Paid)
            .cloned())
    }

    async fn find_by_order(&self, order_id: &str, student_id: Uuid, event_id: Uuid) -> Result<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.gateway_order_id == order_id && p.student_id == student_id && p.event_id == event_id)
            .cloned())
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        gateway_payment_id: &str,
        gateway_signature: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Payment>> {
        let mut tables = self.tables.lock().await;
        let (student_id, event_id) = match tables.payments.get(&id) {
            Some(p) if p.status == PaymentStatus::Created => (p.student_id, p.event_id),
            _ => return Ok(None),
        };

        if tables.payments.values().any(|p| {
            p.student_id == student_id && p.event_id == event_id && p.status == PaymentStatus::Paid
        }) {
            return Err(ClubHubError::Conflict(
                "another payment for this event is already completed".to_string(),
            ));
        }

        let payment = match tables.payments.get_mut(&id) {
            Some(payment) => payment,
            None => return Ok(None),
        };
        payment.status = PaymentStatus::Paid;
        payment.gateway_payment_id = Some(gateway_payment_id.to_string());
        payment.gateway_signature = Some(gateway_signature.to_string());
        payment.paid_at = Some(at);
        Ok(Some(payment.clone()))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn admin_stats(&self) -> Result<AdminStats> {
        let tables = self.tables.lock().await;
        let total_registrations = tables.registrations.len() as i64;
        let attended_registrations = tables.registrations.values().filter(|r| r.attended).count() as i64;
        let active_clubs: HashSet<Uuid> = tables.members.iter().map(|(club, _)| *club).collect();

        Ok(AdminStats {
            total_students: tables.users.values().filter(|u| u.role != Role::Admin).count() as i64,
            active_clubs: active_clubs.len() as i64,
            total_events: tables.events.len() as i64,
            approved_events: tables
                .events
                .values()
                .filter(|e| e.status == EventStatus::Approved)
                .count() as i64,
            pending_events: tables
                .events
                .values()
                .filter(|e| e.status == EventStatus::Pending)
                .count() as i64,
            pending_requests: tables
                .requests
                .values()
                .filter(|r| r.status == RequestStatus::Pending)
                .count() as i64,
            total_registrations,
            attended_registrations,
            attendance_rate: attendance_rate(attended_registrations, total_registrations),
        })
    }

    async fn event_attendance(&self, event_id: Uuid) -> Result<EventAttendanceSummary> {
        let tables = self.tables.lock().await;
        Ok(EventAttendanceSummary {
            event_id,
            registered: tables
                .registrations
                .values()
                .filter(|r| r.event_id == event_id)
                .count() as i64,
            attended: tables
                .events
                .get(&event_id)
                .map(|e| e.attended_count() as i64)
                .unwrap_or(0),
        })
    }

    async fn student_dashboard(&self, student_id: Uuid, today: NaiveDate) -> Result<StudentDashboard> {
        let tables = self.tables.lock().await;
        let mine: Vec<&Registration> = tables
            .registrations
            .values()
            .filter(|r| r.student_id == student_id)
            .collect();

        Ok(StudentDashboard {
            joined_clubs: tables.members.iter().filter(|(_, user)| *user == student_id).count() as i64,
            total_registrations: mine.len() as i64,
            upcoming_registrations: mine
                .iter()
                .filter(|r| tables.is_upcoming_unattended(r, today))
                .count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use futures::StreamExt;

    fn new_event(club_id: Uuid, date: NaiveDate) -> NewEvent {
        NewEvent {
            club_id,
            created_by: Uuid::new_v4(),
            title: "Robotics night".to_string(),
            description: "Build a line follower".to_string(),
            date,
            time: "18:00".to_string(),
            venue: Some("Lab 2".to_string()),
            visibility: Visibility::OpenToAll,
            is_paid: false,
            price: 0,
            max_participants: 100,
            registration_deadline: None,
            poster: None,
        }
    }

    #[tokio::test]
    async fn test_review_is_conditional_on_pending() {
        let store = MemoryStore::new();
        let event = store
            .insert_event(new_event(Uuid::new_v4(), Utc::now().date_naive()))
            .await
            .unwrap();

        let first = store.review_event(event.id, EventStatus::Rejected).await.unwrap();
        assert_eq!(first.unwrap().status, EventStatus::Rejected);

        let second = store.review_event(event.id, EventStatus::Approved).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let store = MemoryStore::new();
        let registration = NewRegistration {
            event_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            qr_token: "a".repeat(32),
            qr_code: "http://blobs/qr.svg".to_string(),
            capacity: None,
        };

        store.insert_registration(registration.clone()).await.unwrap();
        let again = NewRegistration {
            qr_token: "b".repeat(32),
            ..registration
        };
        assert_matches!(store.insert_registration(again).await, Err(ClubHubError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mark_attended_adds_to_event_set_once() {
        let store = MemoryStore::new();
        let event = store
            .insert_event(new_event(Uuid::new_v4(), Utc::now().date_naive()))
            .await
            .unwrap();
        let registration = store
            .insert_registration(NewRegistration {
                event_id: event.id,
                student_id: Uuid::new_v4(),
                qr_token: "c".repeat(32),
                qr_code: "http://blobs/qr.svg".to_string(),
                capacity: None,
            })
            .await
            .unwrap();

        assert!(store.mark_attended(registration.id, Utc::now()).await.unwrap().is_some());
        assert!(store.mark_attended(registration.id, Utc::now()).await.unwrap().is_none());

        let event = store.find_event(event.id).await.unwrap().unwrap();
        assert_eq!(event.attended, vec![registration.student_id]);
    }

    #[tokio::test]
    async fn test_approved_upcoming_is_date_ordered() {
        let store = MemoryStore::new();
        let club = Uuid::new_v4();
        let today = Utc::now().date_naive();

        let later = store.insert_event(new_event(club, today + chrono::Duration::days(5))).await.unwrap();
        let sooner = store.insert_event(new_event(club, today + chrono::Duration::days(1))).await.unwrap();
        let past = store.insert_event(new_event(club, today - chrono::Duration::days(1))).await.unwrap();
        let pending = store.insert_event(new_event(club, today)).await.unwrap();
        for id in [later.id, sooner.id, past.id] {
            store.review_event(id, EventStatus::Approved).await.unwrap();
        }

        let ids: Vec<Uuid> = store
            .approved_upcoming(today)
            .map(|e| e.unwrap().id)
            .collect()
            .await;
        assert_eq!(ids, vec![sooner.id, later.id]);
        assert!(!ids.contains(&pending.id));
    }
}
