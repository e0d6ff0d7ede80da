//! Registration and attendance
//!
//! Per (event, student) pair: no registration, then registered, then attended.
//! Registration is create-once, guarded by the store's uniqueness constraint;
//! attendance is a conditional update that succeeds for exactly one scan.

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::database::store::Stores;
use crate::models::*;
use crate::services::auth::Identity;
use crate::services::clubs::ensure_club_leader;
use crate::services::events::ensure_visible;
use crate::services::qr::{QrIssuer, QrPayload};
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::logging::{log_attendance, log_security_rejection};

#[derive(Clone)]
pub struct RegistrationService {
    stores: Stores,
    qr: QrIssuer,
}

impl RegistrationService {
    pub fn new(stores: Stores, qr: QrIssuer) -> Self {
        Self { stores, qr }
    }

    /// Free-event registration
    pub async fn register_for_event(&self, identity: &Identity, event_id: Uuid) -> Result<Registration> {
        identity.require_student()?;

        let event = self
            .stores
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("event", event_id))?;

        if event.is_paid {
            return Err(ClubHubError::PaymentRequired { event_id });
        }
        if event.status != EventStatus::Approved {
            return Err(ClubHubError::not_found("event", event_id));
        }
        ensure_visible(self.stores.clubs.as_ref(), &event, identity.user_id).await?;
        self.ensure_open(&event, Utc::now().date_naive()).await?;

        if self
            .stores
            .registrations
            .find_registration(event_id, identity.user_id)
            .await?
            .is_some()
        {
            return Err(ClubHubError::Conflict("already registered for this event".to_string()));
        }

        let registration = self
            .issue(&event, identity.user_id, Some(event.max_participants))
            .await?;
        info!(event_id = %event_id, student_id = %identity.user_id, registration_id = %registration.id, "Student registered");
        Ok(registration)
    }

    /// `Validation` once the deadline has passed, `Conflict` once the event is full
    pub(crate) async fn ensure_open(&self, event: &Event, today: NaiveDate) -> Result<()> {
        if event.registration_closed(today) {
            return Err(ClubHubError::Validation("registration closed".to_string()));
        }

        let registered = self.stores.registrations.count_for_event(event.id).await?;
        if registered >= i64::from(event.max_participants) {
            return Err(ClubHubError::Conflict("event is full".to_string()));
        }
        Ok(())
    }

    /// Issue a QR code and create the registration. The image is uploaded
    /// first; if the insert fails the image is removed again, so no
    /// registration ever points at a missing image and no image outlives a
    /// failed registration. `capacity` is enforced by the insert itself.
    pub(crate) async fn issue(&self, event: &Event, student_id: Uuid, capacity: Option<i32>) -> Result<Registration> {
        let issued = self.qr.issue(event.id, student_id).await?;

        let inserted = self
            .stores
            .registrations
            .insert_registration(NewRegistration {
                event_id: event.id,
                student_id,
                qr_token: issued.payload.token.clone(),
                qr_code: issued.url.clone(),
                capacity,
            })
            .await;

        match inserted {
            Ok(registration) => Ok(registration),
            Err(e) => {
                self.qr.discard(&issued).await;
                Err(e)
            }
        }
    }

    /// Record attendance from the text scanned off a student's QR code
    pub async fn mark_attendance(&self, identity: &Identity, scanned: &str) -> Result<AttendanceReceipt> {
        let payload = QrPayload::decode(scanned)?;

        let registration = match self
            .stores
            .registrations
            .find_by_qr(payload.event_id, payload.student_id, &payload.token)
            .await?
        {
            Some(registration) => registration,
            None => {
                log_security_rejection(
                    "invalid_qr",
                    identity.user_id,
                    Some(&format!("event {} student {}", payload.event_id, payload.student_id)),
                );
                return Err(ClubHubError::InvalidQr);
            }
        };

        let event = self
            .stores
            .events
            .find_event(registration.event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("event", registration.event_id))?;
        ensure_club_leader(self.stores.clubs.as_ref(), identity, event.club_id).await?;

        if registration.attended {
            return Err(ClubHubError::AlreadyMarked);
        }

        let marked = self
            .stores
            .registrations
            .mark_attended(registration.id, Utc::now())
            .await?
            .ok_or(ClubHubError::AlreadyMarked)?;
        let attended_at = marked.attended_at.ok_or(ClubHubError::AlreadyMarked)?;

        log_attendance(event.id, marked.student_id, identity.user_id);
        Ok(AttendanceReceipt {
            registration_id: marked.id,
            student_id: marked.student_id,
            event_id: event.id,
            event_title: event.title,
            attended_at,
        })
    }

    /// Unattended registrations for events from today on, soonest first
    pub async fn registered_upcoming(&self, identity: &Identity) -> Result<Vec<RegisteredEvent>> {
        identity.require_student()?;
        self.stores
            .registrations
            .registered_upcoming(identity.user_id, Utc::now().date_naive())
            .await
    }

    /// Attended registrations, most recent first
    pub async fn attended_history(&self, identity: &Identity) -> Result<Vec<RegisteredEvent>> {
        identity.require_student()?;
        self.stores.registrations.attended_history(identity.user_id).await
    }

    /// Students marked present at an event of the caller's club
    pub async fn list_attendees(&self, identity: &Identity, event_id: Uuid) -> Result<Vec<Registration>> {
        identity.require_leader()?;

        let event = self
            .stores
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("event", event_id))?;
        ensure_club_leader(self.stores.clubs.as_ref(), identity, event.club_id).await?;

        self.stores.registrations.attendees(event_id).await
    }
}
