//! Event lifecycle
//!
//! Leaders create events in `pending` state, an admin approves or rejects each
//! one exactly once, and students see the approved upcoming events their club
//! memberships entitle them to.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{BoxStream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use crate::database::store::{ClubStore, Stores};
use crate::models::event::{DEFAULT_MAX_PARTICIPANTS, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};
use crate::models::*;
use crate::services::auth::Identity;
use crate::services::blob::BlobStore;
use crate::services::clubs::led_club;
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::helpers::{non_blank, normalize_whitespace, sanitize_filename};
use crate::utils::logging::{log_admin_action, log_event_action, log_upstream_error};

/// Poster image supplied with a new event
#[derive(Debug, Clone)]
pub struct PosterUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// `Authorization` unless the student may see `event`
pub(crate) async fn ensure_visible(clubs: &dyn ClubStore, event: &Event, student_id: Uuid) -> Result<()> {
    if event.visibility == Visibility::OpenToAll || clubs.is_member(event.club_id, student_id).await? {
        return Ok(());
    }
    Err(ClubHubError::Authorization(
        "event is restricted to club members".to_string(),
    ))
}

/// Check leader input and turn it into an insertable row
pub fn validate_new_event(
    request: CreateEventRequest,
    club_id: Uuid,
    created_by: Uuid,
) -> Result<NewEvent> {
    let title = non_blank(request.title)
        .map(|t| normalize_whitespace(&t))
        .ok_or_else(|| ClubHubError::Validation("title is required".to_string()))?;
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ClubHubError::Validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }

    let description = non_blank(request.description)
        .ok_or_else(|| ClubHubError::Validation("description is required".to_string()))?;
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ClubHubError::Validation(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }

    let date = request
        .date
        .ok_or_else(|| ClubHubError::Validation("date is required".to_string()))?;
    let time = non_blank(request.time)
        .ok_or_else(|| ClubHubError::Validation("time is required".to_string()))?;

    let price = request.price.unwrap_or(0);
    if price < 0 {
        return Err(ClubHubError::Validation("price cannot be negative".to_string()));
    }
    let is_paid = price > 0 || request.is_paid.unwrap_or(false);
    if is_paid && price == 0 {
        return Err(ClubHubError::Validation(
            "a paid event needs a price greater than zero".to_string(),
        ));
    }

    let max_participants = request.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
    if max_participants < 1 {
        return Err(ClubHubError::Validation(
            "max participants must be at least 1".to_string(),
        ));
    }

    if let Some(deadline) = request.registration_deadline {
        if deadline > date {
            return Err(ClubHubError::Validation(
                "registration deadline cannot be after the event date".to_string(),
            ));
        }
    }

    Ok(NewEvent {
        club_id,
        created_by,
        title,
        description,
        date,
        time,
        venue: non_blank(request.venue),
        visibility: request.visibility.unwrap_or_default(),
        is_paid,
        price,
        max_participants,
        registration_deadline: request.registration_deadline,
        poster: None,
    })
}

/// What a student may see in the upcoming listing
#[derive(Debug, Default)]
struct Eligibility {
    member_of: HashSet<Uuid>,
    registered: HashSet<Uuid>,
}

impl Eligibility {
    fn admits(&self, event: &Event) -> bool {
        let visible = event.visibility == Visibility::OpenToAll || self.member_of.contains(&event.club_id);
        visible && !self.registered.contains(&event.id)
    }
}

#[derive(Clone)]
pub struct EventService {
    stores: Stores,
    blobs: Arc<dyn BlobStore>,
}

impl EventService {
    pub fn new(stores: Stores, blobs: Arc<dyn BlobStore>) -> Self {
        Self { stores, blobs }
    }

    /// Create a pending event for the caller's club. A poster, when given, is
    /// uploaded first; a failed upload aborts the creation.
    pub async fn create_event(
        &self,
        identity: &Identity,
        request: CreateEventRequest,
        poster: Option<PosterUpload>,
    ) -> Result<Event> {
        let club = led_club(self.stores.clubs.as_ref(), identity).await?;
        let mut new_event = validate_new_event(request, club.id, identity.user_id)?;

        let poster_key = match poster {
            Some(poster) => {
                let key = format!(
                    "posters/{}/{}-{}",
                    club.id,
                    Uuid::new_v4().simple(),
                    sanitize_filename(&poster.filename)
                );
                let url = self
                    .blobs
                    .put(&key, poster.bytes, &poster.content_type)
                    .await
                    .map_err(|e| {
                        log_upstream_error("blob store", &e.to_string(), Some("poster upload"));
                        e
                    })?;
                new_event.poster = Some(url);
                Some(key)
            }
            None => None,
        };

        let event = match self.stores.events.insert_event(new_event).await {
            Ok(event) => event,
            Err(e) => {
                if let Some(key) = poster_key {
                    if let Err(cleanup) = self.blobs.delete(&key).await {
                        warn!(key = %key, error = %cleanup, "Failed to remove poster of an event that was not created");
                    }
                }
                return Err(e);
            }
        };

        log_event_action(event.id, "create", identity.user_id, Some(&event.title));
        Ok(event)
    }

    /// Approve or reject a pending event. Only the first decision sticks.
    pub async fn review_event(&self, identity: &Identity, event_id: Uuid, decision: ReviewDecision) -> Result<Event> {
        identity.require_admin()?;

        let event = self
            .stores
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("event", event_id))?;

        if event.status != EventStatus::Pending {
            return Err(ClubHubError::Conflict(format!(
                "event has already been {}",
                event.status
            )));
        }

        let status = EventStatus::from(decision);
        let reviewed = self
            .stores
            .events
            .review_event(event_id, status)
            .await?
            .ok_or_else(|| ClubHubError::Conflict("event has already been reviewed".to_string()))?;

        log_admin_action(
            identity.user_id,
            "review_event",
            Some(&event_id.to_string()),
            Some(&status.to_string()),
        );
        Ok(reviewed)
    }

    /// Approved events on or after `today` that the student may see and has
    /// not registered for, date ascending. Rows are pulled from storage lazily.
    pub fn eligible_upcoming(&self, student_id: Uuid, today: NaiveDate) -> BoxStream<'_, Result<Event>> {
        Box::pin(async_stream::stream! {
            let eligibility = match self.eligibility(student_id).await {
                Ok(eligibility) => eligibility,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut events = self.stores.events.approved_upcoming(today);
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) if eligibility.admits(&event) => yield Ok(event),
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        })
    }

    /// Collected form of [`EventService::eligible_upcoming`] for a student caller
    pub async fn list_eligible_upcoming(&self, identity: &Identity, today: NaiveDate) -> Result<Vec<Event>> {
        identity.require_student()?;

        let mut events = Vec::new();
        let mut stream = self.eligible_upcoming(identity.user_id, today);
        while let Some(event) = stream.next().await {
            events.push(event?);
        }
        Ok(events)
    }

    pub async fn list_pending_events(&self, identity: &Identity) -> Result<Vec<Event>> {
        identity.require_admin()?;
        self.stores.events.pending_events().await
    }

    pub async fn list_leader_events(&self, identity: &Identity) -> Result<Vec<Event>> {
        let club = led_club(self.stores.clubs.as_ref(), identity).await?;
        self.stores.events.club_events(club.id).await
    }

    async fn eligibility(&self, student_id: Uuid) -> Result<Eligibility> {
        Ok(Eligibility {
            member_of: self
                .stores
                .clubs
                .member_club_ids(student_id)
                .await?
                .into_iter()
                .collect(),
            registered: self
                .stores
                .registrations
                .registered_event_ids(student_id)
                .await?
                .into_iter()
                .collect(),
        })
    }
}
