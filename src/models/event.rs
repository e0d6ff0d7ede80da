//! Event model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Default capacity when a leader does not set one
pub const DEFAULT_MAX_PARTICIPANTS: i32 = 100;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Pending => write!(f, "pending"),
            EventStatus::Approved => write!(f, "approved"),
            EventStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    ClubOnly,
    OpenToAll,
}

/// Admin decision on a pending event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for EventStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => EventStatus::Approved,
            ReviewDecision::Rejected => EventStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub club_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: Option<String>,
    pub visibility: Visibility,
    pub status: EventStatus,
    pub is_paid: bool,
    /// Price in minor currency units; only charged when `is_paid`
    pub price: i64,
    pub max_participants: i32,
    pub registration_deadline: Option<NaiveDate>,
    pub poster: Option<String>,
    /// Students marked present; set semantics
    pub attended: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date >= today
    }

    /// Derived from the attended set, never stored separately
    pub fn attended_count(&self) -> usize {
        self.attended.len()
    }

    pub fn registration_closed(&self, today: NaiveDate) -> bool {
        self.registration_deadline
            .map(|deadline| today > deadline)
            .unwrap_or(false)
    }
}

/// Leader input for a new event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub visibility: Option<Visibility>,
    pub is_paid: Option<bool>,
    pub price: Option<i64>,
    pub max_participants: Option<i32>,
    pub registration_deadline: Option<NaiveDate>,
}

/// Validated event row ready for insertion
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub club_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: Option<String>,
    pub visibility: Visibility,
    pub is_paid: bool,
    pub price: i64,
    pub max_participants: i32,
    pub registration_deadline: Option<NaiveDate>,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEventRequest {
    pub action: ReviewDecision,
}
