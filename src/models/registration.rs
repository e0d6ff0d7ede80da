//! Registration model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub student_id: Uuid,
    #[serde(skip_serializing)]
    pub qr_token: String,
    pub qr_code: String,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
    pub attended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub event_id: Uuid,
    pub student_id: Uuid,
    pub qr_token: String,
    pub qr_code: String,
    /// Refuse the insert once the event already holds this many registrations
    pub capacity: Option<i32>,
}

/// Registration joined with the event it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegisteredEvent {
    pub registration_id: Uuid,
    pub event_id: Uuid,
    pub club_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: Option<String>,
    pub poster: Option<String>,
    pub qr_code: String,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
    pub attended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendanceRequest {
    pub qr_data: String,
}

/// What the scanning leader sees after a successful scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceReceipt {
    pub registration_id: Uuid,
    pub student_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub attended_at: DateTime<Utc>,
}
