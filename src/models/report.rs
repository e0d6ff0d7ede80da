//! Reporting projections

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_students: i64,
    pub active_clubs: i64,
    pub total_events: i64,
    pub approved_events: i64,
    pub pending_events: i64,
    pub pending_requests: i64,
    pub total_registrations: i64,
    pub attended_registrations: i64,
    /// Whole percent of registrations that were attended
    pub attendance_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttendanceSummary {
    pub event_id: Uuid,
    pub registered: i64,
    pub attended: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentDashboard {
    pub joined_clubs: i64,
    pub total_registrations: i64,
    pub upcoming_registrations: i64,
}
