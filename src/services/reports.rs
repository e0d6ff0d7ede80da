//! Read-only reporting

use chrono::Utc;
use uuid::Uuid;

use crate::database::store::Stores;
use crate::models::{AdminStats, EventAttendanceSummary, StudentDashboard};
use crate::services::auth::Identity;
use crate::utils::errors::{ClubHubError, Result};

#[derive(Clone)]
pub struct ReportService {
    stores: Stores,
}

impl ReportService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn admin_stats(&self, identity: &Identity) -> Result<AdminStats> {
        identity.require_admin()?;
        self.stores.reports.admin_stats().await
    }

    pub async fn event_attendance(&self, identity: &Identity, event_id: Uuid) -> Result<EventAttendanceSummary> {
        identity.require_admin()?;
        self.stores
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("event", event_id))?;

        self.stores.reports.event_attendance(event_id).await
    }

    pub async fn student_dashboard(&self, identity: &Identity) -> Result<StudentDashboard> {
        identity.require_student()?;
        self.stores
            .reports
            .student_dashboard(identity.user_id, Utc::now().date_naive())
            .await
    }
}
