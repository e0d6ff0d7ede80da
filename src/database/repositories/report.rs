//! Reporting queries
//!
//! Every count here is derived from the authoritative rows at query time.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::{attendance_rate, ReportStore};
use crate::models::report::{AdminStats, EventAttendanceSummary, StudentDashboard};
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn admin_stats(&self) -> Result<AdminStats> {
        let (total_students, active_clubs, total_events, approved_events, pending_events, pending_requests, total_registrations, attended_registrations): (i64, i64, i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users WHERE role <> 'admin'),
                    (SELECT COUNT(DISTINCT club_id) FROM club_members),
                    (SELECT COUNT(*) FROM events),
                    (SELECT COUNT(*) FROM events WHERE status = 'approved'),
                    (SELECT COUNT(*) FROM events WHERE status = 'pending'),
                    (SELECT COUNT(*) FROM membership_requests WHERE status = 'pending'),
                    (SELECT COUNT(*) FROM registrations),
                    (SELECT COUNT(*) FROM registrations WHERE attended)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminStats {
            total_students,
            active_clubs,
            total_events,
            approved_events,
            pending_events,
            pending_requests,
            total_registrations,
            attended_registrations,
            attendance_rate: attendance_rate(attended_registrations, total_registrations),
        })
    }

    async fn event_attendance(&self, event_id: Uuid) -> Result<EventAttendanceSummary> {
        let (registered, attended): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM registrations WHERE event_id = $1),
                COALESCE((SELECT cardinality(attended)::BIGINT FROM events WHERE id = $1), 0)
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(EventAttendanceSummary {
            event_id,
            registered,
            attended,
        })
    }

    async fn student_dashboard(&self, student_id: Uuid, today: NaiveDate) -> Result<StudentDashboard> {
        let (joined_clubs, total_registrations, upcoming_registrations): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM club_members WHERE user_id = $1),
                (SELECT COUNT(*) FROM registrations WHERE student_id = $1),
                (SELECT COUNT(*) FROM registrations r JOIN events e ON e.id = r.event_id
                 WHERE r.student_id = $1 AND e.date >= $2 AND NOT r.attended)
            "#,
        )
        .bind(student_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(StudentDashboard {
            joined_clubs,
            total_registrations,
            upcoming_registrations,
        })
    }
}
