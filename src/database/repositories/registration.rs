//! Registration repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::connection::conflict_on_unique;
use crate::database::store::RegistrationStore;
use crate::models::registration::{NewRegistration, RegisteredEvent, Registration};
use crate::utils::errors::{ClubHubError, Result};

macro_rules! registration_columns {
    () => {
        "id, event_id, student_id, qr_token, qr_code, registered_at, attended, attended_at"
    };
}

macro_rules! registered_event_select {
    () => {
        r#"
        SELECT r.id AS registration_id, e.id AS event_id, e.club_id, e.title, e.date, e.time, e.venue,
               e.poster, r.qr_code, r.registered_at, r.attended, r.attended_at
        FROM registrations r
        JOIN events e ON e.id = r.event_id
        "#
    };
}

#[derive(Clone, Debug)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for RegistrationRepository {
    async fn insert_registration(&self, registration: NewRegistration) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        // Serialises registrations per event so the count below stays exact
        sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(registration.event_id)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query_as::<_, Registration>(concat!(
            r#"
            INSERT INTO registrations (id, event_id, student_id, qr_token, qr_code, registered_at)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE $7::INT4 IS NULL
               OR (SELECT COUNT(*) FROM registrations WHERE event_id = $2) < $7::INT4
            RETURNING "#,
            registration_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(registration.event_id)
        .bind(registration.student_id)
        .bind(registration.qr_token)
        .bind(registration.qr_code)
        .bind(Utc::now())
        .bind(registration.capacity)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "already registered for this event"))?
        .ok_or_else(|| ClubHubError::Conflict("event is full".to_string()))?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_registration(&self, event_id: Uuid, student_id: Uuid) -> Result<Option<Registration>> {
        let registration = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE event_id = $1 AND student_id = $2"
        ))
        .bind(event_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    async fn find_by_qr(&self, event_id: Uuid, student_id: Uuid, qr_token: &str) -> Result<Option<Registration>> {
        let registration = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE event_id = $1 AND student_id = $2 AND qr_token = $3"
        ))
        .bind(event_id)
        .bind(student_id)
        .bind(qr_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    async fn count_for_event(&self, event_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn registered_event_ids(&self, student_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT event_id FROM registrations WHERE student_id = $1")
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn mark_attended(&self, registration_id: Uuid, at: DateTime<Utc>) -> Result<Option<Registration>> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query_as::<_, Registration>(concat!(
            r#"
            UPDATE registrations
            SET attended = TRUE, attended_at = $2
            WHERE id = $1 AND attended = FALSE
            RETURNING "#,
            registration_columns!()
        ))
        .bind(registration_id)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(registration) = &marked {
            sqlx::query(
                r#"
                UPDATE events
                SET attended = array_append(attended, $2)
                WHERE id = $1 AND NOT ($2 = ANY(attended))
                "#,
            )
            .bind(registration.event_id)
            .bind(registration.student_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(marked)
    }

    async fn registered_upcoming(&self, student_id: Uuid, today: NaiveDate) -> Result<Vec<RegisteredEvent>> {
        let events = sqlx::query_as::<_, RegisteredEvent>(concat!(
            registered_event_select!(),
            " WHERE r.student_id = $1 AND e.date >= $2 AND NOT r.attended ORDER BY e.date ASC, r.registered_at ASC"
        ))
        .bind(student_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn attended_history(&self, student_id: Uuid) -> Result<Vec<RegisteredEvent>> {
        let events = sqlx::query_as::<_, RegisteredEvent>(concat!(
            registered_event_select!(),
            " WHERE r.student_id = $1 AND r.attended ORDER BY r.attended_at DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn attendees(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE event_id = $1 AND attended ORDER BY attended_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }
}
