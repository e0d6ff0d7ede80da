//! Event repository implementation

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::store::EventStore;
use crate::models::event::{Event, EventStatus, NewEvent};
use crate::utils::errors::{ClubHubError, Result};

macro_rules! event_columns {
    () => {
        "id, club_id, created_by, title, description, date, time, venue, visibility, status, \
         is_paid, price, max_participants, registration_deadline, poster, attended, created_at, updated_at"
    };
}

#[derive(Clone, Debug)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    /// Create a new event in `pending` state
    async fn insert_event(&self, event: NewEvent) -> Result<Event> {
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(concat!(
            r#"
            INSERT INTO events (id, club_id, created_by, title, description, date, time, venue, visibility,
                                status, is_paid, price, max_participants, registration_deadline, poster,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11, $12, $13, $14, $15, $16)
            RETURNING "#,
            event_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(event.club_id)
        .bind(event.created_by)
        .bind(event.title)
        .bind(event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(event.venue)
        .bind(event.visibility)
        .bind(event.is_paid)
        .bind(event.price)
        .bind(event.max_participants)
        .bind(event.registration_deadline)
        .bind(event.poster)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(concat!("SELECT ", event_columns!(), " FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    async fn review_event(&self, id: Uuid, status: EventStatus) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(concat!(
            r#"
            UPDATE events
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING "#,
            event_columns!()
        ))
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn pending_events(&self) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE status = 'pending' ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get events for club
    async fn club_events(&self, club_id: Uuid) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE club_id = $1 ORDER BY created_at DESC"
        ))
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    fn approved_upcoming(&self, today: NaiveDate) -> BoxStream<'_, Result<Event>> {
        sqlx::query_as::<_, Event>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE status = 'approved' AND date >= $1 ORDER BY date ASC, created_at ASC"
        ))
        .bind(today)
        .fetch(&self.pool)
        .map_err(ClubHubError::from)
        .boxed()
    }
}
