//! Test data builders

use chrono::{Duration, NaiveDate, Utc};
use clubhub::models::{CreateEventRequest, Visibility};

/// Date `days` from today; negative values go into the past
pub fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

/// Builder for leader input, defaulting to a free open-to-all event two weeks out
#[derive(Debug, Clone)]
pub struct TestEvent {
    request: CreateEventRequest,
}

impl TestEvent {
    pub fn new(title: &str) -> Self {
        Self {
            request: CreateEventRequest {
                title: Some(title.to_string()),
                description: Some(format!("{} for the whole campus", title)),
                date: Some(days_from_today(14)),
                time: Some("18:00".to_string()),
                venue: Some("Main auditorium".to_string()),
                visibility: Some(Visibility::OpenToAll),
                is_paid: Some(false),
                price: None,
                max_participants: None,
                registration_deadline: None,
            },
        }
    }

    pub fn club_only(mut self) -> Self {
        self.request.visibility = Some(Visibility::ClubOnly);
        self
    }

    /// Paid event; `price` is in minor units
    pub fn paid(mut self, price: i64) -> Self {
        self.request.is_paid = Some(true);
        self.request.price = Some(price);
        self
    }

    pub fn capacity(mut self, max_participants: i32) -> Self {
        self.request.max_participants = Some(max_participants);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.request.date = Some(date);
        self
    }

    pub fn deadline(mut self, deadline: NaiveDate) -> Self {
        self.request.registration_deadline = Some(deadline);
        self
    }

    pub fn without_title(mut self) -> Self {
        self.request.title = None;
        self
    }

    pub fn build(self) -> CreateEventRequest {
        self.request
    }
}
