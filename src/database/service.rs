//! Database service layer
//!
//! Bundles the Postgres repositories behind the storage traits.

use std::sync::Arc;

use crate::database::store::Stores;
use crate::database::{
    ClubRepository, DatabasePool, EventRepository, PaymentRepository, RegistrationRepository,
    ReportRepository, UserRepository,
};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub clubs: ClubRepository,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
    pub payments: PaymentRepository,
    pub reports: ReportRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            clubs: ClubRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            reports: ReportRepository::new(pool.clone()),
            pool,
        }
    }

    /// Trait-object handles for the services
    pub fn stores(&self) -> Stores {
        Stores {
            users: Arc::new(self.users.clone()),
            clubs: Arc::new(self.clubs.clone()),
            events: Arc::new(self.events.clone()),
            registrations: Arc::new(self.registrations.clone()),
            payments: Arc::new(self.payments.clone()),
            reports: Arc::new(self.reports.clone()),
        }
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        crate::database::health_check(&self.pool).await
    }
}
