//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod blob;
pub mod clubs;
pub mod events;
pub mod gateway;
pub mod payments;
pub mod qr;
pub mod registration;
pub mod reports;
pub mod users;

// Re-export commonly used services
pub use auth::{AuthService, Identity};
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use clubs::ClubService;
pub use events::{EventService, PosterUpload};
pub use gateway::{GatewayOrder, MockPaymentGateway, PaymentGateway, RazorpayGateway, SignatureVerifier};
pub use payments::PaymentService;
pub use qr::{QrIssuer, QrPayload, QrRenderer, SvgQrRenderer};
pub use registration::RegistrationService;
pub use reports::ReportService;
pub use users::UserService;

use std::sync::Arc;

use serde::Serialize;

use crate::config::settings::Settings;
use crate::database::{DatabaseService, Stores};

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub club_service: ClubService,
    pub event_service: EventService,
    pub registration_service: RegistrationService,
    pub payment_service: PaymentService,
    pub report_service: ReportService,
    pub user_service: UserService,
    database: Option<DatabaseService>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        settings: &Settings,
        stores: Stores,
        blobs: Arc<dyn BlobStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self::with_renderer(settings, stores, blobs, gateway, Arc::new(SvgQrRenderer::default()))
    }

    /// Same as [`ServiceFactory::new`] with a caller-supplied QR renderer
    pub fn with_renderer(
        settings: &Settings,
        stores: Stores,
        blobs: Arc<dyn BlobStore>,
        gateway: Arc<dyn PaymentGateway>,
        renderer: Arc<dyn QrRenderer>,
    ) -> Self {
        let qr = QrIssuer::new(renderer, blobs.clone());
        let registration_service = RegistrationService::new(stores.clone(), qr);
        let payment_service = PaymentService::new(
            stores.clone(),
            gateway,
            SignatureVerifier::new(&settings.payments.key_secret),
            registration_service.clone(),
            settings.payments.key_id.clone(),
            settings.payments.currency.clone(),
        );

        Self {
            auth_service: AuthService::new(&settings.auth),
            club_service: ClubService::new(stores.clone()),
            event_service: EventService::new(stores.clone(), blobs),
            registration_service,
            payment_service,
            user_service: UserService::new(stores.users.clone()),
            report_service: ReportService::new(stores),
            database: None,
        }
    }

    /// Services backed by Postgres; the health check pings the pool
    pub fn with_database(
        settings: &Settings,
        database: DatabaseService,
        blobs: Arc<dyn BlobStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let mut factory = Self::new(settings, database.stores(), blobs, gateway);
        factory.database = Some(database);
        factory
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = match &self.database {
            Some(database) => match database.health_check().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(error = %e, "Database health check failed");
                    false
                }
            },
            None => true,
        };

        ServiceHealthStatus { database_healthy }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }

        issues
    }
}
