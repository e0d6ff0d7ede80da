//! Shared application state
//!
//! Handed to every HTTP handler. Holds no per-request mutable data; all
//! coordination between requests goes through the storage layer.

use std::sync::Arc;

use crate::services::ServiceFactory;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceFactory>,
}

impl AppState {
    pub fn new(services: ServiceFactory) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}
