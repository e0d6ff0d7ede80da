//! Test context for unified test setup
//!
//! Wires the real services to in-memory storage, an in-memory blob store and
//! the mock payment gateway, and seeds the users every scenario needs.

use std::sync::{Arc, Mutex};

use axum::Router;
use clubhub::config::Settings;
use clubhub::database::{MemoryStore, UserStore};
use clubhub::models::*;
use clubhub::services::qr::QrPayload;
use clubhub::services::{
    Identity, MemoryBlobStore, MockPaymentGateway, QrRenderer, ServiceFactory, SignatureVerifier, SvgQrRenderer,
};
use clubhub::utils::errors::Result;
use clubhub::{router, AppState};
use uuid::Uuid;

use super::test_data::TestEvent;

/// SVG renderer that remembers every payload it was asked to draw
#[derive(Default)]
pub struct RecordingRenderer {
    inner: SvgQrRenderer,
    rendered: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

impl QrRenderer for RecordingRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>> {
        self.rendered.lock().unwrap().push(payload.to_string());
        self.inner.render(payload)
    }
}

pub struct TestContext {
    pub settings: Settings,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub renderer: Arc<RecordingRenderer>,
    pub state: AppState,
    pub admin: Identity,
}

impl TestContext {
    pub async fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut settings = Settings::default();
        settings.auth.jwt_secret = "test-jwt-secret".to_string();
        settings.payments.key_id = "rzp_test_key".to_string();
        settings.payments.key_secret = "test-key-secret".to_string();

        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let renderer = Arc::new(RecordingRenderer::default());

        let services = ServiceFactory::with_renderer(
            &settings,
            store.stores(),
            blobs.clone(),
            gateway.clone(),
            renderer.clone(),
        );
        let state = AppState::new(services);

        let admin_user = store
            .insert_user(CreateUserRequest {
                name: "Campus Admin".to_string(),
                email: format!("admin-{}@campus.test", Uuid::new_v4().simple()),
                role: Role::Admin,
            })
            .await
            .expect("Failed to seed admin");

        Self {
            settings,
            store,
            blobs,
            gateway,
            renderer,
            state,
            admin: Identity::new(admin_user.id, Role::Admin, None),
        }
    }

    pub fn services(&self) -> &ServiceFactory {
        &self.state.services
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), None)
    }

    pub fn token_for(&self, identity: &Identity) -> String {
        self.services()
            .auth_service
            .issue_token(identity)
            .expect("Failed to issue token")
    }

    pub async fn create_student(&self, name: &str) -> Identity {
        let user = self
            .store
            .insert_user(CreateUserRequest {
                name: name.to_string(),
                email: format!("{}-{}@campus.test", name.to_lowercase().replace(' ', "."), Uuid::new_v4().simple()),
                role: Role::Student,
            })
            .await
            .expect("Failed to seed student");
        Identity::new(user.id, Role::Student, None)
    }

    /// Admin-created club with a freshly promoted leader
    pub async fn create_club_with_leader(&self, name: &str) -> (Club, Identity) {
        let club = self
            .services()
            .club_service
            .create_club(
                &self.admin,
                CreateClubRequest {
                    name: name.to_string(),
                    description: format!("The {} club", name),
                },
            )
            .await
            .expect("Failed to create club");

        let student = self.create_student(&format!("{} Lead", name)).await;
        let club = self
            .services()
            .club_service
            .assign_leader(&self.admin, club.id, student.user_id)
            .await
            .expect("Failed to assign leader");

        let leader = Identity::new(student.user_id, Role::Leader, Some(club.id));
        (club, leader)
    }

    /// Join request submitted by `student` and approved by `leader`
    pub async fn join_club(&self, club_id: Uuid, leader: &Identity, student: &Identity) {
        let request = self
            .services()
            .club_service
            .request_join(
                student,
                club_id,
                JoinClubRequest {
                    reason: Some("I would like to take part".to_string()),
                },
            )
            .await
            .expect("Failed to request membership");

        self.services()
            .club_service
            .review_request(
                leader,
                request.id,
                ReviewMembershipRequest {
                    action: RequestDecision::Approve,
                    rejection_reason: None,
                },
            )
            .await
            .expect("Failed to approve membership");
    }

    pub async fn create_event(&self, leader: &Identity, event: TestEvent) -> Event {
        self.services()
            .event_service
            .create_event(leader, event.build(), None)
            .await
            .expect("Failed to create event")
    }

    /// Created by `leader` and approved by the admin
    pub async fn approved_event(&self, leader: &Identity, event: TestEvent) -> Event {
        let event = self.create_event(leader, event).await;
        self.services()
            .event_service
            .review_event(&self.admin, event.id, ReviewDecision::Approved)
            .await
            .expect("Failed to approve event")
    }

    /// Text a scanner reads off the registration's QR image: the exact
    /// payload that was handed to the renderer for it
    pub fn qr_text(&self, registration: &Registration) -> String {
        self.renderer
            .rendered()
            .into_iter()
            .find(|text| {
                QrPayload::decode(text)
                    .map(|payload| payload.token == registration.qr_token)
                    .unwrap_or(false)
            })
            .expect("No QR image was rendered for this registration")
    }

    /// Signature the gateway would attach to a successful checkout
    pub fn gateway_signature(&self, order_id: &str, payment_id: &str) -> String {
        SignatureVerifier::new(&self.settings.payments.key_secret).sign(order_id, payment_id)
    }
}
