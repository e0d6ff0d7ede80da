//! HTTP surface: routing, authentication and error mapping

mod helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use clubhub::services::Identity;
use helpers::*;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "clubhub-test-boundary";

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// multipart/form-data body with text fields and an optional poster file
fn event_form(fields: &[(&str, &str)], poster: Option<&[u8]>) -> Body {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = poster {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"poster\"; filename=\"poster.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn multipart_request(uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

struct Actors {
    leader: Identity,
    student: Identity,
    admin_token: String,
    leader_token: String,
    student_token: String,
}

async fn actors(ctx: &TestContext) -> Actors {
    let (_, leader) = ctx.create_club_with_leader("Robotics").await;
    let student = ctx.create_student("Asha").await;
    Actors {
        admin_token: ctx.token_for(&ctx.admin),
        leader_token: ctx.token_for(&leader),
        student_token: ctx.token_for(&student),
        leader,
        student,
    }
}

#[tokio::test]
async fn test_health_reports_ok() {
    let ctx = TestContext::new().await;
    let (status, body) = send(&ctx.router(), request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], json!(true));
    assert_eq!(body["issues"], json!([]));
}

#[tokio::test]
async fn test_requests_need_a_valid_token() {
    let ctx = TestContext::new().await;
    let app = ctx.router();

    let (status, body) = send(&app, request("GET", "/api/events/upcoming", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = send(&app, request("GET", "/api/events/upcoming", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let other_issuer = {
        let mut settings = ctx.settings.clone();
        settings.auth.jwt_secret = "someone-else".to_string();
        clubhub::services::AuthService::new(&settings.auth)
            .issue_token(&ctx.admin)
            .unwrap()
    };
    let (status, _) = send(&app, request("GET", "/api/admin/stats", Some(&other_issuer), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let ctx = TestContext::new().await;
    let app = ctx.router();
    let who = actors(&ctx).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/clubs",
            Some(&who.student_token),
            Some(json!({ "name": "Chess", "description": "Weekly games" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/clubs",
            Some(&who.admin_token),
            Some(json!({ "name": "Chess", "description": "Weekly games" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Chess");

    let (status, _) = send(&app, request("GET", "/api/admin/stats", Some(&who.leader_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_event_to_attendance_over_http() {
    let ctx = TestContext::new().await;
    let app = ctx.router();
    let who = actors(&ctx).await;
    let date = days_from_today(7).to_string();

    let form = event_form(
        &[
            ("title", "Drone demo"),
            ("description", "Flying things in the quad"),
            ("date", &date),
            ("time", "17:30"),
            ("venue", "Quad"),
            ("visibility", "open-to-all"),
            ("max_participants", "40"),
        ],
        Some(b"\x89PNG"),
    );
    let (status, event) = send(&app, multipart_request("/api/events", &who.leader_token, form)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["status"], "pending");
    assert_eq!(event["max_participants"], 40);
    assert!(event["poster"].as_str().unwrap().starts_with("memory://blobs/posters/"));
    let event_id = event["id"].as_str().unwrap().to_string();

    let (status, reviewed) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/events/{}/review", event_id),
            Some(&who.admin_token),
            Some(json!({ "action": "approved" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    let (status, upcoming) = send(&app, request("GET", "/api/events/upcoming", Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upcoming.as_array().unwrap().len(), 1);

    let (status, registration) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{}/register", event_id),
            Some(&who.student_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(registration.get("qr_token").is_none());
    assert!(registration["qr_code"].as_str().unwrap().ends_with(".svg"));

    let stored = ctx
        .services()
        .registration_service
        .registered_upcoming(&who.student)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    let registration_row = {
        use clubhub::database::RegistrationStore;
        ctx.store
            .find_registration(stored[0].event_id, who.student.user_id)
            .await
            .unwrap()
            .unwrap()
    };
    let qr_data = ctx.qr_text(&registration_row);

    let (status, receipt) = send(
        &app,
        request(
            "POST",
            "/api/events/attendance",
            Some(&who.leader_token),
            Some(json!({ "qr_data": qr_data })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["student_id"], json!(who.student.user_id));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/events/attendance",
            Some(&who.leader_token),
            Some(json!({ "qr_data": qr_data })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_MARKED");

    let (status, attendees) = send(
        &app,
        request(
            "GET",
            &format!("/api/events/{}/attendees", event_id),
            Some(&who.leader_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendees.as_array().unwrap().len(), 1);

    let (status, dashboard) = send(&app, request("GET", "/api/students/dashboard", Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_registrations"], 1);
    assert_eq!(dashboard["upcoming_registrations"], 0);

    let (status, summary) = send(
        &app,
        request(
            "GET",
            &format!("/api/admin/events/{}/attendance", event_id),
            Some(&who.admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["attended"], 1);
}

#[tokio::test]
async fn test_error_codes_over_http() {
    let ctx = TestContext::new().await;
    let app = ctx.router();
    let who = actors(&ctx).await;
    let paid = ctx
        .approved_event(&who.leader, TestEvent::new("Gala dinner").paid(50000))
        .await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/api/events/{}/register", paid.id),
            Some(&who.student_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "PAYMENT_REQUIRED");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/events/attendance",
            Some(&who.leader_token),
            Some(json!({ "qr_data": "clubhub:v1:nope" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_QR");

    let (status, body) = send(
        &app,
        request(
            "GET",
            &format!("/api/events/{}/register", paid.id),
            Some(&who.student_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, Value::Null);

    let form = event_form(&[("title", "Bad"), ("visibility", "public")], None);
    let (status, body) = send(&app, multipart_request("/api/events", &who.leader_token, form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_paid_checkout_over_http() {
    let ctx = TestContext::new().await;
    let app = ctx.router();
    let who = actors(&ctx).await;
    let paid = ctx
        .approved_event(&who.leader, TestEvent::new("Gala dinner").paid(50000))
        .await;

    let (status, summary) = send(
        &app,
        request(
            "GET",
            &format!("/api/payments/checkout/{}", paid.id),
            Some(&who.student_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["price"], 50000);

    let (status, order) = send(
        &app,
        request(
            "POST",
            "/api/payments/orders",
            Some(&who.student_token),
            Some(json!({ "event_id": paid.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["order_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/payments/verify",
            Some(&who.student_token),
            Some(json!({
                "event_id": paid.id,
                "gateway_order_id": order_id,
                "gateway_payment_id": "pay_http",
                "gateway_signature": "00",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_VERIFICATION_FAILED");

    let (status, outcome) = send(
        &app,
        request(
            "POST",
            "/api/payments/verify",
            Some(&who.student_token),
            Some(json!({
                "event_id": paid.id,
                "gateway_order_id": order_id,
                "gateway_payment_id": "pay_http",
                "gateway_signature": ctx.gateway_signature(&order_id, "pay_http"),
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["already_verified"], false);

    let (status, registered) = send(&app, request("GET", "/api/events/registered", Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered[0]["event_id"], json!(paid.id));
}

#[tokio::test]
async fn test_membership_over_http() {
    let ctx = TestContext::new().await;
    let app = ctx.router();
    let who = actors(&ctx).await;
    let club_id = who.leader.club_id.unwrap();

    let (status, request_body) = send(
        &app,
        request(
            "POST",
            &format!("/api/clubs/{}/join", club_id),
            Some(&who.student_token),
            Some(json!({ "reason": "I build robots at home" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request_body["id"].as_str().unwrap().to_string();

    let (status, pending) = send(&app, request("GET", "/api/clubs/requests", Some(&who.leader_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, reviewed) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/clubs/requests/{}/review", request_id),
            Some(&who.leader_token),
            Some(json!({ "action": "approve" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    let (status, clubs) = send(&app, request("GET", "/api/clubs/browse", Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clubs[0]["is_member"], true);
    assert_eq!(clubs[0]["member_count"], 2);
}

#[tokio::test]
async fn test_blocked_accounts_over_http() {
    let ctx = TestContext::new().await;
    let app = ctx.router();
    let who = actors(&ctx).await;

    let (status, body) = send(&app, request("GET", "/api/admin/users", Some(&who.admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|user| user["role"] != "admin"));

    let toggle = format!("/api/admin/users/{}/toggle-active", who.student.user_id);
    let (status, _) = send(&app, request("PATCH", &toggle, Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request("PATCH", &toggle, Some(&who.admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], json!(false));

    // a token issued before the block no longer gets through
    let (status, body) = send(&app, request("GET", "/api/events/upcoming", Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(&app, request("PATCH", &toggle, Some(&who.admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], json!(true));
    let (status, _) = send(&app, request("GET", "/api/events/upcoming", Some(&who.student_token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let ghost = ctx.token_for(&Identity::new(uuid::Uuid::new_v4(), clubhub::models::Role::Student, None));
    let (status, _) = send(&app, request("GET", "/api/events/upcoming", Some(&ghost), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
