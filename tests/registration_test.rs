//! Registration, QR issuance and attendance scanning

mod helpers;

use assert_matches::assert_matches;
use clubhub::database::{EventStore, RegistrationStore};
use clubhub::models::{EventStatus, ReviewDecision};
use clubhub::services::qr::QrPayload;
use clubhub::services::{QrRenderer, SvgQrRenderer};
use clubhub::ClubHubError;
use futures::future::join_all;
use helpers::*;
use std::time::Duration;

#[tokio::test]
async fn test_free_registration_issues_qr_code() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Robotics").await;
    let student = ctx.create_student("Asha").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Drone demo")).await;

    let registration = ctx
        .services()
        .registration_service
        .register_for_event(&student, event.id)
        .await
        .unwrap();

    assert_eq!(registration.event_id, event.id);
    assert_eq!(registration.student_id, student.user_id);
    assert!(!registration.attended);
    assert_eq!(registration.qr_token.len(), 32);

    let payload = QrPayload::new(event.id, student.user_id, registration.qr_token.clone());
    assert_eq!(registration.qr_code, format!("memory://blobs/{}", payload.blob_key()));
    let (svg, content_type) = ctx.blobs.get(&payload.blob_key()).expect("stored QR image");
    assert_eq!(content_type, "image/svg+xml");
    assert!(String::from_utf8(svg).unwrap().contains("<svg"));

    let upcoming = ctx
        .services()
        .registration_service
        .registered_upcoming(&student)
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].title, "Drone demo");
}

#[tokio::test]
async fn test_registration_preconditions() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Drama").await;
    let student = ctx.create_student("Ravi").await;
    let service = &ctx.services().registration_service;

    let pending = ctx.create_event(&leader, TestEvent::new("Rehearsal")).await;
    assert_matches!(
        service.register_for_event(&student, pending.id).await,
        Err(ClubHubError::NotFound { .. })
    );

    let paid = ctx.approved_event(&leader, TestEvent::new("Gala").paid(25000)).await;
    assert_matches!(
        service.register_for_event(&student, paid.id).await,
        Err(ClubHubError::PaymentRequired { event_id }) if event_id == paid.id
    );

    // the paid gate holds whatever the review state
    let paid_pending = ctx.create_event(&leader, TestEvent::new("Gala preview").paid(25000)).await;
    assert_eq!(paid_pending.status, EventStatus::Pending);
    assert_matches!(
        service.register_for_event(&student, paid_pending.id).await,
        Err(ClubHubError::PaymentRequired { event_id }) if event_id == paid_pending.id
    );
    let paid_rejected = ctx.create_event(&leader, TestEvent::new("Gala encore").paid(25000)).await;
    ctx.services()
        .event_service
        .review_event(&ctx.admin, paid_rejected.id, ReviewDecision::Rejected)
        .await
        .unwrap();
    assert_matches!(
        service.register_for_event(&student, paid_rejected.id).await,
        Err(ClubHubError::PaymentRequired { .. })
    );

    let members_only = ctx.approved_event(&leader, TestEvent::new("Script reading").club_only()).await;
    assert_matches!(
        service.register_for_event(&student, members_only.id).await,
        Err(ClubHubError::Authorization(_))
    );

    let closed = ctx
        .approved_event(
            &leader,
            TestEvent::new("Auditions")
                .on(days_from_today(2))
                .deadline(days_from_today(-1)),
        )
        .await;
    assert_matches!(
        service.register_for_event(&student, closed.id).await,
        Err(ClubHubError::Validation(_))
    );

    assert_matches!(
        service.register_for_event(&leader, members_only.id).await,
        Err(ClubHubError::Authorization(_))
    );
    assert_matches!(
        service.register_for_event(&student, uuid::Uuid::new_v4()).await,
        Err(ClubHubError::NotFound { .. })
    );
}

#[tokio::test]
async fn test_capacity_and_duplicates() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Chess").await;
    let first = ctx.create_student("Meera").await;
    let second = ctx.create_student("Kiran").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Simul").capacity(1)).await;
    let service = &ctx.services().registration_service;

    service.register_for_event(&first, event.id).await.unwrap();
    assert_matches!(
        service.register_for_event(&first, event.id).await,
        Err(ClubHubError::Conflict(_))
    );
    assert_matches!(
        service.register_for_event(&second, event.id).await,
        Err(ClubHubError::Conflict(_))
    );
}

#[tokio::test]
async fn test_concurrent_registrations_create_exactly_one() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Coding").await;
    let student = ctx.create_student("Dev").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Hack night")).await;
    let service = &ctx.services().registration_service;

    let attempts = (0..10).map(|_| service.register_for_event(&student, event.id));
    let results = join_all(attempts).await;

    let created: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(created.len(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(ClubHubError::Conflict(_)));
    }

    assert_eq!(ctx.store.count_for_event(event.id).await.unwrap(), 1);
    // images issued by the losing attempts were cleaned up
    assert_eq!(ctx.blobs.len(), 1);
    let winner = QrPayload::new(event.id, student.user_id, created[0].qr_token.clone());
    assert!(ctx.blobs.get(&winner.blob_key()).is_some());
}

#[tokio::test]
async fn test_failed_qr_upload_leaves_no_registration() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Film").await;
    let student = ctx.create_student("Nila").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Noir night")).await;

    ctx.blobs.set_failing(true);
    let result = ctx
        .services()
        .registration_service
        .register_for_event(&student, event.id)
        .await;
    assert_matches!(result, Err(ClubHubError::Upstream { .. }));
    assert!(ctx.store.find_registration(event.id, student.user_id).await.unwrap().is_none());

    ctx.blobs.set_failing(false);
    assert!(ctx
        .services()
        .registration_service
        .register_for_event(&student, event.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_scan_marks_attendance_once() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Astronomy").await;
    let student = ctx.create_student("Isha").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Meteor shower")).await;
    let service = &ctx.services().registration_service;

    let registration = service.register_for_event(&student, event.id).await.unwrap();
    let scanned = ctx.qr_text(&registration);

    let receipt = service.mark_attendance(&leader, &scanned).await.unwrap();
    assert_eq!(receipt.registration_id, registration.id);
    assert_eq!(receipt.student_id, student.user_id);
    assert_eq!(receipt.event_title, "Meteor shower");

    assert_matches!(
        service.mark_attendance(&leader, &scanned).await,
        Err(ClubHubError::AlreadyMarked)
    );

    let event = ctx.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(event.attended, vec![student.user_id]);
    assert_eq!(event.attended_count(), 1);

    let attendees = service.list_attendees(&leader, event.id).await.unwrap();
    assert_eq!(attendees.len(), 1);
    assert!(attendees[0].attended);

    let history = service.attended_history(&student).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].attended);
    assert!(service.registered_upcoming(&student).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_scans_mark_once() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Quiz").await;
    let student = ctx.create_student("Tara").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Finals")).await;
    let service = &ctx.services().registration_service;

    let registration = service.register_for_event(&student, event.id).await.unwrap();
    let scanned = ctx.qr_text(&registration);

    let results = join_all((0..5).map(|_| service.mark_attendance(&leader, &scanned))).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(ClubHubError::AlreadyMarked))));

    let event = ctx.store.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(event.attended.len(), 1);
}

#[tokio::test]
async fn test_scan_rejections() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Music").await;
    let (_, other_leader) = ctx.create_club_with_leader("Dance").await;
    let student = ctx.create_student("Arjun").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Open stage")).await;
    let service = &ctx.services().registration_service;

    let registration = service.register_for_event(&student, event.id).await.unwrap();

    assert_matches!(
        service.mark_attendance(&leader, "not a qr code").await,
        Err(ClubHubError::MalformedQr(_))
    );

    let forged = QrPayload::new(event.id, student.user_id, "0".repeat(32)).encode();
    assert_matches!(service.mark_attendance(&leader, &forged).await, Err(ClubHubError::InvalidQr));

    let someone_else = QrPayload::new(event.id, uuid::Uuid::new_v4(), registration.qr_token.clone()).encode();
    assert_matches!(
        service.mark_attendance(&leader, &someone_else).await,
        Err(ClubHubError::InvalidQr)
    );

    let scanned = ctx.qr_text(&registration);
    assert_matches!(
        service.mark_attendance(&other_leader, &scanned).await,
        Err(ClubHubError::Authorization(_))
    );
    assert_matches!(
        service.list_attendees(&other_leader, event.id).await,
        Err(ClubHubError::Authorization(_))
    );

    // none of the rejected scans counted
    let event = ctx.store.find_event(event.id).await.unwrap().unwrap();
    assert!(event.attended.is_empty());
}

#[tokio::test]
async fn test_rendered_qr_text_decodes_to_stored_registration() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Photography").await;
    let student = ctx.create_student("Lena").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Night walk")).await;

    let registration = ctx
        .services()
        .registration_service
        .register_for_event(&student, event.id)
        .await
        .unwrap();

    let rendered = ctx.renderer.rendered();
    assert_eq!(rendered.len(), 1);
    let decoded = QrPayload::decode(&rendered[0]).unwrap();
    assert_eq!(
        (decoded.event_id, decoded.student_id, decoded.token),
        (registration.event_id, registration.student_id, registration.qr_token.clone())
    );

    // the image stored at the registration's URL is the one drawn from that text
    let key = registration.qr_code.trim_start_matches("memory://blobs/");
    let (svg, _) = ctx.blobs.get(key).expect("stored QR image");
    let redrawn = SvgQrRenderer::default().render(&rendered[0]).unwrap();
    assert_eq!(svg, redrawn);

    let receipt = ctx
        .services()
        .registration_service
        .mark_attendance(&leader, &rendered[0])
        .await
        .unwrap();
    assert_eq!(receipt.registration_id, registration.id);
}

#[tokio::test]
async fn test_listings_are_ordered() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Hiking").await;
    let student = ctx.create_student("Noor").await;
    let service = &ctx.services().registration_service;

    let later = ctx.approved_event(&leader, TestEvent::new("Later").on(days_from_today(9))).await;
    let past = ctx.approved_event(&leader, TestEvent::new("Past").on(days_from_today(-3))).await;
    let sooner = ctx.approved_event(&leader, TestEvent::new("Sooner").on(days_from_today(2))).await;

    let mut registrations = Vec::new();
    for event in [&later, &past, &sooner] {
        registrations.push(service.register_for_event(&student, event.id).await.unwrap());
    }

    let upcoming: Vec<_> = service
        .registered_upcoming(&student)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(upcoming, vec!["Sooner", "Later"]);

    // scan order: Sooner, Later, Past
    for index in [2, 0, 1] {
        service
            .mark_attendance(&leader, &ctx.qr_text(&registrations[index]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let history: Vec<_> = service
        .attended_history(&student)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(history, vec!["Past", "Later", "Sooner"]);
    assert!(service.registered_upcoming(&student).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_registrations_respect_capacity() {
    let ctx = TestContext::new().await;
    let (_, leader) = ctx.create_club_with_leader("Pottery").await;
    let event = ctx.approved_event(&leader, TestEvent::new("Wheel class").capacity(3)).await;
    let service = &ctx.services().registration_service;

    let mut students = Vec::new();
    for i in 0..8 {
        students.push(ctx.create_student(&format!("Potter {}", i)).await);
    }

    let results = join_all(students.iter().map(|student| service.register_for_event(student, event.id))).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(ClubHubError::Conflict(message)) if message == "event is full");
    }
    assert_eq!(ctx.store.count_for_event(event.id).await.unwrap(), 3);
    // images of the refused attempts were removed
    assert_eq!(ctx.blobs.len(), 3);
}
