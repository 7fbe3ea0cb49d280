//! Tests for the notification handlers.

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{TimeZone, Utc};
use pagination::Page;
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::{Notification, NotificationCategory, NotificationContent};
use crate::inbound::http::test_utils::{TestState, bearer, caller, json_body};

const NOTIFICATION: &str = "5d1c2a7e-8f3b-4b6a-9c0d-1e2f3a4b5c6d";

fn delivered() -> Notification {
    let content = NotificationContent::new(
        NotificationCategory::WeatherWarning,
        "Storm warning",
        "Gusts of 70mph expected after 6pm",
        None,
    )
    .expect("content");
    let now = Utc
        .with_ymd_and_hms(2026, 5, 1, 18, 0, 0)
        .single()
        .expect("timestamp");
    Notification::deliver(caller().user_id, &content, now)
}

async fn send(state: TestState, request: actix_test::TestRequest) -> (StatusCode, Value) {
    let app = actix_test::init_service(
        App::new().app_data(state.into_data()).service(
            web::scope("/api")
                .service(list)
                .service(mark_read)
                .service(remove)
                .service(broadcast)
                .service(show_less),
        ),
    )
    .await;
    let response = actix_test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let body = if status == StatusCode::NO_CONTENT {
        Value::Null
    } else {
        json_body(response).await
    };
    (status, body)
}

#[rstest]
#[actix_web::test]
async fn list_renders_the_callers_page() {
    let mut state = TestState::default();
    state
        .notifications
        .expect_list()
        .withf(|user, page| *user == caller().user_id && page.limit() == 10)
        .times(1)
        .returning(|_, _| Ok(Page::new(vec![delivered()], 10, None)));

    let (status, body) = send(
        state,
        actix_test::TestRequest::get()
            .uri("/api/notifications?limit=10")
            .insert_header(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["data"][0]["type"], "Weather Warning");
    assert_eq!(body["data"][0]["isRead"], false);
    assert_eq!(body["data"][0]["createdAt"], "2026-05-01T18:00:00.000Z");
    assert!(body.get("nextCursor").is_none());
}

#[rstest]
#[actix_web::test]
async fn zero_limit_is_rejected() {
    let (status, body) = send(
        TestState::default(),
        actix_test::TestRequest::get()
            .uri("/api/notifications?limit=0")
            .insert_header(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "limit");
}

#[rstest]
#[actix_web::test]
async fn list_requires_a_token() {
    let (status, _) = send(
        TestState::default(),
        actix_test::TestRequest::get().uri("/api/notifications"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn mark_read_returns_the_updated_notification() {
    let mut state = TestState::default();
    state
        .notifications
        .expect_mark_read()
        .withf(|user, id| *user == caller().user_id && id.to_string() == NOTIFICATION)
        .times(1)
        .returning(|_, _| {
            let mut notification = delivered();
            notification.mark_read();
            Ok(notification)
        });

    let (status, body) = send(
        state,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/notifications/{NOTIFICATION}/read"))
            .insert_header(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRead"], true);
}

#[rstest]
#[actix_web::test]
async fn another_users_notification_is_forbidden() {
    let mut state = TestState::default();
    state
        .notifications
        .expect_mark_read()
        .returning(|_, _| Err(Error::forbidden("notification belongs to another user")));

    let (status, body) = send(
        state,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/notifications/{NOTIFICATION}/read"))
            .insert_header(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[rstest]
#[actix_web::test]
async fn delete_returns_no_content() {
    let mut state = TestState::default();
    state
        .notifications
        .expect_delete()
        .times(1)
        .returning(|_, _| Ok(()));

    let (status, _) = send(
        state,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/notifications/{NOTIFICATION}"))
            .insert_header(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[rstest]
#[actix_web::test]
async fn broadcast_reports_every_delivery() {
    let mut state = TestState::default();
    state
        .notifications
        .expect_broadcast()
        .withf(|content| content.category() == NotificationCategory::WeatherWarning)
        .times(1)
        .returning(|_| Ok(vec![delivered(), delivered()]));

    let (status, body) = send(
        state,
        actix_test::TestRequest::post()
            .uri("/api/notifications/broadcast")
            .insert_header(bearer())
            .set_json(json!({
                "type": "Weather Warning",
                "title": "Storm warning",
                "message": "Gusts of 70mph expected after 6pm",
            })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["delivered"], 2);
    assert_eq!(body["notifications"].as_array().map(Vec::len), Some(2));
}

#[rstest]
#[case::unknown_type(json!({"type": "Newsletter", "title": "t", "message": "m"}), "type")]
#[case::blank_title(json!({"type": "Scam Alert", "title": "  ", "message": "m"}), "title")]
#[case::blank_message(json!({"type": "Scam Alert", "title": "t", "message": ""}), "message")]
#[case::bad_alert_id(
    json!({"type": "Scam Alert", "title": "t", "message": "m", "alertId": "nope"}),
    "alertId"
)]
#[actix_web::test]
async fn broadcast_validates_content(#[case] payload: Value, #[case] field: &str) {
    let (status, body) = send(
        TestState::default(),
        actix_test::TestRequest::post()
            .uri("/api/notifications/broadcast")
            .insert_header(bearer())
            .set_json(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], field);
}

#[rstest]
#[actix_web::test]
async fn show_less_marks_the_notification() {
    let mut state = TestState::default();
    state
        .notifications
        .expect_show_less()
        .withf(|_, id| id.to_string() == NOTIFICATION)
        .times(1)
        .returning(|_, _| {
            let mut notification = delivered();
            notification.mark_show_less();
            Ok(notification)
        });

    let (status, body) = send(
        state,
        actix_test::TestRequest::post()
            .uri("/api/notifications/show-less")
            .insert_header(bearer())
            .set_json(json!({"notificationId": NOTIFICATION})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["showLess"], true);
}

#[rstest]
#[actix_web::test]
async fn show_less_rejects_a_malformed_id() {
    let (status, body) = send(
        TestState::default(),
        actix_test::TestRequest::post()
            .uri("/api/notifications/show-less")
            .insert_header(bearer())
            .set_json(json!({"notificationId": "123"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "invalid_uuid");
}
