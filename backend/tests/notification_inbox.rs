//! Broadcast fan-out and per-recipient inbox handling over the HTTP API.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use serde_json::{Value, json};

mod support;

use support::{Harness, bearer, json_body};

async fn send<S>(app: &S, request: actix_test::TestRequest, token: &str) -> (StatusCode, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let response =
        actix_test::call_service(app, request.insert_header(bearer(token)).to_request()).await;
    let status = response.status();
    (status, json_body(response).await)
}

async fn sign_up<S>(app: &S, email: &str) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let request = actix_test::TestRequest::post()
        .uri("/api/signup")
        .set_json(json!({ "email": email, "password": "Harbour2026" }))
        .to_request();
    let body = json_body(actix_test::call_service(app, request).await).await;
    body["token"].as_str().expect("token").to_owned()
}

#[actix_rt::test]
async fn broadcast_reaches_every_account_and_each_inbox_is_private() {
    let harness = Harness::new();
    let app = harness.app().await;
    let grace = sign_up(&app, "grace@example.com").await;
    let alan = sign_up(&app, "alan@example.com").await;

    let (status, body) = send(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/notifications/broadcast")
            .set_json(json!({
                "type": "Weather Warning",
                "title": "Storm warning",
                "message": "Gusts of 70mph expected after 6pm",
            })),
        &grace,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["delivered"], json!(2));

    let (status, inbox) = send(
        &app,
        actix_test::TestRequest::get().uri("/api/notifications"),
        &alan,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = inbox["data"].as_array().expect("data");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], json!("Weather Warning"));
    assert_eq!(items[0]["isRead"], json!(false));
    let alans = items[0]["id"].as_str().expect("id").to_owned();

    let (status, _) = send(
        &app,
        actix_test::TestRequest::patch().uri(&format!("/api/notifications/{alans}/read")),
        &grace,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, read) = send(
        &app,
        actix_test::TestRequest::patch().uri(&format!("/api/notifications/{alans}/read")),
        &alan,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["isRead"], json!(true));

    let (status, quieter) = send(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/notifications/show-less")
            .set_json(json!({ "notificationId": alans })),
        &alan,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quieter["showLess"], json!(true));

    let (status, _) = send(
        &app,
        actix_test::TestRequest::delete().uri(&format!("/api/notifications/{alans}")),
        &alan,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, inbox) = send(
        &app,
        actix_test::TestRequest::get().uri("/api/notifications"),
        &alan,
    )
    .await;
    assert_eq!(inbox["data"], json!([]));

    let (_, inbox) = send(
        &app,
        actix_test::TestRequest::get().uri("/api/notifications"),
        &grace,
    )
    .await;
    assert_eq!(inbox["data"].as_array().map(Vec::len), Some(1));
}

#[actix_rt::test]
async fn inbox_pages_newest_first() {
    let harness = Harness::new();
    let app = harness.app().await;
    let token = sign_up(&app, "ada@example.com").await;

    for title in ["First", "Second", "Third"] {
        send(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/notifications/broadcast")
                .set_json(json!({ "type": "Scam Alert", "title": title, "message": "Details inside" })),
            &token,
        )
        .await;
        harness.clock.advance_seconds(60);
    }

    let (_, page) = send(
        &app,
        actix_test::TestRequest::get().uri("/api/notifications?limit=2"),
        &token,
    )
    .await;
    let titles: Vec<&str> = page["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|item| item["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Third", "Second"]);

    let cursor = page["nextCursor"].as_str().expect("cursor");
    let (_, rest) = send(
        &app,
        actix_test::TestRequest::get().uri(&format!("/api/notifications?limit=2&cursor={cursor}")),
        &token,
    )
    .await;
    assert_eq!(rest["data"][0]["title"], json!("First"));
    assert!(rest.get("nextCursor").is_none());
}

#[actix_rt::test]
async fn broadcast_linked_to_an_unknown_alert_is_not_found() {
    let harness = Harness::new();
    let app = harness.app().await;
    let grace = sign_up(&app, "grace@example.com").await;

    let (status, body) = send(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/notifications/broadcast")
            .set_json(json!({
                "type": "Scam Alert",
                "title": "Ticket scam",
                "message": "Fake sellers outside the stadium",
                "alertId": "6f1c2d4e-0b7a-4c55-9a0e-3f2b1d9c8e71",
            })),
        &grace,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("not_found"));

    let (_, inbox) = send(
        &app,
        actix_test::TestRequest::get().uri("/api/notifications"),
        &grace,
    )
    .await;
    assert_eq!(inbox["data"], json!([]));
}
