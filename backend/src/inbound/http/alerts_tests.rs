//! Tests for the alert handlers.

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{App, test as actix_test, web};
use chrono::{TimeZone, Utc};
use pagination::Page;
use rstest::rstest;
use serde_json::Value;

use super::*;
use crate::domain::{
    Alert, AlertId, AlertRecord, DisplayName, FeedItem, FeedSort, GeoPoint, IncidentCategory,
    ModerationStatus,
};
use crate::inbound::http::test_utils::{TestState, bearer, caller, json_body};

const BOUNDARY: &str = "alertline-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn sample_item() -> FeedItem {
    let created_at = Utc
        .with_ymd_and_hms(2026, 5, 1, 8, 0, 0)
        .single()
        .expect("timestamp");
    let alert = Alert::from(AlertRecord {
        id: AlertId::random(),
        owner: caller().user_id,
        category: IncidentCategory::Scam,
        other_description: None,
        location: "Waverley Station".to_owned(),
        point: GeoPoint::new(-3.19, 55.95).expect("point"),
        description: "Fake ticket sellers at the north entrance".to_owned(),
        images: vec!["/uploads/abc.png".to_owned()],
        status: ModerationStatus::Verified,
        like_count: 2,
        flag_count: 0,
        share_count: 1,
        created_at,
    });
    FeedItem {
        alert,
        owner_name: Some(DisplayName::new("Ada").expect("name")),
        distance_km: None,
    }
}

fn valid_parts<'a>() -> Vec<Part<'a>> {
    vec![
        Part::Text("incidentType", "Scam"),
        Part::Text("location", "Waverley Station"),
        Part::Text("description", "Fake ticket sellers at the north entrance"),
        Part::Text("coordinates", "[-3.19, 55.95]"),
        Part::File {
            name: "images",
            file_name: "evidence.png",
            content_type: "image/png",
            bytes: b"\x89PNG\r\n",
        },
    ]
}

async fn post_multipart(state: TestState, parts: &[Part<'_>], authorised: bool) -> (StatusCode, Value) {
    let app = actix_test::init_service(
        App::new()
            .app_data(state.into_data())
            .service(web::scope("/api").service(post_alert).service(feed)),
    )
    .await;
    let mut request = actix_test::TestRequest::post()
        .uri("/api/alerts")
        .insert_header((
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(parts));
    if authorised {
        request = request.insert_header(bearer());
    }
    let response = actix_test::call_service(&app, request.to_request()).await;
    let status = response.status();
    (status, json_body(response).await)
}

#[rstest]
#[actix_web::test]
async fn posting_an_alert_returns_201_with_the_alert() {
    let mut state = TestState::default();
    state
        .alerts
        .expect_post_alert()
        .withf(|owner, submission, images| {
            *owner == caller().user_id
                && submission.incident_type.as_deref() == Some("Scam")
                && submission.longitude == -3.19
                && submission.latitude == 55.95
                && images.len() == 1
        })
        .times(1)
        .returning(|_, _, _| Ok(sample_item()));

    let (status, body) = post_multipart(state, &valid_parts(), true).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Alert posted successfully");
    assert_eq!(body["alert"]["incidentType"], "Scam");
    assert_eq!(body["alert"]["coordinates"]["type"], "Point");
    assert_eq!(body["alert"]["ownerName"], "Ada");
    assert!(body["alert"].get("ownerId").is_none());
}

#[rstest]
#[actix_web::test]
async fn posting_requires_a_bearer_token() {
    let (status, _) = post_multipart(TestState::default(), &valid_parts(), false).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn missing_coordinates_are_rejected() {
    let parts = vec![
        Part::Text("incidentType", "Scam"),
        Part::Text("location", "Waverley Station"),
        Part::Text("description", "Fake ticket sellers at the north entrance"),
    ];

    let (status, body) = post_multipart(TestState::default(), &parts, true).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "coordinates");
}

#[rstest]
#[actix_web::test]
async fn mismatched_image_type_is_rejected_before_the_service() {
    let mut parts = valid_parts();
    parts.pop();
    parts.push(Part::File {
        name: "images",
        file_name: "evidence.png",
        content_type: "application/pdf",
        bytes: b"%PDF",
    });

    let (status, body) = post_multipart(TestState::default(), &parts, true).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "unsupported_image");
}

#[rstest]
#[actix_web::test]
async fn a_sixth_image_is_rejected() {
    let mut parts = valid_parts();
    for _ in 0..5 {
        parts.push(Part::File {
            name: "images",
            file_name: "more.jpg",
            content_type: "image/jpeg",
            bytes: b"\xff\xd8\xff",
        });
    }

    let (status, body) = post_multipart(TestState::default(), &parts, true).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "too_many_images");
}

#[rstest]
#[actix_web::test]
async fn feed_forwards_parsed_filters_and_renders_the_page() {
    let mut state = TestState::default();
    state
        .feed
        .expect_feed()
        .withf(|query| {
            query.sort() == FeedSort::MostReported
                && query.categories() == [IncidentCategory::Theft]
                && query.page().limit() == 5
        })
        .times(1)
        .returning(|_| {
            Ok(Page::new(
                vec![sample_item()],
                5,
                Some("next-token".to_owned()),
            ))
        });
    let app = actix_test::init_service(
        App::new()
            .app_data(state.into_data())
            .service(web::scope("/api").service(feed)),
    )
    .await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/alerts/feed?alertTypes=Theft&sortBy=Most%20Reported&limit=5")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["limit"], 5);
    assert_eq!(body["nextCursor"], "next-token");
    assert_eq!(body["data"][0]["likesCount"], 2);
    assert_eq!(body["data"][0]["createdAt"], "2026-05-01T08:00:00.000Z");
}

#[rstest]
#[actix_web::test]
async fn feed_rejects_unknown_sort_without_calling_the_service() {
    let app = actix_test::init_service(
        App::new()
            .app_data(TestState::default().into_data())
            .service(web::scope("/api").service(feed)),
    )
    .await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/alerts/feed?sortBy=Loudest")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"]["field"], "sortBy");
}

#[rstest]
fn user_ids_are_not_part_of_the_rendered_alert() {
    let rendered = serde_json::to_value(AlertResponse::from(sample_item())).expect("json");

    assert!(!rendered.to_string().contains(&caller().user_id.to_string()));
}
