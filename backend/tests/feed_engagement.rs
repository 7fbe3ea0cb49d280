//! Posting, browsing and engaging with alerts over the HTTP API.

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::test as actix_test;
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::{Value, json};

use alertline::domain::ports::{EngagementCommand, TokenService};
use alertline::domain::{
    Alert, AlertId, AlertRecord, DisplayName, EmailAddress, EngagementService, GeoPoint,
    IncidentCategory, ModerationStatus, UserId,
};
use futures::future::join_all;

mod support;

use support::{Harness, bearer, json_body};

const BOUNDARY: &str = "feed-engagement-boundary";

fn token_for(harness: &Harness, user_id: UserId) -> String {
    let email = EmailAddress::new(format!("{user_id}@example.com")).expect("email");
    harness
        .tokens
        .issue(&user_id, &email, harness.clock.utc())
        .expect("token")
}

fn seed(
    harness: &Harness,
    category: IncidentCategory,
    hours_ago: i64,
    status: ModerationStatus,
) -> AlertId {
    let id = AlertId::random();
    harness.alerts.seed(Alert::from(AlertRecord {
        id,
        owner: UserId::random(),
        category,
        other_description: None,
        location: "Leith Walk".to_owned(),
        point: GeoPoint::new(-3.17, 55.96).expect("point"),
        description: "Seeded alert used to exercise the feed".to_owned(),
        images: Vec::new(),
        status,
        like_count: 0,
        flag_count: 0,
        share_count: 0,
        created_at: harness.clock.utc() - TimeDelta::hours(hours_ago),
    }));
    id
}

fn multipart_alert() -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [
        ("incidentType", "Theft"),
        ("location", "Princes Street"),
        ("description", "Bike stolen from the rack outside the gallery"),
        ("coordinates", "[-3.20, 55.95]"),
    ] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"rack.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"\x89PNG\r\n\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn get_json<S>(app: &S, uri: &str) -> (StatusCode, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let response =
        actix_test::call_service(app, actix_test::TestRequest::get().uri(uri).to_request()).await;
    let status = response.status();
    (status, json_body(response).await)
}

async fn act<S>(app: &S, alert: AlertId, action: &str, token: &str) -> (StatusCode, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/alertActions/alerts/{alert}/{action}"))
        .insert_header(bearer(token))
        .to_request();
    let response = actix_test::call_service(app, request).await;
    let status = response.status();
    (status, json_body(response).await)
}

fn ids(feed: &Value) -> Vec<String> {
    feed["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

#[actix_rt::test]
async fn posted_alert_is_stored_and_heads_the_feed() {
    let harness = Harness::new();
    let owner = UserId::random();
    harness
        .alerts
        .set_owner_name(owner, DisplayName::new("Ada").expect("name"));
    let older = seed(&harness, IncidentCategory::Scam, 2, ModerationStatus::Verified);
    let app = harness.app().await;

    let request = actix_test::TestRequest::post()
        .uri("/api/alerts")
        .insert_header(bearer(&token_for(&harness, owner)))
        .insert_header((
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_alert())
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let posted = json_body(response).await;
    assert_eq!(posted["message"], json!("Alert posted successfully"));
    assert_eq!(posted["alert"]["status"], json!("verified"));
    assert_eq!(posted["alert"]["images"], json!(["/uploads/image-1.png"]));
    assert_eq!(harness.images.stored_count(), 1);

    let (status, feed) = get_json(&app, "/api/alerts/feed").await;
    assert_eq!(status, StatusCode::OK);
    let posted_id = posted["alert"]["id"].as_str().expect("id").to_owned();
    assert_eq!(ids(&feed), vec![posted_id, older.to_string()]);
    assert_eq!(feed["data"][0]["ownerName"], json!("Ada"));
    assert!(feed["data"][0].get("owner").is_none());
}

#[actix_rt::test]
async fn feed_orders_and_filters_verified_alerts() {
    let harness = Harness::new();
    let oldest = seed(&harness, IncidentCategory::Scam, 3, ModerationStatus::Verified);
    let middle = seed(&harness, IncidentCategory::Theft, 2, ModerationStatus::Verified);
    let newest = seed(&harness, IncidentCategory::Weather, 1, ModerationStatus::Verified);
    seed(&harness, IncidentCategory::Theft, 1, ModerationStatus::Pending);
    let app = harness.app().await;

    let (_, feed) = get_json(&app, "/api/alerts/feed").await;
    assert_eq!(
        ids(&feed),
        vec![newest.to_string(), middle.to_string(), oldest.to_string()]
    );

    let (_, feed) = get_json(&app, "/api/alerts/feed?sortBy=Oldest%20Alerts").await;
    assert_eq!(
        ids(&feed),
        vec![oldest.to_string(), middle.to_string(), newest.to_string()]
    );

    let (_, feed) = get_json(&app, "/api/alerts/feed?alertTypes=Theft").await;
    assert_eq!(ids(&feed), vec![middle.to_string()]);

    let (_, page) = get_json(&app, "/api/alerts/feed?limit=2").await;
    assert_eq!(ids(&page), vec![newest.to_string(), middle.to_string()]);
    let cursor = page["nextCursor"].as_str().expect("next cursor");
    let (_, rest) = get_json(&app, &format!("/api/alerts/feed?limit=2&cursor={cursor}")).await;
    assert_eq!(ids(&rest), vec![oldest.to_string()]);
}

#[actix_rt::test]
async fn like_toggles_and_share_counts_up() {
    let harness = Harness::new();
    let alert = seed(&harness, IncidentCategory::Crime, 1, ModerationStatus::Verified);
    let token = token_for(&harness, UserId::random());
    let app = harness.app().await;

    let (status, liked) = act(&app, alert, "like", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["liked"], json!(true));
    assert_eq!(liked["likesCount"], json!(1));

    let (_, unliked) = act(&app, alert, "like", &token).await;
    assert_eq!(unliked["liked"], json!(false));
    assert_eq!(unliked["likesCount"], json!(0));

    act(&app, alert, "share", &token).await;
    let (_, shared) = act(&app, alert, "share", &token).await;
    assert_eq!(shared["sharesCount"], json!(2));

    let (_, feed) = get_json(&app, "/api/alerts/feed").await;
    assert_eq!(feed["data"][0]["sharesCount"], json!(2));
    assert_eq!(feed["data"][0]["likesCount"], json!(0));
}

#[actix_rt::test]
async fn enough_flags_send_an_alert_back_to_review() {
    let harness = Harness::new();
    let alert = seed(&harness, IncidentCategory::Other, 1, ModerationStatus::Verified);
    let app = harness.app().await;

    let first = token_for(&harness, UserId::random());
    let (_, flagged) = act(&app, alert, "flag", &first).await;
    assert_eq!(flagged["message"], json!("Alert flagged"));
    let (_, repeat) = act(&app, alert, "flag", &first).await;
    assert_eq!(repeat["message"], json!("Alert already flagged"));
    assert_eq!(repeat["flagsCount"], json!(1));

    let mut last = Value::Null;
    for _ in 0..4 {
        let token = token_for(&harness, UserId::random());
        last = act(&app, alert, "flag", &token).await.1;
    }
    assert_eq!(last["flagsCount"], json!(5));
    assert_eq!(last["status"], json!("pending"));

    let (_, feed) = get_json(&app, "/api/alerts/feed").await;
    assert!(ids(&feed).is_empty());
}

#[actix_rt::test]
async fn actions_on_unknown_alerts_are_not_found() {
    let harness = Harness::new();
    let token = token_for(&harness, UserId::random());
    let app = harness.app().await;

    for action in ["like", "flag", "share"] {
        let (status, body) = act(&app, AlertId::random(), action, &token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{action}");
        assert_eq!(body["code"], json!("not_found"));
    }
}

#[actix_rt::test]
async fn concurrent_shares_each_count_once() {
    let harness = Harness::new();
    let alert = seed(&harness, IncidentCategory::Weather, 1, ModerationStatus::Verified);
    let engagement = EngagementService::new(harness.alerts.clone());

    let results = join_all((0..20).map(|_| engagement.share(alert))).await;

    let mut counts: Vec<u32> = results
        .into_iter()
        .map(|result| result.expect("share"))
        .collect();
    counts.sort_unstable();
    assert_eq!(counts, (1..=20).collect::<Vec<u32>>());
}
