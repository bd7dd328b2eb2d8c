use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use httpmock::prelude::*;
use ride_api::{build_app, ApiConfig};
use ride_core::{Dictionary, Language, Translator};
use ride_notify::TelegramConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

const SEND_MESSAGE_PATH: &str = "/bot42:TEST/sendMessage";

fn offline_app() -> Router {
    build_app(ApiConfig::default()).expect("app should build")
}

fn app_with_telegram(server: &MockServer) -> Router {
    let telegram = TelegramConfig::new(&server.base_url(), "42:TEST", "-1001", Language::En)
        .expect("telegram config should be valid");
    build_app(ApiConfig {
        telegram: Some(telegram),
        ..ApiConfig::default()
    })
    .expect("app should build")
}

fn complete_draft() -> Value {
    json!({
        "from": "Bishkek",
        "to": "Almaty",
        "date": "2026-11-02",
        "time": "09:30",
        "passengerCount": 2,
        "vehicleCategory": "minivan",
        "fullName": "Aibek Toktogulov",
        "phone": "+996 555 123 456",
        "notes": ""
    })
}

fn post_booking(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/bookings")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_missing_telegram_configuration() {
    let response = offline_app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|value| value.to_str().ok()),
        Some("nosniff")
    );
    assert!(response.headers().contains_key("x-request-id"));

    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["telegram_configured"], false);
    assert_eq!(parsed["metrics"]["submissions_total"], 0);
}

#[tokio::test]
async fn popular_routes_are_localized() {
    let response = offline_app()
        .oneshot(get("/v1/routes?popular=true&lang=en"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    let routes = parsed["routes"].as_array().unwrap();
    assert_eq!(routes.len(), 4);
    assert!(routes.iter().all(|route| route["popular"] == true));
    assert_eq!(routes[0]["id"], "bishkek-almaty");
    assert_eq!(routes[0]["name"], "Bishkek - Almaty");
    assert_eq!(routes[0]["duration"], "Duration: 3.5h");
}

#[tokio::test]
async fn vehicles_list_every_category_with_capacity() {
    let response = offline_app().oneshot(get("/v1/vehicles")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["language"], "ru");
    let vehicles = parsed["vehicles"].as_array().unwrap();
    assert_eq!(vehicles.len(), 5);
    let sprinter = vehicles
        .iter()
        .find(|vehicle| vehicle["category"] == "sprinter")
        .unwrap();
    assert_eq!(sprinter["capacity"], 18);
}

#[tokio::test]
async fn dictionary_lookup_by_language() {
    let app = offline_app();

    let known = app.clone().oneshot(get("/v1/i18n/kg")).await.unwrap();
    assert_eq!(known.status(), StatusCode::OK);
    let parsed = json_body(known).await;
    assert_eq!(parsed["language"], "kg");
    assert!(parsed["entries"]["booking.title"].is_string());

    let unknown = app.oneshot(get("/v1/i18n/fr")).await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(unknown).await["error"], "unknown_language");
}

#[tokio::test]
async fn incomplete_draft_is_rejected_with_missing_fields() {
    let response = offline_app()
        .oneshot(post_booking(json!({
            "draft": { "from": "Bishkek", "to": "Osh" },
            "language": "en"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let parsed = json_body(response).await;
    assert_eq!(parsed["error"], "validation_failed");
    assert_eq!(parsed["step"], "journey");
    assert_eq!(parsed["missing"], json!(["date", "time"]));
}

#[tokio::test]
async fn booking_without_credentials_is_unavailable() {
    let response = offline_app()
        .oneshot(post_booking(json!({ "draft": complete_draft() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let parsed = json_body(response).await;
    assert_eq!(parsed["error"], "delivery_unavailable");
    assert_eq!(
        parsed["message"],
        Dictionary::new(Language::Ru).text("errors.delivery_unavailable")
    );
}

#[tokio::test]
async fn unavailable_message_follows_the_request_language() {
    let response = offline_app()
        .oneshot(post_booking(json!({ "draft": complete_draft(), "language": "kg" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await["message"],
        Dictionary::new(Language::Kg).text("errors.delivery_unavailable")
    );
}

#[tokio::test]
async fn booking_is_delivered_to_the_operator_chat() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SEND_MESSAGE_PATH)
                .json_body_partial(r#"{"chat_id":"-1001","parse_mode":"Markdown"}"#)
                .body_contains("Aibek Toktogulov");
            then.status(200)
                .json_body(json!({ "ok": true, "result": { "message_id": 7 } }));
        })
        .await;

    let reference = uuid::Uuid::new_v4();
    let response = app_with_telegram(&server)
        .oneshot(post_booking(json!({
            "draft": complete_draft(),
            "language": "en",
            "reference": reference
        })))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert_eq!(parsed["success"], true);
    assert!(!parsed["message"].as_str().unwrap().is_empty());
    assert_eq!(parsed["reference"], reference.to_string());
}

#[tokio::test]
async fn passenger_count_is_clamped_before_delivery() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SEND_MESSAGE_PATH)
                .body_contains("*Passengers:* 4");
            then.status(200).json_body(json!({ "ok": true }));
        })
        .await;

    let mut draft = complete_draft();
    draft["vehicleCategory"] = json!("sedan");
    draft["passengerCount"] = json!(25);

    let response = app_with_telegram(&server)
        .oneshot(post_booking(json!({ "draft": draft })))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn lenient_passenger_counts_are_clamped_to_the_category() {
    for (requested, expected) in [(json!(300), 7), (json!(-1), 1), (json!("3"), 3)] {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(SEND_MESSAGE_PATH)
                    .body_contains(format!("*Passengers:* {expected}"));
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await;

        let mut draft = complete_draft();
        draft["passengerCount"] = requested.clone();

        let response = app_with_telegram(&server)
            .oneshot(post_booking(json!({ "draft": draft })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "passengerCount {requested}");
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn malformed_booking_body_gets_a_json_error() {
    let mut draft = complete_draft();
    draft["passengerCount"] = json!("many");

    let response = offline_app()
        .oneshot(post_booking(json!({ "draft": draft })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let parsed = json_body(response).await;
    assert_eq!(parsed["error"], "invalid_request");
    assert!(parsed["message"].as_str().unwrap().contains("many"));
}

#[tokio::test]
async fn telegram_failure_maps_to_bad_gateway() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_MESSAGE_PATH);
            then.status(500)
                .json_body(json!({ "ok": false, "description": "Internal Server Error" }));
        })
        .await;

    let app = app_with_telegram(&server);
    let response = app
        .clone()
        .oneshot(post_booking(json!({ "draft": complete_draft(), "language": "ru" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let parsed = json_body(response).await;
    assert_eq!(parsed["success"], false);
    assert!(!parsed["message"].as_str().unwrap().is_empty());
    assert!(!parsed["message"]
        .as_str()
        .unwrap()
        .contains("Internal Server Error"));

    let health = json_body(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["metrics"]["failed_total"], 1);
}

#[tokio::test]
async fn bookings_are_rate_limited_per_client() {
    let app = build_app(ApiConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 1,
        ..ApiConfig::default()
    })
    .unwrap();

    let booking = || {
        let mut request = post_booking(json!({ "draft": complete_draft() }));
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
        request
            .headers_mut()
            .insert("accept-language", "en-US,en;q=0.9".parse().unwrap());
        request
    };

    let first = app.clone().oneshot(booking()).await.unwrap();
    assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);

    let second = app.clone().oneshot(booking()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let parsed = json_body(second).await;
    assert_eq!(parsed["error"], "rate_limited");
    assert_eq!(
        parsed["message"],
        Dictionary::new(Language::En).text("errors.rate_limited")
    );

    let catalog = app.oneshot(get("/v1/routes")).await.unwrap();
    assert_eq!(catalog.status(), StatusCode::OK);
}
