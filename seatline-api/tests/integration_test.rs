use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Duration;
use seatline_api::{app, metrics::Metrics, AppState};
use seatline_core::ManualClock;
use seatline_reservation::{EngineConfig, ReservationEngine};
use seatline_store::InMemoryShowRepository;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

fn test_app() -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let engine = ReservationEngine::new(
        Arc::new(InMemoryShowRepository::with_clock(clock.clone())),
        clock.clone(),
        EngineConfig::default(),
    );
    let metrics = Metrics::new().unwrap();
    let router = app(AppState::new(Arc::new(engine), Arc::new(metrics)));
    TestApp { router, clock }
}

async fn send_raw(router: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty)).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = send_raw(router, method, uri, body.map(|b| b.to_string())).await;
    let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text).unwrap() };
    (status, value)
}

async fn create_show(router: &Router, name: &str, total_seats: i64) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/shows",
        Some(json!({ "name": name, "totalSeats": total_seats })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_list_shows() {
    let t = test_app();
    let (status, body) = send(
        &t.router,
        "POST",
        "/api/shows",
        Some(json!({ "name": "Opening Night", "totalSeats": 120 })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Opening Night");
    assert_eq!(body["totalSeats"], 120);
    assert_eq!(body["bookedSeats"], json!([]));
    assert_eq!(body["heldSeats"], json!([]));
    assert!(body["createdAt"].is_string());

    let (status, shows) = send(&t.router, "GET", "/api/shows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shows.as_array().unwrap().len(), 1);
    assert_eq!(shows[0]["id"], body["id"]);
}

#[tokio::test]
async fn test_create_show_rejects_bad_input() {
    let t = test_app();
    for payload in [
        json!({ "totalSeats": 10 }),
        json!({ "name": "No Seats" }),
        json!({ "name": "Zero", "totalSeats": 0 }),
        json!({ "name": "Negative", "totalSeats": -4 }),
        json!({ "name": "", "totalSeats": 4 }),
    ] {
        let (status, body) = send(&t.router, "POST", "/api/shows", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let (status, _) = send_raw(&t.router, "POST", "/api/shows", Some("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hold_book_scenario() {
    let t = test_app();
    let id = create_show(&t.router, "Matinee", 3).await;

    let (status, hold) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [1, 2], "holdDurationMinutes": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hold["success"], true);
    assert_eq!(hold["heldSeats"], json!([1, 2]));
    assert_eq!(hold["showId"], id.as_str());
    assert!(hold["expiresAt"].is_string());

    let (status, view) = send(&t.router, "GET", &format!("/api/shows/{id}/availability"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["showName"], "Matinee");
    assert_eq!(view["totalSeats"], 3);
    assert_eq!(view["availableSeats"], 1);
    assert_eq!(view["heldSeats"], 2);
    assert_eq!(view["bookedSeats"], 0);
    assert_eq!(view["bookedSeatNumbers"], json!([]));
    assert_eq!(view["heldSeatNumbers"], json!([1, 2]));

    let (status, booking) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/book"),
        Some(json!({ "seatNumbers": [1, 2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["success"], true);
    assert_eq!(booking["bookedSeats"], json!([1, 2]));
    assert!(booking["bookingId"].as_str().unwrap().starts_with("booking_"));

    let (_, view) = send(&t.router, "GET", &format!("/api/shows/{id}/availability"), None).await;
    assert_eq!(view["bookedSeatNumbers"], json!([1, 2]));
    assert_eq!(view["availableSeats"], 1);
    assert_eq!(view["heldSeats"], 0);
}

#[tokio::test]
async fn test_zero_minute_hold_is_released() {
    let t = test_app();
    let id = create_show(&t.router, "Late Show", 2).await;

    let (status, _) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [1], "holdDurationMinutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    t.clock.advance(Duration::seconds(1));

    let (_, view) = send(&t.router, "GET", &format!("/api/shows/{id}/availability"), None).await;
    assert_eq!(view["availableSeats"], 2);
    assert_eq!(view["heldSeatNumbers"], json!([]));

    // The seat is free to hold again.
    let (status, _) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_holds_on_one_seat() {
    let t = test_app();
    let id = create_show(&t.router, "Single Seat", 5).await;
    let uri = format!("/api/shows/{id}/hold");
    let body = json!({ "seatNumbers": [1], "holdDurationMinutes": 5 });

    let (a, b) = tokio::join!(
        send(&t.router, "POST", &uri, Some(body.clone())),
        send(&t.router, "POST", &uri, Some(body.clone())),
    );

    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn test_book_without_hold_conflicts() {
    let t = test_app();
    let id = create_show(&t.router, "Premiere", 10).await;
    send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [7] })),
    )
    .await;

    let (status, body) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/book"),
        Some(json!({ "seatNumbers": [5] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["requestedSeats"], json!([5]));
    assert_eq!(body["heldSeats"], json!([7]));
}

#[tokio::test]
async fn test_book_after_hold_expiry_conflicts() {
    let t = test_app();
    let id = create_show(&t.router, "Lapsed", 4).await;
    send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [3], "holdDurationMinutes": 1 })),
    )
    .await;

    t.clock.advance(Duration::minutes(1));

    let (status, _) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/book"),
        Some(json!({ "seatNumbers": [3] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_out_of_range_hold_conflicts() {
    let t = test_app();
    let id = create_show(&t.router, "Small Room", 4).await;

    for seats in [json!([0]), json!([5]), json!([2, 5])] {
        let (status, body) = send(
            &t.router,
            "POST",
            &format!("/api/shows/{id}/hold"),
            Some(json!({ "seatNumbers": seats, "holdDurationMinutes": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["requestedSeats"], seats);
    }

    let (_, view) = send(&t.router, "GET", &format!("/api/shows/{id}/availability"), None).await;
    assert_eq!(view["availableSeats"], 4);
    assert_eq!(view["heldSeats"], 0);
}

#[tokio::test]
async fn test_seat_list_validation() {
    let t = test_app();
    let id = create_show(&t.router, "Validation", 4).await;

    for (path, payload) in [
        ("hold", json!({ "seatNumbers": [] })),
        ("hold", json!({})),
        ("hold", json!({ "seatNumbers": [1], "holdDurationMinutes": -1 })),
        ("book", json!({ "seatNumbers": [] })),
        ("book", json!({ "seatNumbers": "1" })),
    ] {
        let (status, _) = send(&t.router, "POST", &format!("/api/shows/{id}/{path}"), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
    }
}

#[tokio::test]
async fn test_unknown_show_is_not_found() {
    let t = test_app();
    let missing = uuid::Uuid::new_v4();

    for id in [missing.to_string(), "not-a-show".to_string()] {
        let (status, body) = send(&t.router, "GET", &format!("/api/shows/{id}/availability"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Show not found");

        let (status, _) = send(&t.router, "GET", &format!("/api/shows/{id}/stats"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &t.router,
            "POST",
            &format!("/api/shows/{id}/hold"),
            Some(json!({ "seatNumbers": [1] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &t.router,
            "POST",
            &format!("/api/shows/{id}/book"),
            Some(json!({ "seatNumbers": [1] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_stats_breakdown() {
    let t = test_app();
    let id = create_show(&t.router, "Stats", 5).await;
    send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [2, 4], "holdDurationMinutes": 3 })),
    )
    .await;
    send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/book"),
        Some(json!({ "seatNumbers": [4] })),
    )
    .await;
    t.clock.advance(Duration::seconds(60));

    let (status, stats) = send(&t.router, "GET", &format!("/api/shows/{id}/stats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["availableSeats"]["count"], 3);
    assert_eq!(stats["availableSeats"]["seatNumbers"], json!([1, 3, 5]));
    assert_eq!(stats["heldSeats"]["count"], 1);
    assert_eq!(stats["heldSeats"]["details"][0]["seatNumber"], 2);
    assert_eq!(stats["heldSeats"]["details"][0]["expiresInSeconds"], 120);
    assert_eq!(stats["bookedSeats"]["seatNumbers"], json!([4]));
}

#[tokio::test]
async fn test_verify_database_reports_raw_state() {
    let t = test_app();
    let id = create_show(&t.router, "Diagnostics", 3).await;
    send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [1], "holdDurationMinutes": 1 })),
    )
    .await;
    t.clock.advance(Duration::minutes(5));

    let (status, body) = send(&t.router, "GET", "/api/shows/verify/database", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["connectionStatus"], "Connected");
    assert_eq!(body["data"]["databaseName"], "memory");
    assert_eq!(body["data"]["totalShows"], 1);
    // Expired but not yet evicted.
    assert_eq!(body["data"]["shows"][0]["heldSeatsCount"], 1);
    assert_eq!(body["data"]["shows"][0]["availableSeats"], 2);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let t = test_app();
    let (status, body) = send(&t.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let id = create_show(&t.router, "Metered", 2).await;
    send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [1, 2] })),
    )
    .await;

    let (status, text) = send_raw(&t.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains(r#"seatline_requests_total{operation="hold",outcome="ok"} 1"#));
    assert!(text.contains("seatline_seats_held_total 2"));
}

#[tokio::test]
async fn test_seat_beyond_int_range_conflicts() {
    let t = test_app();
    let id = create_show(&t.router, "Arena", i64::from(i32::MAX)).await;
    let past_end = i64::from(i32::MAX) + 1;

    for seats in [json!([past_end]), json!([1, 99_999_999_999_i64])] {
        let (status, body) = send(
            &t.router,
            "POST",
            &format!("/api/shows/{id}/hold"),
            Some(json!({ "seatNumbers": seats })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["requestedSeats"], seats);
    }

    let (status, view) = send(&t.router, "GET", &format!("/api/shows/{id}/availability"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["availableSeats"], i64::from(i32::MAX));
    assert_eq!(view["heldSeats"], 0);
}

#[tokio::test]
async fn test_conflict_echoes_deduplicated_seats() {
    let t = test_app();
    let id = create_show(&t.router, "Duplicates", 4).await;

    let (status, body) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/hold"),
        Some(json!({ "seatNumbers": [2, 2, 9, 2] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["requestedSeats"], json!([2, 9]));

    let (status, body) = send(
        &t.router,
        "POST",
        &format!("/api/shows/{id}/book"),
        Some(json!({ "seatNumbers": [3, 3] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["requestedSeats"], json!([3]));
}
