use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use skyway_api::middleware::IdentityTokenClaims;
use skyway_api::{app, Adapters, AppState, AuthConfig};
use skyway_booking::{InMemoryBookingRepository, InMemoryPaymentMethodRepository, InMemoryUserRepository};
use skyway_catalog::seed::{self, FlightBuilder};
use skyway_catalog::{InMemoryFlightCatalog, InMemoryInventoryLedger, SearchRules};
use skyway_core::flight::Flight;
use skyway_store::{ConsoleNotifier, FileTicketStore, TracingEventSink};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

struct TestApp {
    router: Router,
    flight: Flight,
}

fn setup() -> TestApp {
    let catalog = InMemoryFlightCatalog::new(seed::airports(), seed::airlines());
    let (Some(airline), Some(jfk), Some(lhr)) = (catalog.airline("BA"), catalog.airport("JFK"), catalog.airport("LHR"))
    else {
        panic!("seed data is missing reference rows");
    };
    let flight = FlightBuilder::new(airline, jfk, lhr, Utc::now() + Duration::days(10))
        .economy_seats(5)
        .build();
    catalog.add_flight(flight.clone()).unwrap();
    let ledger = InMemoryInventoryLedger::from_flights(std::slice::from_ref(&flight));

    let tickets_dir = std::env::temp_dir().join(format!("skyway-api-tickets-{}", Uuid::new_v4()));
    let adapters = Adapters {
        catalog: Arc::new(catalog),
        ledger: Arc::new(ledger),
        bookings: Arc::new(InMemoryBookingRepository::new()),
        users: Arc::new(InMemoryUserRepository::new()),
        payment_methods: Arc::new(InMemoryPaymentMethodRepository::new()),
        ticketing: Arc::new(FileTicketStore::new(&tickets_dir, "http://localhost/tickets")),
        notifier: Arc::new(ConsoleNotifier::new()),
        events: Arc::new(TracingEventSink::new()),
    };
    let state = AppState::new(adapters, AuthConfig { secret: SECRET.to_string() }, SearchRules::default())
        .with_ticket_files(&tickets_dir);

    TestApp { router: app(state), flight }
}

fn token(sub: &str) -> String {
    let claims = IdentityTokenClaims {
        sub: sub.to_string(),
        email: format!("{}@example.com", sub),
        given_name: Some("Test".to_string()),
        family_name: Some("Traveller".to_string()),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn send(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn booking_request(flight: &Flight, passengers: usize) -> Value {
    let passengers: Vec<Value> = (0..passengers)
        .map(|i| json!({ "firstName": format!("Passenger{}", i), "lastName": "Smith", "type": "ADULT" }))
        .collect();
    json!({
        "totalAmount": 450.0 * passengers.len() as f64,
        "isRoundTrip": false,
        "flightSegments": [
            { "flightId": flight.id, "cabinClass": "ECONOMY", "fareAmount": 450.0 }
        ],
        "passengers": passengers,
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup();
    let (status, body) = send(&app.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = setup();

    let (status, _) = send(&app.router, Method::GET, "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.router, Method::GET, "/v1/bookings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid token"));
}

#[tokio::test]
async fn test_search_reports_remaining_seats() {
    let app = setup();
    let request = json!({
        "from": "JFK",
        "to": "london",
        "departureDate": app.flight.departure_time.date_naive(),
        "passengers": { "adult": 2 }
    });

    let (status, body) = send(&app.router, Method::POST, "/v1/flights/search", None, Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    let outbound = body["outboundFlights"].as_array().unwrap();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0]["id"], json!(app.flight.id));
    assert_eq!(outbound[0]["remainingSeats"], 5);
    assert_eq!(outbound[0]["price"], 450.0);
    assert!(body["returnFlights"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_reads() {
    let app = setup();

    let (status, body) = send(&app.router, Method::GET, &format!("/v1/flights/{}", app.flight.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flightNumber"], json!(app.flight.flight_number));

    let (status, _) = send(&app.router, Method::GET, &format!("/v1/flights/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app.router, Method::GET, "/v1/airports", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = setup();
    let alice = token("alice");
    let bob = token("bob");

    let (status, body) = send(&app.router, Method::POST, "/v1/bookings", Some(alice.as_str()), Some(booking_request(&app.flight, 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["status"], "CONFIRMED");
    assert!(body["sideEffectFailures"].as_array().unwrap().is_empty());
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();
    let ticket_url = body["booking"]["segments"][0]["ticketUrl"].as_str().unwrap().to_string();
    assert!(ticket_url.starts_with(&format!("http://localhost/tickets/{}/", booking_id)));

    // Ticket documents are served from the same app.
    let ticket_path = ticket_url.trim_start_matches("http://localhost");
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(ticket_path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Only two seats left.
    let (status, body) = send(&app.router, Method::POST, "/v1/bookings", Some(bob.as_str()), Some(booking_request(&app.flight, 3))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Insufficient inventory"));

    let (status, _) = send(&app.router, Method::GET, &format!("/v1/bookings/{}", booking_id), Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app.router, Method::GET, &format!("/v1/bookings/{}", booking_id), Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passengerCounts"]["adult"], 3);
    assert_eq!(body["outboundFlight"]["id"], json!(app.flight.id));
    assert!(body["returnFlight"].is_null());

    let (status, body) = send(&app.router, Method::POST, &format!("/v1/bookings/{}/cancel", booking_id), Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CANCELLED");

    let (status, _) = send(&app.router, Method::POST, "/v1/bookings", Some(bob.as_str()), Some(booking_request(&app.flight, 5))).await;
    assert_eq!(status, StatusCode::CREATED);

    let passenger_id = body["booking"]["passengers"][0]["id"].clone();
    let update = json!({ "passengers": [{ "id": passenger_id, "firstName": "Changed", "lastName": "Smith" }] });
    let (status, _) = send(&app.router, Method::PUT, &format!("/v1/bookings/{}", booking_id), Some(alice.as_str()), Some(update)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app.router, Method::GET, "/v1/bookings", Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_booking_shape_is_a_bad_request() {
    let app = setup();
    let mut request = booking_request(&app.flight, 1);
    request["isRoundTrip"] = json!(true);

    let (status, _) = send(&app.router, Method::POST, "/v1/bookings", Some(token("carol").as_str()), Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_is_synced_from_token() {
    let app = setup();
    let dana = token("dana");

    let (status, body) = send(&app.router, Method::GET, "/v1/users/me", Some(dana.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "dana@example.com");
    assert_eq!(body["firstName"], "Test");

    let (status, body) = send(&app.router, Method::PUT, "/v1/users/me", Some(dana.as_str()), Some(json!({ "phone": "+44 20 7946 0000" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], "+44 20 7946 0000");
    assert_eq!(body["lastName"], "Traveller");

    let (status, _) = send(&app.router, Method::PUT, "/v1/users/me", Some(dana.as_str()), Some(json!({ "firstName": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_methods_keep_a_single_default() {
    let app = setup();
    let erin = token("erin");
    let card = |number: &str| {
        json!({
            "cardHolderName": "Erin Example",
            "cardType": "VISA",
            "cardNumber": number,
            "expiryMonth": "09",
            "expiryYear": "29",
            "cvv": "123",
            "isDefault": true
        })
    };

    let (status, first) = send(&app.router, Method::POST, "/v1/users/me/payment-methods", Some(erin.as_str()), Some(card("4111 1111 1111 1111"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["lastFourDigits"], "1111");
    assert!(first.get("cardNumber").is_none());
    assert!(first.get("cvv").is_none());

    let (status, second) = send(&app.router, Method::POST, "/v1/users/me/payment-methods", Some(erin.as_str()), Some(card("5500-0000-0000-0004"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, list) = send(&app.router, Method::GET, "/v1/users/me/payment-methods", Some(erin.as_str()), None).await;
    let defaults: Vec<&Value> = list.as_array().unwrap().iter().filter(|m| m["isDefault"] == true).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"], second["id"]);

    let first_id = first["id"].as_str().unwrap();
    let (status, body) = send(&app.router, Method::POST, &format!("/v1/users/me/payment-methods/{}/default", first_id), Some(erin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDefault"], true);

    let (status, _) = send(&app.router, Method::DELETE, &format!("/v1/users/me/payment-methods/{}", first_id), Some(erin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app.router, Method::GET, "/v1/users/me/payment-methods", Some(erin.as_str()), None).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["isDefault"], true);

    // Another user cannot see it.
    let (status, _) = send(&app.router, Method::GET, &format!("/v1/users/me/payment-methods/{}", list[0]["id"].as_str().unwrap()), Some(token("frank").as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_seat_stream_reports_reservations() {
    let app = setup();

    let request = Request::builder()
        .uri(format!("/v1/flights/{}/seats/stream", app.flight.id))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let mut frames = response.into_body().into_data_stream();

    let alice = token("alice");
    let (status, _) = send(&app.router, Method::POST, "/v1/bookings", Some(alice.as_str()), Some(booking_request(&app.flight, 2))).await;
    assert_eq!(status, StatusCode::CREATED);

    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), frames.next())
        .await
        .expect("no seat update within two seconds")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.contains("event: seat_update"), "{text}");
    assert!(text.contains("\"available_seats\":3"), "{text}");
    assert!(text.contains("\"cabin_class\":\"ECONOMY\""), "{text}");
}
