//! Shared helpers for the `rdv-app` integration tests: an in-process mock
//! of the booking backend and the wiring of a session against it.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use rdv_app::booking_page::PageOptions;
use rdv_app::terminal::Session;
use rdv_client::{BookingApi, MemoryStorage, Storage};

/// Mutable state of the mock backend.
#[derive(Clone, Default)]
pub struct MockState {
    /// Bodies received on `POST /utilisateurs/rendez-vous`.
    pub submitted: Arc<Mutex<Vec<Value>>>,
    /// Bookings returned by `GET /utilisateurs/rendez-vous`.
    pub bookings: Arc<Mutex<Vec<Value>>>,
    /// Every request path, in arrival order.
    pub requests: Arc<Mutex<Vec<String>>>,
    /// Reject the next submissions with a 409.
    pub reject_bookings: Arc<Mutex<bool>>,
    /// Delay applied to the slots of professional 43.
    pub slow_slots: Arc<Mutex<Option<Duration>>>,
}

impl MockState {
    pub fn submitted(&self) -> Vec<Value> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    fn record(&self, path: String) {
        self.requests.lock().unwrap().push(path);
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer test-token")
}

async fn categories(State(state): State<MockState>) -> Json<Value> {
    state.record("/categories".into());
    Json(json!([
        {"id": 1, "nom": "Informatique", "description": "Dépannage et conseil"},
        {"id": 2, "nom": "Santé"}
    ]))
}

async fn professionals(
    State(state): State<MockState>,
    Path(category_id): Path<i64>,
) -> Json<Value> {
    state.record(format!("/categories/{category_id}/professionnels"));
    let list = match category_id {
        1 => json!([
            {"id": 42, "prenom": "Awa", "nom": "Diop", "tarif": 45, "specialites": ["Informatique"]},
            {"id": 43, "prenom": "Luc", "nom": "Bernard", "tarif": 30, "specialites": ["Réseaux"], "photo": "/img/luc.png"}
        ]),
        2 => json!([
            {"id": 50, "prenom": "Inès", "nom": "Moreau", "tarif": 60, "specialites": ["Santé"]}
        ]),
        _ => json!([]),
    };
    Json(list)
}

async fn availabilities(
    State(state): State<MockState>,
    Path(professional_id): Path<i64>,
) -> Json<Value> {
    state.record(format!("/professionnels/{professional_id}/disponibilites"));
    let delay = *state.slow_slots.lock().unwrap();
    if professional_id == 43 {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
    let slots = match professional_id {
        42 => json!([
            {"id": 7, "dateDebut": "2024-06-10T09:00:00Z", "dateFin": "2024-06-10T09:30:00Z"},
            {"id": 8, "dateDebut": "2024-06-10T10:00:00Z", "dateFin": "2024-06-10T10:30:00Z"},
            {"id": 9, "dateDebut": "2024-06-11T14:00:00Z", "dateFin": "2024-06-11T14:30:00Z"}
        ]),
        43 => json!([
            {"id": 11, "dateDebut": "2024-06-12T08:00:00Z", "dateFin": "2024-06-12T08:30:00Z"}
        ]),
        _ => json!([]),
    };
    Json(slots)
}

async fn create_booking(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.record("POST /utilisateurs/rendez-vous".into());
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    state.submitted.lock().unwrap().push(body.clone());
    if *state.reject_bookings.lock().unwrap() {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Créneau déjà réservé"})),
        );
    }
    let booking = json!({
        "id": 500,
        "professionnelId": body["professionnelId"],
        "date": body["date"],
        "motif": body["motif"],
        "status": "PENDING"
    });
    state.bookings.lock().unwrap().push(booking.clone());
    (StatusCode::CREATED, Json(booking))
}

async fn my_bookings(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    state.record("GET /utilisateurs/rendez-vous".into());
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(Value::Array(state.bookings.lock().unwrap().clone())))
}

async fn cancel_booking(State(state): State<MockState>, Path(id): Path<i64>) -> StatusCode {
    let mut bookings = state.bookings.lock().unwrap();
    match bookings.iter_mut().find(|b| b["id"] == id) {
        Some(booking) => {
            booking["status"] = json!("CANCELLED");
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_booking(State(state): State<MockState>, Path(id): Path<i64>) -> StatusCode {
    state.bookings.lock().unwrap().retain(|b| b["id"] != id);
    StatusCode::NO_CONTENT
}

/// Build the mock backend router.
pub fn build_mock_backend(state: MockState) -> Router {
    Router::new()
        .route("/categories", get(categories))
        .route("/categories/{id}/professionnels", get(professionals))
        .route("/professionnels/{id}/disponibilites", get(availabilities))
        .route(
            "/utilisateurs/rendez-vous",
            get(my_bookings).post(create_booking),
        )
        .route("/utilisateurs/rendez-vous/{id}/annuler", put(cancel_booking))
        .route("/utilisateurs/rendez-vous/{id}", delete(delete_booking))
        .with_state(state)
}

/// Serve the mock backend on an ephemeral port.
pub async fn spawn_backend(state: MockState) -> String {
    let app = build_mock_backend(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Storage holding the token the mock backend accepts.
pub fn signed_in_storage() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::with_token("test-token"))
}

/// REST client for `base_url` using `storage`.
pub fn api(base_url: &str, storage: &Arc<dyn Storage>) -> Arc<BookingApi> {
    Arc::new(BookingApi::new(base_url, Arc::clone(storage)))
}

/// A terminal session against `base_url`, slots labelled in UTC.
pub fn session(base_url: &str, storage: Arc<dyn Storage>) -> Session {
    Session::new(api(base_url, &storage), storage, PageOptions::default())
}
