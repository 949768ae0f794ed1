//! REST API client for the booking backend.
//!
//! Wraps the backend's HTTP endpoints (catalog, availabilities, booking
//! submission, the user's bookings) using [`reqwest`]. Every request
//! carries the bearer token currently held in [`Storage`], if any.

use std::sync::Arc;
use std::time::Duration;

use rdv_core::models::{Availability, Booking, BookingRequest, Category, Professional};
use rdv_core::types::EntityId;
use reqwest::StatusCode;

use crate::storage::{Storage, StorageError, AUTH_TOKEN_KEY};

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the credentials (401) or the action (403).
    #[error("Not authorized ({status})")]
    Unauthorized {
        /// HTTP status code (401 or 403).
        status: u16,
    },

    /// The backend returned another non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Reading or writing the persisted token failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// The `message` (or `error`) field of a JSON error body, when present.
    pub fn server_message(&self) -> Option<String> {
        let ApiError::ApiError { body, .. } = self else {
            return None;
        };
        let json: serde_json::Value = serde_json::from_str(body).ok()?;
        ["message", "error"]
            .iter()
            .find_map(|key| json.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
    }

    /// Whether the failure happened before any response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Request(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }
}

/// HTTP client for the booking backend.
#[derive(Clone)]
pub struct BookingApi {
    client: reqwest::Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl BookingApi {
    /// Create a client for `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, storage)
    }

    /// Create a client whose requests time out after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        storage: Arc<dyn Storage>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, storage))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- token ----

    /// Persist a bearer token for subsequent requests.
    pub fn set_token(&self, token: &str) -> Result<(), ApiError> {
        self.storage.set(AUTH_TOKEN_KEY, token.trim())?;
        Ok(())
    }

    /// Forget the persisted bearer token.
    pub fn clear_token(&self) -> Result<(), ApiError> {
        self.storage.remove(AUTH_TOKEN_KEY)?;
        Ok(())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        self.storage
            .get(AUTH_TOKEN_KEY)
            .filter(|t| !t.trim().is_empty())
    }

    // ---- catalog ----

    /// `GET /categories`
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self.request(reqwest::Method::GET, "/categories").send().await?;
        Self::parse_response(response).await
    }

    /// `GET /categories/{category_id}/professionnels`
    pub async fn list_professionals(
        &self,
        category_id: EntityId,
    ) -> Result<Vec<Professional>, ApiError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/categories/{category_id}/professionnels"),
            )
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /professionnels/{professional_id}/disponibilites?disponible=true`
    pub async fn list_availabilities(
        &self,
        professional_id: EntityId,
    ) -> Result<Vec<Availability>, ApiError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/professionnels/{professional_id}/disponibilites"),
            )
            .query(&[("disponible", "true")])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- bookings ----

    /// `POST /utilisateurs/rendez-vous`
    ///
    /// Returns the created booking when the response body describes one.
    pub async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<Option<Booking>, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/utilisateurs/rendez-vous")
            .json(request)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Booking>(&body) {
            Ok(booking) => Ok(Some(booking)),
            Err(e) => {
                tracing::debug!(error = %e, "Booking created but response body is not a booking");
                Ok(None)
            }
        }
    }

    /// `GET /utilisateurs/rendez-vous`
    pub async fn list_my_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/utilisateurs/rendez-vous")
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `PUT /utilisateurs/rendez-vous/{id}/annuler`
    pub async fn cancel_booking(&self, booking_id: EntityId) -> Result<(), ApiError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/utilisateurs/rendez-vous/{booking_id}/annuler"),
            )
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `DELETE /utilisateurs/rendez-vous/{id}`
    pub async fn delete_booking(&self, booking_id: EntityId) -> Result<(), ApiError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/utilisateurs/rendez-vous/{booking_id}"),
            )
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "Sending backend request");
        let builder = self.client.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. 401/403 become
    /// [`ApiError::Unauthorized`]; the session is left untouched.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(
                status = status.as_u16(),
                url = %response.url(),
                "Backend refused the request credentials"
            );
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = BookingApi::new("http://localhost:8080/", Arc::new(MemoryStorage::new()));
        assert_eq!(api.base_url(), "http://localhost:8080");
    }

    #[test]
    fn token_roundtrip_through_storage() {
        let api = BookingApi::new("http://localhost", Arc::new(MemoryStorage::new()));
        assert!(!api.has_token());
        api.set_token("  abc  ").unwrap();
        assert_eq!(api.token().as_deref(), Some("abc"));
        api.clear_token().unwrap();
        assert!(!api.has_token());
    }

    #[test]
    fn server_message_reads_json_body() {
        let err = ApiError::ApiError {
            status: 409,
            body: r#"{"message":"Créneau déjà réservé"}"#.into(),
        };
        assert_eq!(err.server_message().as_deref(), Some("Créneau déjà réservé"));

        let err = ApiError::ApiError {
            status: 500,
            body: "boom".into(),
        };
        assert!(err.server_message().is_none());
        assert!(ApiError::Unauthorized { status: 401 }.server_message().is_none());
    }
}
