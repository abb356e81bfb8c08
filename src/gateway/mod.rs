//! # Remote Gateway
//!
//! The providers never talk HTTP themselves. They depend on two ports:
//!
//! - [`CartGateway`] - the remote cart endpoints
//! - [`AuthGateway`] - login, registration, profile and logout
//!
//! [`HttpGateway`] implements both against the storefront REST API. [`mock::FakeBackend`]
//! implements both in memory for tests.
//!
//! ## Session expiry
//!
//! A `401` on a request that carried a bearer token means the session is gone. The
//! gateway handles it itself through [`SessionGuard`]: both stored tokens are removed
//! and an [`AuthEvent::SessionExpired`] is emitted. The cart never sees auth recovery;
//! it only sees the session flip to unauthenticated afterwards.

pub mod http;
pub mod mock;

pub use http::*;

use crate::model::{AuthResponse, CartSnapshot, Credentials, LineId, ProductId, Registration, User, UserPatch};
use crate::storage::{DurableStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Errors surfaced by gateway calls.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure: connection refused, reset, TLS, malformed response.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The bearer token was rejected; tokens have been cleared.
    #[error("Session expired, please sign in again")]
    Unauthorized,

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Signals emitted by the gateway for the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SessionExpired,
}

/// Body of `POST cart/add`. Missing variants are sent as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub selected_size: String,
    pub selected_color: String,
}

impl AddItemRequest {
    pub fn new(
        product_id: ProductId,
        quantity: u32,
        selected_size: Option<&str>,
        selected_color: Option<&str>,
    ) -> Self {
        Self {
            product_id,
            quantity,
            selected_size: selected_size.unwrap_or_default().to_string(),
            selected_color: selected_color.unwrap_or_default().to_string(),
        }
    }
}

/// Remote cart endpoints. Write responses are ignored: callers reconcile with
/// [`CartGateway::fetch_cart`].
#[async_trait]
pub trait CartGateway: Send + Sync {
    async fn fetch_cart(&self) -> Result<CartSnapshot, GatewayError>;

    async fn add_item(&self, request: &AddItemRequest) -> Result<(), GatewayError>;

    async fn update_item(&self, item_id: &LineId, quantity: u32) -> Result<(), GatewayError>;

    async fn remove_item(&self, item_id: &LineId) -> Result<(), GatewayError>;

    async fn clear_cart(&self) -> Result<(), GatewayError>;
}

/// Authentication endpoints.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError>;

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError>;

    async fn profile(&self) -> Result<User, GatewayError>;

    async fn update_profile(&self, patch: &UserPatch) -> Result<User, GatewayError>;

    async fn logout(&self, refresh_token: &str) -> Result<(), GatewayError>;
}

/// Token cleanup and expiry notification shared by gateway implementations.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn DurableStore>,
    events: Option<mpsc::UnboundedSender<AuthEvent>>,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store, events: None }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<AuthEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// The stored access token, if any. A storage failure reads as "no token".
    pub async fn access_token(&self) -> Option<String> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read access token");
                None
            }
        }
    }

    /// Clears both tokens and emits [`AuthEvent::SessionExpired`].
    pub async fn on_unauthorized(&self) {
        warn!("Bearer token rejected, clearing session");
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key).await {
                warn!(key, error = %e, "Could not clear token");
            }
        }
        if let Some(events) = &self.events {
            let _ = events.send(AuthEvent::SessionExpired);
        }
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("notifies", &self.events.is_some())
            .finish_non_exhaustive()
    }
}
