//! Reqwest-backed gateway for the storefront REST API.
//!
//! This adapter owns transport details only: URL joining, bearer tokens, timeouts,
//! status mapping and JSON decoding.

use super::{AddItemRequest, AuthEvent, AuthGateway, CartGateway, GatewayError, SessionGuard};
use crate::model::{AuthResponse, CartSnapshot, Credentials, LineId, Registration, User, UserPatch};
use crate::storage::DurableStore;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

const MAX_ERROR_BODY: usize = 200;

/// HTTP client for the storefront API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    guard: SessionGuard,
}

impl HttpGateway {
    /// Build a gateway rooted at `base` (e.g. `http://127.0.0.1:8000/api/`).
    ///
    /// A missing trailing slash is added so endpoint paths join under the base
    /// instead of replacing its last segment.
    pub fn new(
        mut base: Url,
        timeout: Duration,
        store: Arc<dyn DurableStore>,
    ) -> Result<Self, GatewayError> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            guard: SessionGuard::new(store),
        })
    }

    /// Route [`AuthEvent`]s to `events`.
    pub fn with_auth_events(mut self, events: mpsc::UnboundedSender<AuthEvent>) -> Self {
        self.guard = self.guard.with_events(events);
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.base.join(path)?)
    }

    /// Build a request; `authenticated` requests carry the stored bearer token.
    async fn request(
        &self,
        method: Method,
        path: &str,
        authenticated: bool,
    ) -> Result<(RequestBuilder, bool), GatewayError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "Sending request");
        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        let mut bearer = false;
        if authenticated {
            if let Some(token) = self.guard.access_token().await {
                builder = builder.bearer_auth(token);
                bearer = true;
            }
        }
        Ok((builder, bearer))
    }

    async fn send(&self, builder: RequestBuilder, bearer: bool) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED && bearer {
            self.guard.on_unauthorized().await;
            return Err(GatewayError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_status_error(status, &body))
    }

    async fn call<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        authenticated: bool,
    ) -> Result<Response, GatewayError> {
        let (mut builder, bearer) = self.request(method, path, authenticated).await?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder, bearer).await
    }

    async fn call_json<T: DeserializeOwned, B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        authenticated: bool,
    ) -> Result<T, GatewayError> {
        let response = self.call(method, path, body, authenticated).await?;
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl CartGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<CartSnapshot, GatewayError> {
        self.call_json(Method::GET, "cart", NO_BODY, true).await
    }

    #[instrument(skip(self))]
    async fn add_item(&self, request: &AddItemRequest) -> Result<(), GatewayError> {
        self.call(Method::POST, "cart/add", Some(request), true)
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    async fn update_item(&self, item_id: &LineId, quantity: u32) -> Result<(), GatewayError> {
        let body = serde_json::json!({ "quantity": quantity });
        self.call(Method::PATCH, &format!("cart/items/{item_id}"), Some(&body), true)
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, item_id: &LineId) -> Result<(), GatewayError> {
        self.call(Method::DELETE, &format!("cart/items/{item_id}"), NO_BODY, true)
            .await
            .map(drop)
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), GatewayError> {
        self.call(Method::DELETE, "cart/clear", NO_BODY, true)
            .await
            .map(drop)
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    // Credentials are never attached as a bearer: a 401 here means "wrong password",
    // not "session expired".
    #[instrument(skip(self))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError> {
        self.call_json(Method::POST, "auth/login", Some(credentials), false)
            .await
    }

    #[instrument(skip(self))]
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError> {
        self.call_json(Method::POST, "auth/register", Some(registration), false)
            .await
    }

    #[instrument(skip(self))]
    async fn profile(&self) -> Result<User, GatewayError> {
        self.call_json(Method::GET, "auth/profile", NO_BODY, true).await
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, patch: &UserPatch) -> Result<User, GatewayError> {
        self.call_json(Method::PATCH, "auth/profile", Some(patch), true)
            .await
    }

    #[instrument(skip(self, refresh_token))]
    async fn logout(&self, refresh_token: &str) -> Result<(), GatewayError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        self.call(Method::POST, "auth/logout", Some(&body), true)
            .await
            .map(drop)
    }
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(error)
    }
}

/// Prefer the server's own wording (`message`, `error` or `detail`), then the raw
/// body, then the status reason.
fn map_status_error(status: StatusCode, body: &str) -> GatewayError {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|field| value.get(field).and_then(|v| v.as_str()).map(str::to_string))
        });
    let message = from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.starts_with('{') || trimmed.starts_with('<') {
            format!(
                "Request failed with status {}",
                status.canonical_reason().unwrap_or(status.as_str())
            )
        } else {
            trimmed.chars().take(MAX_ERROR_BODY).collect()
        }
    });
    GatewayError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one canned response and returns the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        let base = Url::parse(&format!("http://{addr}/api")).unwrap();
        (base, handle)
    }

    async fn gateway(base: Url, store: Arc<MemoryStore>) -> HttpGateway {
        HttpGateway::new(base, Duration::from_secs(5), store).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_cart_sends_bearer_and_decodes_snapshot() {
        let body = r#"{"items":[{"id":31,"product":{"id":9,"name":"Aviator","price":"1200.00"},"quantity":1}],"total_price":"1200.00"}"#;
        let (base, server) = serve_once("200 OK", body).await;
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "tok-1").await.unwrap();

        let snapshot = gateway(base, store).await.fetch_cart().await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].id, LineId::from("31"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/cart HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer tok-1"));
    }

    #[tokio::test]
    async fn test_add_item_posts_normalized_payload() {
        let (base, server) = serve_once("200 OK", r#"{"message":"Item added to cart"}"#).await;
        let store = Arc::new(MemoryStore::new());

        let request = AddItemRequest::new(9.into(), 2, Some("M"), None);
        gateway(base, store).await.add_item(&request).await.unwrap();

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/cart/add HTTP/1.1"));
        assert!(raw.contains(r#""product_id":9"#));
        assert!(raw.contains(r#""selected_size":"M""#));
        assert!(raw.contains(r#""selected_color":"""#));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_tokens_and_signals_expiry() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"detail":"Token expired"}"#).await;
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "stale").await.unwrap();
        store.set(REFRESH_TOKEN_KEY, "stale-refresh").await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let gateway = gateway(base, store.clone()).await.with_auth_events(tx);
        let err = gateway.remove_item(&LineId::from("31")).await.unwrap_err();

        assert!(matches!(err, GatewayError::Unauthorized));
        assert_eq!(rx.recv().await, Some(AuthEvent::SessionExpired));
        assert!(store.snapshot(ACCESS_TOKEN_KEY).is_none());
        assert!(store.snapshot(REFRESH_TOKEN_KEY).is_none());
        assert!(server.await.unwrap().starts_with("DELETE /api/cart/items/31 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_failed_login_is_a_plain_status_error() {
        let (base, server) =
            serve_once("401 Unauthorized", r#"{"error":"Invalid credentials"}"#).await;
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "other-session").await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let gateway = gateway(base, store.clone()).await.with_auth_events(tx);
        let credentials = Credentials {
            username: "alice".into(),
            password: "wrong".into(),
        };
        let err = gateway.login(&credentials).await.unwrap_err();

        match err {
            GatewayError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(store.snapshot(ACCESS_TOKEN_KEY).as_deref(), Some("other-session"));
        assert!(!server.await.unwrap().to_lowercase().contains("authorization:"));
    }

    #[test]
    fn test_status_error_falls_back_to_reason() {
        let err = map_status_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err.to_string(), "Request failed with status Bad Gateway");

        let err = map_status_error(StatusCode::BAD_REQUEST, "quantity too large");
        assert_eq!(err.to_string(), "quantity too large");
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let store = Arc::new(MemoryStore::new());
        let gateway = HttpGateway::new(
            Url::parse("http://localhost:8000/api").unwrap(),
            Duration::from_secs(1),
            store,
        )
        .unwrap();
        assert_eq!(gateway.endpoint("cart/add").unwrap().as_str(), "http://localhost:8000/api/cart/add");
    }
}
