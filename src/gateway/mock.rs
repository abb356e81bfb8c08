//! # In-memory storefront backend
//!
//! [`FakeBackend`] implements [`CartGateway`] and [`AuthGateway`] without a network.
//! It behaves like the real service where the providers can tell the difference:
//!
//! - bearer tokens are read from the same [`DurableStore`] the session writes to
//! - server cart lines get numeric ids and merge by product, size and color
//! - quantities are clamped to 99
//! - a revoked token produces a `401`, with the same token cleanup and
//!   [`AuthEvent::SessionExpired`] signal as [`HttpGateway`](super::HttpGateway)
//!
//! ## Test hooks
//!
//! ```rust,ignore
//! let backend = FakeBackend::new(store.clone());
//! backend.add_product(Product::new(9, "Aviator", dec!(1200)));
//! backend.add_user(User::new(1, "alice", "alice@example.com"), "secret");
//!
//! backend.fail_next("POST cart/add", GatewayError::Timeout);
//! // ... drive the cart ...
//! assert_eq!(backend.calls(), vec!["POST cart/add"]);
//! ```

use super::{AddItemRequest, AuthEvent, AuthGateway, CartGateway, GatewayError, SessionGuard};
use crate::model::{
    normalize_variant, AuthResponse, CartLineItem, CartSnapshot, Credentials, LineId, Product,
    ProductId, Registration, Tokens, User, UserPatch, MAX_LINE_QUANTITY,
};
use crate::storage::DurableStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct Account {
    user: Option<User>,
    password: String,
    cart: Vec<CartLineItem>,
}

#[derive(Default)]
struct BackendState {
    products: HashMap<ProductId, Product>,
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    next_line_id: u64,
    next_user_id: u64,
    next_token: u64,
    calls: Vec<String>,
    failures: VecDeque<(String, GatewayError)>,
}

impl BackendState {
    fn account(&mut self, username: &str) -> Result<&mut Account, GatewayError> {
        self.accounts
            .get_mut(username)
            .ok_or_else(|| status(404, "User not found"))
    }

    fn issue_tokens(&mut self, username: &str) -> Tokens {
        self.next_token += 1;
        let tokens = Tokens {
            access: format!("access-{}", self.next_token),
            refresh: format!("refresh-{}", self.next_token),
        };
        self.access_tokens
            .insert(tokens.access.clone(), username.to_string());
        self.refresh_tokens
            .insert(tokens.refresh.clone(), username.to_string());
        tokens
    }
}

fn status(code: u16, message: &str) -> GatewayError {
    GatewayError::Status {
        status: code,
        message: message.to_string(),
    }
}

fn snapshot_of(lines: &[CartLineItem]) -> CartSnapshot {
    CartSnapshot {
        items: lines.to_vec(),
        total: lines.iter().map(CartLineItem::line_total).sum(),
    }
}

/// In-memory stand-in for the storefront REST API.
pub struct FakeBackend {
    state: Mutex<BackendState>,
    guard: SessionGuard,
    latency: Option<Duration>,
}

impl FakeBackend {
    /// A backend that reads bearer tokens from `store`.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            state: Mutex::new(BackendState {
                next_line_id: 1,
                next_user_id: 1,
                ..BackendState::default()
            }),
            guard: SessionGuard::new(store),
            latency: None,
        }
    }

    /// Route [`AuthEvent`]s to `events`.
    pub fn with_auth_events(mut self, events: mpsc::UnboundedSender<AuthEvent>) -> Self {
        self.guard = self.guard.with_events(events);
        self
    }

    /// Delay every call by `latency`, to widen race windows in tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn try_state<R>(
        &self,
        f: impl FnOnce(&mut BackendState) -> Result<R, GatewayError>,
    ) -> Result<R, GatewayError> {
        self.with_state(f)
    }

    pub fn add_product(&self, product: Product) {
        self.with_state(|s| s.products.insert(product.id, product));
    }

    pub fn add_user(&self, user: User, password: &str) {
        self.with_state(|s| {
            s.next_user_id = s.next_user_id.max(user.id + 1);
            s.accounts.insert(
                user.username.clone(),
                Account {
                    user: Some(user),
                    password: password.to_string(),
                    cart: Vec::new(),
                },
            );
        });
    }

    /// Puts a line straight into `username`'s server cart, bypassing the call log.
    pub fn seed_line(&self, username: &str, product_id: ProductId, quantity: u32) {
        self.with_state(|s| {
            let Some(product) = s.products.get(&product_id).cloned() else {
                return;
            };
            let id = LineId::from(s.next_line_id);
            s.next_line_id += 1;
            if let Ok(account) = s.account(username) {
                account.cart.push(CartLineItem {
                    id,
                    product,
                    quantity: quantity.min(MAX_LINE_QUANTITY),
                    selected_size: None,
                    selected_color: None,
                });
            }
        });
    }

    /// The server-side cart of `username`.
    pub fn server_cart(&self, username: &str) -> Vec<CartLineItem> {
        self.with_state(|s| {
            s.accounts
                .get(username)
                .map(|account| account.cart.clone())
                .unwrap_or_default()
        })
    }

    /// Invalidate every issued access token, as if they all expired.
    pub fn revoke_tokens(&self) {
        self.with_state(|s| s.access_tokens.clear());
    }

    /// Make the next call whose log line starts with `operation` fail with `error`.
    ///
    /// A scripted [`GatewayError::Unauthorized`] also runs the session expiry path.
    pub fn fail_next(&self, operation: &str, error: GatewayError) {
        self.with_state(|s| s.failures.push_back((operation.to_string(), error)));
    }

    /// Every call received so far, as `"METHOD path"`.
    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with_state(|s| s.calls.clear());
    }

    async fn enter(&self, call: String) -> Result<(), GatewayError> {
        debug!(%call, "Fake backend call");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let scripted = self.with_state(|s| {
            s.calls.push(call.clone());
            let position = s.failures.iter().position(|(op, _)| call.starts_with(op))?;
            s.failures.remove(position).map(|(_, error)| error)
        });
        match scripted {
            Some(GatewayError::Unauthorized) => {
                self.guard.on_unauthorized().await;
                Err(GatewayError::Unauthorized)
            }
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Resolves the bearer token to a username.
    async fn authenticate(&self) -> Result<String, GatewayError> {
        let Some(token) = self.guard.access_token().await else {
            return Err(status(401, "Authentication credentials were not provided."));
        };
        match self.with_state(|s| s.access_tokens.get(&token).cloned()) {
            Some(username) => Ok(username),
            None => {
                self.guard.on_unauthorized().await;
                Err(GatewayError::Unauthorized)
            }
        }
    }
}

#[async_trait]
impl CartGateway for FakeBackend {
    async fn fetch_cart(&self) -> Result<CartSnapshot, GatewayError> {
        self.enter("GET cart".into()).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| Ok(snapshot_of(&s.account(&username)?.cart)))
    }

    async fn add_item(&self, request: &AddItemRequest) -> Result<(), GatewayError> {
        self.enter("POST cart/add".into()).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| {
            let product = s
                .products
                .get(&request.product_id)
                .cloned()
                .ok_or_else(|| status(404, "Product not found"))?;
            let size = normalize_variant(Some(request.selected_size.clone()));
            let color = normalize_variant(Some(request.selected_color.clone()));
            let next_id = s.next_line_id;
            let account = s.account(&username)?;
            match account.cart.iter_mut().find(|line| {
                line.product.id == request.product_id
                    && line.selected_size == size
                    && line.selected_color == color
            }) {
                Some(line) => {
                    line.quantity = (line.quantity + request.quantity).min(MAX_LINE_QUANTITY);
                }
                None => {
                    account.cart.push(CartLineItem {
                        id: LineId::from(next_id),
                        product,
                        quantity: request.quantity.min(MAX_LINE_QUANTITY),
                        selected_size: size,
                        selected_color: color,
                    });
                    s.next_line_id += 1;
                }
            }
            Ok(())
        })
    }

    async fn update_item(&self, item_id: &LineId, quantity: u32) -> Result<(), GatewayError> {
        self.enter(format!("PATCH cart/items/{item_id}")).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| {
            let account = s.account(&username)?;
            let line = account
                .cart
                .iter_mut()
                .find(|line| &line.id == item_id)
                .ok_or_else(|| status(404, "Cart item not found"))?;
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
            Ok(())
        })
    }

    async fn remove_item(&self, item_id: &LineId) -> Result<(), GatewayError> {
        self.enter(format!("DELETE cart/items/{item_id}")).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| {
            let account = s.account(&username)?;
            let before = account.cart.len();
            account.cart.retain(|line| &line.id != item_id);
            if account.cart.len() == before {
                return Err(status(404, "Cart item not found"));
            }
            Ok(())
        })
    }

    async fn clear_cart(&self) -> Result<(), GatewayError> {
        self.enter("DELETE cart/clear".into()).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| {
            s.account(&username)?.cart.clear();
            Ok(())
        })
    }
}

#[async_trait]
impl AuthGateway for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError> {
        self.enter("POST auth/login".into()).await?;
        self.try_state(|s| {
            let user = s
                .accounts
                .get(&credentials.username)
                .filter(|account| account.password == credentials.password)
                .and_then(|account| account.user.clone())
                .ok_or_else(|| status(401, "Invalid credentials"))?;
            let tokens = s.issue_tokens(&user.username);
            Ok(AuthResponse { tokens, user })
        })
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError> {
        self.enter("POST auth/register".into()).await?;
        self.try_state(|s| {
            if registration.password != registration.password2 {
                return Err(status(400, "Password fields didn't match."));
            }
            if s.accounts.contains_key(&registration.username) {
                return Err(status(400, "A user with that username already exists."));
            }
            let mut user = User::new(
                s.next_user_id,
                registration.username.clone(),
                registration.email.clone(),
            );
            user.first_name = registration.first_name.clone();
            user.last_name = registration.last_name.clone();
            s.next_user_id += 1;
            s.accounts.insert(
                user.username.clone(),
                Account {
                    user: Some(user.clone()),
                    password: registration.password.clone(),
                    cart: Vec::new(),
                },
            );
            let tokens = s.issue_tokens(&user.username);
            Ok(AuthResponse { tokens, user })
        })
    }

    async fn profile(&self) -> Result<User, GatewayError> {
        self.enter("GET auth/profile".into()).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| {
            s.account(&username)?
                .user
                .clone()
                .ok_or_else(|| status(404, "User not found"))
        })
    }

    async fn update_profile(&self, patch: &UserPatch) -> Result<User, GatewayError> {
        self.enter("PATCH auth/profile".into()).await?;
        let username = self.authenticate().await?;
        self.try_state(|s| {
            let user = s
                .account(&username)?
                .user
                .as_mut()
                .ok_or_else(|| status(404, "User not found"))?;
            user.apply(patch.clone());
            Ok(user.clone())
        })
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), GatewayError> {
        self.enter("POST auth/logout".into()).await?;
        self.authenticate().await?;
        self.try_state(|s| {
            s.refresh_tokens
                .remove(refresh_token)
                .map(drop)
                .ok_or_else(|| status(400, "Invalid token"))
        })
    }
}
