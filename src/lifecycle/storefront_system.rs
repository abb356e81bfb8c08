use crate::clients::{ActorClient, CartClient, SessionClient};
use crate::config::StorefrontConfig;
use crate::gateway::{AuthEvent, AuthGateway, CartGateway, GatewayError, HttpGateway};
use crate::model::{CartBinding, CartMode, Registration, SessionPhase, SessionState};
use crate::session_actor::{SessionContext, SessionError};
use crate::cart_actor::CartContext;
use crate::storage::{DurableStore, FileStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Errors raised while starting or stopping the system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Actor task failed: {0}")]
    ActorFailed(#[from] tokio::task::JoinError),
}

/// The running storefront core: a session provider, a cart store, and the bridge
/// between them.
///
/// # Architecture
///
/// - **Session actor**: restores, signs in and signs out; owns the bearer tokens
/// - **Cart actor**: line items and totals, persisted locally or remotely
/// - **Bridge task**: watches the session and switches the cart's persistence;
///   forwards [`AuthEvent::SessionExpired`] from the gateway to the session
pub struct StorefrontSystem {
    /// Client for interacting with the Session actor
    pub session_client: SessionClient,

    /// Client for interacting with the Cart actor
    pub cart_client: CartClient,

    bridge: JoinHandle<()>,

    /// Task handles for the actors (used for graceful shutdown)
    handles: Vec<JoinHandle<()>>,
}

impl StorefrontSystem {
    /// Builds the file store and HTTP gateway described by `config`, then starts.
    pub async fn from_config(config: &StorefrontConfig) -> Result<Self, SystemError> {
        let store: Arc<dyn DurableStore> = Arc::new(FileStore::open(&config.data_dir).await?);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let gateway = Arc::new(
            HttpGateway::new(config.api_url.clone(), config.timeout(), store.clone())?
                .with_auth_events(events_tx),
        );
        info!(api_url = %gateway.base(), data_dir = %config.data_dir.display(), "Configured storefront");
        Ok(Self::start(gateway.clone(), gateway, store, events_rx).await)
    }

    /// Spawns both actors and the bridge, restores the session and hydrates the cart.
    ///
    /// `auth_events` must be the receiving end of the channel the gateway signals
    /// expiry on.
    pub async fn start(
        auth: Arc<dyn AuthGateway>,
        cart: Arc<dyn CartGateway>,
        store: Arc<dyn DurableStore>,
        auth_events: mpsc::UnboundedReceiver<AuthEvent>,
    ) -> Self {
        // 1. Create actors (no dependencies yet)
        let (session_actor, session_client) = crate::session_actor::new();
        let (cart_actor, cart_client) = crate::cart_actor::new();

        // 2. Start actors with their dependencies injected
        let session_handle =
            tokio::spawn(session_actor.run(SessionContext::new(auth, store.clone())));
        let cart_handle = tokio::spawn(cart_actor.run(CartContext::new(store, cart)));

        // 3. Resolve the session before the bridge starts, so the cart is hydrated
        //    exactly once for the startup state.
        let session = match session_client.restore_session().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Session restore failed");
                session_client.state()
            }
        };
        if let Some(binding) = cart_binding_for(&session) {
            if let Err(e) = cart_client.switch_mode(binding).await {
                warn!(error = %e, "Initial cart load failed");
            }
        }

        let mut session_rx = session_client.subscribe();
        session_rx.borrow_and_update();
        let bridge = tokio::spawn(run_bridge(
            session_rx,
            auth_events,
            session_client.clone(),
            cart_client.clone(),
        ));

        Self {
            session_client,
            cart_client,
            bridge,
            handles: vec![session_handle, cart_handle],
        }
    }

    /// Signs in and waits until the cart has switched to the remote copy.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionState, SessionError> {
        let state = self.session_client.login(username, password).await?;
        self.follow_session(&state).await;
        Ok(state)
    }

    /// Registers, signs in, and waits until the cart has switched to the remote copy.
    pub async fn register(&self, registration: Registration) -> Result<SessionState, SessionError> {
        let state = self.session_client.register(registration).await?;
        self.follow_session(&state).await;
        Ok(state)
    }

    /// Signs out and waits until the guest cart is back.
    pub async fn logout(&self) -> Result<SessionState, SessionError> {
        let state = self.session_client.logout().await?;
        self.follow_session(&state).await;
        Ok(state)
    }

    // The bridge makes the same switch; whichever lands second is a no-op.
    async fn follow_session(&self, state: &SessionState) {
        if let Some(binding) = cart_binding_for(state) {
            if let Err(e) = self.cart_client.switch_mode(binding).await {
                warn!(mode = %binding.mode, error = %e, "Cart load after session change failed");
            }
        }
    }

    /// Gracefully shuts down the system.
    ///
    /// The bridge is stopped first (it holds clients of both actors), then the
    /// clients are dropped, which closes the actors' channels and ends their loops.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down storefront...");

        self.bridge.abort();
        let _ = self.bridge.await;

        drop(self.session_client);
        drop(self.cart_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(e.into());
            }
        }

        info!("Storefront shutdown complete.");
        Ok(())
    }
}

/// The cart binding a settled session calls for. `None` while the session is still
/// resolving or mid-login.
///
/// A signed-in session binds the remote cart to its user, so signing in as someone
/// else reloads the cart even though the mode stays remote.
pub fn cart_binding_for(session: &SessionState) -> Option<CartBinding> {
    match session.phase {
        SessionPhase::Authenticated => Some(CartBinding {
            mode: CartMode::Remote,
            owner: session.user.as_ref().map(|user| user.id),
        }),
        SessionPhase::Unauthenticated => Some(CartBinding::guest()),
        SessionPhase::Initializing | SessionPhase::Authenticating => None,
    }
}

async fn run_bridge(
    mut session_rx: watch::Receiver<SessionState>,
    mut auth_events: mpsc::UnboundedReceiver<AuthEvent>,
    session: SessionClient,
    cart: CartClient,
) {
    let mut events_open = true;
    loop {
        tokio::select! {
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = session_rx.borrow_and_update().clone();
                if let Some(binding) = cart_binding_for(&state) {
                    if let Err(e) = cart.switch_mode(binding).await {
                        warn!(mode = %binding.mode, error = %e, "Cart did not follow session change");
                    }
                }
            }
            event = auth_events.recv(), if events_open => match event {
                Some(AuthEvent::SessionExpired) => {
                    info!("Gateway reported an expired session");
                    if let Err(e) = session.expire().await {
                        warn!(error = %e, "Could not expire session");
                    }
                }
                None => events_open = false,
            },
        }
    }
}
