use super::{SessionAction, SessionError};
use crate::framework::{ActorEntity, StatePublisher};
use crate::gateway::{AuthGateway, GatewayError};
use crate::model::{AuthResponse, SessionPhase, SessionState, User, UserPatch};
use crate::storage::{DurableStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

const SESSION_EXPIRED: &str = "Session expired";

/// Dependencies injected into the session actor when it starts.
#[derive(Clone)]
pub struct SessionContext {
    pub gateway: Arc<dyn AuthGateway>,
    pub store: Arc<dyn DurableStore>,
}

impl SessionContext {
    pub fn new(gateway: Arc<dyn AuthGateway>, store: Arc<dyn DurableStore>) -> Self {
        Self { gateway, store }
    }
}

/// Who is signed in. Tokens live in durable storage, never in the published state.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn sign_out(&mut self, error: Option<&str>) {
        self.state = SessionState {
            phase: SessionPhase::Unauthenticated,
            user: None,
            error: error.map(str::to_string),
        };
    }

    fn sign_in(&mut self, user: User) {
        info!(user_id = user.id, "Signed in");
        self.state = SessionState {
            phase: SessionPhase::Authenticated,
            user: Some(user),
            error: None,
        };
    }

    async fn restore(&mut self, ctx: &SessionContext) -> Result<SessionState, SessionError> {
        let token = match ctx.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                self.sign_out(None);
                return Err(e.into());
            }
        };
        if token.filter(|t| !t.is_empty()).is_none() {
            info!("No stored session");
            self.sign_out(None);
            return Ok(self.state.clone());
        }
        match ctx.gateway.profile().await {
            Ok(user) => self.sign_in(user),
            Err(e) => {
                warn!(error = %e, "Stored session rejected");
                clear_tokens(ctx.store.as_ref()).await;
                self.sign_out(Some(SESSION_EXPIRED));
            }
        }
        Ok(self.state.clone())
    }

    /// Shared tail of login and register.
    async fn authenticate(
        &mut self,
        ctx: &SessionContext,
        publisher: &StatePublisher<SessionState>,
        request: impl std::future::Future<Output = Result<AuthResponse, GatewayError>>,
        fallback: &str,
    ) -> Result<SessionState, SessionError> {
        self.state.phase = SessionPhase::Authenticating;
        self.state.error = None;
        publisher.publish(self.state.clone());

        let outcome = match request.await {
            Ok(auth) => store_tokens(ctx.store.as_ref(), &auth)
                .await
                .map(|()| auth.user),
            Err(e) => Err(SessionError::Remote(e)),
        };
        match outcome {
            Ok(user) => {
                self.sign_in(user);
                Ok(self.state.clone())
            }
            Err(e) => {
                warn!(error = %e, "Authentication failed");
                let message = failure_message(&e, fallback);
                self.sign_out(Some(&message));
                Err(e)
            }
        }
    }

    async fn logout(&mut self, ctx: &SessionContext) -> Result<SessionState, SessionError> {
        let refresh = match ctx.store.get(REFRESH_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read refresh token");
                None
            }
        };
        if let Some(refresh) = refresh {
            if let Err(e) = ctx.gateway.logout(&refresh).await {
                warn!(error = %e, "Server logout failed, signing out locally");
            }
        }
        clear_tokens(ctx.store.as_ref()).await;
        self.sign_out(None);
        info!("Signed out");
        Ok(self.state.clone())
    }

    fn update_user(&mut self, patch: UserPatch) -> Result<SessionState, SessionError> {
        let user = self.state.user.as_mut().ok_or(SessionError::NotAuthenticated)?;
        user.apply(patch);
        Ok(self.state.clone())
    }

    async fn update_profile(
        &mut self,
        ctx: &SessionContext,
        patch: UserPatch,
    ) -> Result<SessionState, SessionError> {
        if !self.state.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        let user = ctx.gateway.update_profile(&patch).await?;
        self.state.user = Some(user);
        Ok(self.state.clone())
    }

    async fn expire(&mut self, ctx: &SessionContext) -> SessionState {
        if self.state.is_authenticated() {
            warn!("Session expired");
            clear_tokens(ctx.store.as_ref()).await;
            self.sign_out(Some(SESSION_EXPIRED));
        }
        self.state.clone()
    }
}

async fn store_tokens(store: &dyn DurableStore, auth: &AuthResponse) -> Result<(), SessionError> {
    store.set(ACCESS_TOKEN_KEY, &auth.tokens.access).await?;
    store.set(REFRESH_TOKEN_KEY, &auth.tokens.refresh).await?;
    Ok(())
}

async fn clear_tokens(store: &dyn DurableStore) {
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
        if let Err(e) = store.remove(key).await {
            warn!(key, error = %e, "Could not remove token");
        }
    }
}

/// The server's own wording when it sent one, `fallback` otherwise.
fn failure_message(error: &SessionError, fallback: &str) -> String {
    match error {
        SessionError::Remote(GatewayError::Status { message, .. }) => message.clone(),
        _ => fallback.to_string(),
    }
}

#[async_trait]
impl ActorEntity for Session {
    type Snapshot = SessionState;
    type Action = SessionAction;
    type ActionResult = SessionState;
    type Context = SessionContext;
    type Error = SessionError;

    fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    async fn handle_action(
        &mut self,
        action: SessionAction,
        ctx: &SessionContext,
        publisher: &StatePublisher<SessionState>,
    ) -> Result<SessionState, SessionError> {
        match action {
            SessionAction::Restore => self.restore(ctx).await,
            SessionAction::Login(credentials) => {
                let gateway = ctx.gateway.clone();
                let request = async move { gateway.login(&credentials).await };
                self.authenticate(ctx, publisher, request, "Login failed")
                    .await
            }
            SessionAction::Register(registration) => {
                let gateway = ctx.gateway.clone();
                let request = async move { gateway.register(&registration).await };
                self.authenticate(ctx, publisher, request, "Registration failed")
                    .await
            }
            SessionAction::Logout => self.logout(ctx).await,
            SessionAction::UpdateUser(patch) => self.update_user(patch),
            SessionAction::UpdateProfile(patch) => self.update_profile(ctx, patch).await,
            SessionAction::Expire => Ok(self.expire(ctx).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::FakeBackend;
    use crate::model::{Credentials, Registration};
    use crate::storage::MemoryStore;
    use tokio::sync::watch;

    struct Harness {
        session: Session,
        ctx: SessionContext,
        publisher: StatePublisher<SessionState>,
        observed: watch::Receiver<SessionState>,
        store: Arc<MemoryStore>,
        backend: Arc<FakeBackend>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let backend = Arc::new(FakeBackend::new(store.clone()));
            backend.add_user(User::new(1, "alice", "alice@example.com"), "secret");
            let (tx, observed) = watch::channel(SessionState::default());
            Self {
                session: Session::new(),
                ctx: SessionContext::new(backend.clone(), store.clone()),
                publisher: StatePublisher::new(tx),
                observed,
                store,
                backend,
            }
        }

        async fn run(&mut self, action: SessionAction) -> Result<SessionState, SessionError> {
            self.session
                .handle_action(action, &self.ctx, &self.publisher)
                .await
        }
    }

    fn login(password: &str) -> SessionAction {
        SessionAction::Login(Credentials {
            username: "alice".into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn test_restore_without_token_is_unauthenticated() {
        let mut h = Harness::new();
        let state = h.run(SessionAction::Restore).await.unwrap();
        assert_eq!(state.phase, SessionPhase::Unauthenticated);
        assert!(!state.is_loading());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_it() {
        let mut h = Harness::new();
        h.store.set(ACCESS_TOKEN_KEY, "stale").await.unwrap();
        h.store.set(REFRESH_TOKEN_KEY, "stale").await.unwrap();

        let state = h.run(SessionAction::Restore).await.unwrap();
        assert_eq!(state.phase, SessionPhase::Unauthenticated);
        assert_eq!(state.error.as_deref(), Some("Session expired"));
        assert!(h.store.snapshot(ACCESS_TOKEN_KEY).is_none());
        assert!(h.store.snapshot(REFRESH_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_publishes_authenticating() {
        let mut h = Harness::new();
        let state = h.run(login("secret")).await.unwrap();

        assert!(state.is_authenticated());
        assert_eq!(state.user.as_ref().map(|u| u.username.as_str()), Some("alice"));
        assert!(h.store.snapshot(ACCESS_TOKEN_KEY).is_some());
        assert!(h.store.snapshot(REFRESH_TOKEN_KEY).is_some());
        assert_eq!(h.observed.borrow().phase, SessionPhase::Authenticating);

        let restored = h.run(SessionAction::Restore).await.unwrap();
        assert!(restored.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_records_server_message() {
        let mut h = Harness::new();
        let err = h.run(login("wrong")).await.unwrap_err();

        assert!(matches!(err, SessionError::Remote(_)));
        let state = h.session.snapshot();
        assert_eq!(state.phase, SessionPhase::Unauthenticated);
        assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
        assert!(h.store.snapshot(ACCESS_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_login_transport_failure_uses_default_message() {
        let mut h = Harness::new();
        h.backend.fail_next("POST auth/login", GatewayError::Timeout);
        let _ = h.run(login("secret")).await;
        assert_eq!(h.session.snapshot().error.as_deref(), Some("Login failed"));
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let mut h = Harness::new();
        let state = h
            .run(SessionAction::Register(Registration {
                username: "bob".into(),
                email: "bob@example.com".into(),
                password: "pw".into(),
                password2: "pw".into(),
                first_name: "Bob".into(),
                last_name: String::new(),
            }))
            .await
            .unwrap();
        assert!(state.is_authenticated());
        assert_eq!(state.user.map(|u| u.display_name()), Some("Bob".to_string()));
    }

    #[tokio::test]
    async fn test_register_failure_uses_server_message() {
        let mut h = Harness::new();
        let _ = h
            .run(SessionAction::Register(Registration {
                username: "alice".into(),
                email: "a@example.com".into(),
                password: "pw".into(),
                password2: "pw".into(),
                first_name: String::new(),
                last_name: String::new(),
            }))
            .await;
        assert_eq!(
            h.session.snapshot().error.as_deref(),
            Some("A user with that username already exists.")
        );
    }

    #[tokio::test]
    async fn test_logout_survives_server_failure() {
        let mut h = Harness::new();
        h.run(login("secret")).await.unwrap();
        h.backend.fail_next("POST auth/logout", GatewayError::Timeout);

        let state = h.run(SessionAction::Logout).await.unwrap();
        assert_eq!(state.phase, SessionPhase::Unauthenticated);
        assert!(state.error.is_none());
        assert!(h.store.snapshot(ACCESS_TOKEN_KEY).is_none());
        assert!(h.store.snapshot(REFRESH_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_update_user_requires_session() {
        let mut h = Harness::new();
        let err = h
            .run(SessionAction::UpdateUser(UserPatch::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));

        h.run(login("secret")).await.unwrap();
        let state = h
            .run(SessionAction::UpdateUser(UserPatch {
                first_name: Some("Alice".into()),
                ..UserPatch::default()
            }))
            .await
            .unwrap();
        assert!(state.is_authenticated());
        assert_eq!(state.user.map(|u| u.first_name), Some("Alice".to_string()));
    }

    #[tokio::test]
    async fn test_update_profile_saves_upstream() {
        let mut h = Harness::new();
        h.run(login("secret")).await.unwrap();
        let state = h
            .run(SessionAction::UpdateProfile(UserPatch {
                email: Some("new@example.com".into()),
                ..UserPatch::default()
            }))
            .await
            .unwrap();
        assert_eq!(state.user.map(|u| u.email), Some("new@example.com".to_string()));
        assert!(h.backend.calls().contains(&"PATCH auth/profile".to_string()));
    }

    #[tokio::test]
    async fn test_expire_is_noop_when_signed_out() {
        let mut h = Harness::new();
        h.run(SessionAction::Restore).await.unwrap();
        let state = h.run(SessionAction::Expire).await.unwrap();
        assert!(state.error.is_none());

        h.run(login("secret")).await.unwrap();
        let state = h.run(SessionAction::Expire).await.unwrap();
        assert_eq!(state.phase, SessionPhase::Unauthenticated);
        assert_eq!(state.error.as_deref(), Some("Session expired"));
    }
}
