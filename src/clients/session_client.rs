use crate::clients::actor_client::{downcast_entity_error, ActorClient};
use crate::framework::{FrameworkError, ResourceClient};
use crate::model::{Credentials, Registration, SessionState, User, UserPatch};
use crate::session_actor::{Session, SessionAction, SessionError};
use async_trait::async_trait;
use tracing::instrument;

/// Client for interacting with the Session actor.
#[derive(Clone)]
pub struct SessionClient {
    inner: ResourceClient<Session>,
}

impl SessionClient {
    pub fn new(inner: ResourceClient<Session>) -> Self {
        Self { inner }
    }

    async fn perform(&self, action: SessionAction) -> Result<SessionState, SessionError> {
        self.inner
            .perform_action(action)
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::Restore).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::Login(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }))
        .await
    }

    #[instrument(skip(self))]
    pub async fn register(&self, registration: Registration) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::Register(registration)).await
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::Logout).await
    }

    #[instrument(skip(self))]
    pub async fn update_user(&self, patch: UserPatch) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::UpdateUser(patch)).await
    }

    #[instrument(skip(self))]
    pub async fn update_profile(&self, patch: UserPatch) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::UpdateProfile(patch)).await
    }

    pub async fn expire(&self) -> Result<SessionState, SessionError> {
        self.perform(SessionAction::Expire).await
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user
    }
}

#[async_trait]
impl ActorClient<Session> for SessionClient {
    type Error = SessionError;

    fn inner(&self) -> &ResourceClient<Session> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        downcast_entity_error(e).unwrap_or_else(SessionError::ActorCommunicationError)
    }
}
