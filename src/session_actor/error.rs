//! Error types for the Session actor.

use crate::gateway::GatewayError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The auth service rejected or failed the request.
    #[error(transparent)]
    Remote(#[from] GatewayError),

    /// Tokens could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for SessionError {
    fn from(msg: String) -> Self {
        SessionError::ActorCommunicationError(msg)
    }
}
