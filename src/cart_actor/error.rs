//! Error types for the Cart actor.

use crate::gateway::GatewayError;
use crate::model::LineId;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The request was rejected before reaching any persistence (bad quantity).
    #[error("{0}")]
    Validation(String),

    /// No line with this id exists in the guest cart.
    #[error("Cart item not found: {0}")]
    ItemNotFound(LineId),

    /// The remote cart service failed.
    #[error(transparent)]
    Remote(#[from] GatewayError),

    /// Durable storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The session has not resolved, so there is no authoritative cart yet.
    #[error("Cart is not ready yet")]
    Detached,

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for CartError {
    fn from(msg: String) -> Self {
        CartError::ActorCommunicationError(msg)
    }
}
