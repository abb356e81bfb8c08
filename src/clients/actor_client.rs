use crate::framework::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;
use tokio::sync::watch;

/// Trait for provider-specific clients to inherit the standard read operations.
///
/// Implementors supply [`ActorClient::inner`] and [`ActorClient::map_error`]; reads of
/// the published state and the settled `get` come for free.
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The provider-specific error type.
    type Error: From<String> + Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the specific provider error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// The latest published state. Never queues behind in-flight operations.
    fn state(&self) -> T::Snapshot {
        self.inner().current()
    }

    /// A receiver that observes every published state, including intermediate ones.
    fn subscribe(&self) -> watch::Receiver<T::Snapshot> {
        self.inner().subscribe()
    }

    /// The state once every previously queued operation has finished.
    #[tracing::instrument(skip(self))]
    async fn settled(&self) -> Result<T::Snapshot, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get().await.map_err(Self::map_error)
    }
}

/// Recovers the entity's own error from [`FrameworkError::EntityError`].
///
/// Anything else (closed actor, dropped response) becomes a message for the
/// caller's `ActorCommunicationError`.
pub fn downcast_entity_error<E>(e: FrameworkError) -> Result<E, String>
where
    E: std::error::Error + 'static,
{
    match e {
        FrameworkError::EntityError(inner) => match inner.downcast::<E>() {
            Ok(typed) => Ok(*typed),
            Err(other) => Err(other.to_string()),
        },
        other => Err(other.to_string()),
    }
}
