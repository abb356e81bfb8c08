//! # Core Actor Framework
//!
//! This module defines the generic building blocks for the provider actors.
//!
//! ## Key Types
//!
//! - [`ActorEntity`]: The trait that every stateful provider (session, cart) implements.
//! - [`ResourceActor`]: The generic actor that owns one entity and processes its messages in order.
//! - [`ResourceClient`]: The cloneable handle used to send requests and read published state.
//! - [`StatePublisher`]: Lets an entity publish intermediate state (e.g. `loading = true`) mid-action.
//! - [`FrameworkError`]: Common errors (e.g. ActorClosed, EntityError).

use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any stateful provider must implement to be driven by a [`ResourceActor`].
///
/// # Architecture Note
/// The session provider and the cart store share one shape: a single piece of state,
/// a set of operations that must not interleave, and observers that want the latest
/// state without queuing behind an in-flight network call. Writing the message loop
/// once against this trait gives both providers the same serialization and
/// publication guarantees.
///
/// # Async & Context
/// `handle_action` is async so an entity can await the remote gateway. The `Context`
/// type is injected by [`ResourceActor::run`] ("late binding"), so dependencies can be
/// wired after the actor is constructed.
#[async_trait]
pub trait ActorEntity: Send + Sync + 'static {
    /// The read model published to observers after every change.
    type Snapshot: Clone + Send + Sync + Debug + 'static;

    /// Enum of the operations this entity understands.
    type Action: Send + Sync + Debug;

    /// The result type returned by actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this entity.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build the read model from the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Handle one operation. The actor guarantees no other action runs until this returns.
    ///
    /// Use `publisher` to expose intermediate state before a suspension point; the
    /// actor publishes the final state itself once the action settles.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
        publisher: &StatePublisher<Self::Snapshot>,
    ) -> Result<Self::ActionResult, Self::Error>;
}

// =============================================================================
// 2. MESSAGES, ERRORS & STATE PUBLICATION
// =============================================================================

/// Errors that can occur within the actor framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Message sent to the actor.
///
/// - **Get**: the settled snapshot, answered only after every earlier request finished.
/// - **Action**: run one [`ActorEntity::Action`] to completion.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Get {
        respond_to: Response<T::Snapshot>,
    },
    Action {
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}

/// Write half of the state watch channel, handed to entities during an action.
#[derive(Debug)]
pub struct StatePublisher<S> {
    sender: watch::Sender<S>,
}

impl<S> StatePublisher<S> {
    pub fn new(sender: watch::Sender<S>) -> Self {
        Self { sender }
    }

    /// Replace the published state. Never fails, even with no observers.
    pub fn publish(&self, state: S) {
        self.sender.send_replace(state);
    }
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// The generic actor that owns one entity.
///
/// **Concurrency Model**:
/// The actor processes its messages *sequentially*. Two rapid calls from a UI are
/// applied in the order they were sent, never in the order their network responses
/// happen to arrive. The entity needs no `Mutex`: the task owns it exclusively.
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    entity: T,
    publisher: StatePublisher<T::Snapshot>,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` around `entity` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the capacity of the request channel; callers wait when it is full.
    pub fn new(entity: T, buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (state_tx, state_rx) = watch::channel(entity.snapshot());
        let actor = Self {
            receiver,
            entity,
            publisher: StatePublisher::new(state_tx),
        };
        let client = ResourceClient::new(sender, state_rx);
        (actor, client)
    }

    /// Runs the actor's event loop, processing messages until every client is dropped.
    pub async fn run(mut self, context: T::Context) {
        // Extract just the type name (e.g. "CartStore" instead of "storefront_sync::cart_actor::entity::CartStore")
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Get { respond_to } => {
                    debug!(entity_type, "Get");
                    let _ = respond_to.send(Ok(self.entity.snapshot()));
                }
                ResourceRequest::Action { action, respond_to } => {
                    debug!(entity_type, ?action, "Action");
                    let result = self
                        .entity
                        .handle_action(action, &context, &self.publisher)
                        .await
                        .map_err(|e| FrameworkError::EntityError(Box::new(e)));
                    self.publisher.publish(self.entity.snapshot());
                    match &result {
                        Ok(_) => info!(entity_type, "Action ok"),
                        Err(e) => warn!(entity_type, error = %e, "Action failed"),
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        info!(entity_type, "Shutdown");
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// A type-safe client for interacting with a `ResourceActor`.
///
/// Cloning is cheap: the client holds a request sender and a state receiver.
pub struct ResourceClient<T: ActorEntity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
    state: watch::Receiver<T::Snapshot>,
}

impl<T: ActorEntity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: ActorEntity> ResourceClient<T> {
    pub fn new(
        sender: mpsc::Sender<ResourceRequest<T>>,
        state: watch::Receiver<T::Snapshot>,
    ) -> Self {
        Self { sender, state }
    }

    /// The most recently published state. Never waits on the actor.
    pub fn current(&self) -> T::Snapshot {
        self.state.borrow().clone()
    }

    /// A fresh receiver for observers that want to await changes.
    pub fn subscribe(&self) -> watch::Receiver<T::Snapshot> {
        self.state.clone()
    }

    /// The state after every request queued before this one has settled.
    pub async fn get(&self) -> Result<T::Snapshot, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ResourceRequest::Get { respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn perform_action(&self, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ResourceRequest::Action { action, respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
