//! # Mock Framework
//!
//! Utilities for testing client wrappers in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver, then [`expect_action`]
//! or [`expect_get`] to inspect requests and answer them by hand. For scripted
//! responses use [`MockClient`].

use crate::framework::{ActorEntity, FrameworkError, ResourceClient, ResourceRequest, Response};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected request and the response the mock should give.
enum Expectation<T: ActorEntity> {
    Get {
        response: Result<T::Snapshot, FrameworkError>,
    },
    Action {
        response: Result<T::ActionResult, FrameworkError>,
    },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

fn push<T: ActorEntity>(expectations: &Expectations<T>, expectation: Expectation<T>) {
    expectations
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(expectation);
}

/// A mock client with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mut mock = MockClient::<CartStore>::new(CartState::default());
/// mock.expect_action().return_ok(CartState::default());
///
/// let client = CartClient::new(mock.client());
/// client.clear_cart().await?;
/// mock.verify();
/// ```
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    state: watch::Sender<T::Snapshot>,
    expectations: Expectations<T>,
    actions: Arc<Mutex<Vec<String>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations, publishing `initial` as its state.
    pub fn new(initial: T::Snapshot) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let (state, state_rx) = watch::channel(initial);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let actions = Arc::new(Mutex::new(Vec::new()));
        let expectations_clone = expectations.clone();
        let actions_clone = actions.clone();

        // Spawn background task to handle requests
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();

                match (request, expectation) {
                    (ResourceRequest::Get { respond_to }, Some(Expectation::Get { response })) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Action { action, respond_to },
                        Some(Expectation::Action { response }),
                    ) => {
                        actions_clone
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(format!("{action:?}"));
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender, state_rx),
            state,
            expectations,
            actions,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Publishes a state, as the real actor would after an action.
    pub fn publish(&self, snapshot: T::Snapshot) {
        self.state.send_replace(snapshot);
    }

    /// Expects a `get` request.
    pub fn expect_get(&mut self) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Expects an `action` request.
    pub fn expect_action(&mut self) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// The `Debug` rendering of every action received so far.
    pub fn received_actions(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        assert!(remaining == 0, "Not all expectations were met. {remaining} remaining");
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
}

impl<T: ActorEntity> GetExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T::Snapshot) {
        push(&self.expectations, Expectation::Get { response: Ok(value) });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        push(&self.expectations, Expectation::Get { response: Err(error) });
    }
}

/// Builder for `action` expectations.
pub struct ActionExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
}

impl<T: ActorEntity> ActionExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, result: T::ActionResult) {
        push(&self.expectations, Expectation::Action { response: Ok(result) });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        push(&self.expectations, Expectation::Action { response: Err(error) });
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// Creates a mock client and a receiver for asserting requests.
///
/// # Testing Strategy
/// When testing a *client wrapper* (e.g. `CartClient`) we don't want a real actor.
/// The returned client sends into a channel the test controls, so the test can inspect
/// the exact action and answer it deterministically (success, failure, delay).
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
    initial: T::Snapshot,
) -> (
    ResourceClient<T>,
    mpsc::Receiver<ResourceRequest<T>>,
    watch::Sender<T::Snapshot>,
) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let (state, state_rx) = watch::channel(initial);
    (ResourceClient::new(sender, state_rx), receiver, state)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<Response<T::Snapshot>> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Action, Response<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { action, respond_to }) => Some((action, respond_to)),
        _ => None,
    }
}
