//! [`ActorEntity`] implementation for the cart.
//!
//! `CartStore` owns the in-memory [`CartState`] and the current [`CartPersistence`].
//! Operations run one at a time on the cart actor, so responses are applied in call
//! order and no two writes to the same cart interleave.

use super::persistence::{CartPersistence, LocalCartPersistence, RemoteCartPersistence};
use super::{CartAction, CartError};
use crate::framework::{ActorEntity, StatePublisher};
use crate::gateway::CartGateway;
use crate::model::{CartBinding, CartLineItem, CartMode, CartState, MAX_LINE_QUANTITY};
use crate::storage::DurableStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Dependencies injected into the cart actor when it starts.
#[derive(Clone)]
pub struct CartContext {
    pub store: Arc<dyn DurableStore>,
    pub gateway: Arc<dyn CartGateway>,
}

impl CartContext {
    pub fn new(store: Arc<dyn DurableStore>, gateway: Arc<dyn CartGateway>) -> Self {
        Self { store, gateway }
    }
}

/// The cart entity. Starts empty and [`CartMode::Detached`].
#[derive(Default)]
pub struct CartStore {
    state: CartState,
    owner: Option<u64>,
    persistence: Option<Box<dyn CartPersistence>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one mutating operation inside the loading/error bracket.
    async fn mutate(
        &mut self,
        action: CartAction,
        publisher: &StatePublisher<CartState>,
    ) -> Result<CartState, CartError> {
        self.state.error = None;
        self.state.loading = true;
        publisher.publish(self.state.clone());

        let result = self.apply(action).await;

        self.state.loading = false;
        match result {
            Ok(()) => Ok(self.state.clone()),
            Err(e) => {
                warn!(mode = %self.state.mode, error = %e, "Cart operation failed");
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn apply(&mut self, action: CartAction) -> Result<(), CartError> {
        let Some(persistence) = self.persistence.as_deref() else {
            return Err(CartError::Detached);
        };
        let cart = &mut self.state;

        match action {
            CartAction::AddItem {
                product,
                quantity,
                selected_size,
                selected_color,
            } => {
                validate_quantity(quantity)?;
                info!(product_id = %product.id, quantity, "Adding to cart");
                let line = CartLineItem::guest(product, quantity, selected_size, selected_color);
                persistence.add(cart, line).await
            }
            CartAction::UpdateItem { item_id, quantity } if quantity <= 0 => {
                info!(%item_id, "Quantity dropped to zero, removing line");
                persistence.remove(cart, &item_id).await
            }
            CartAction::UpdateItem { item_id, quantity } => {
                let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                validate_quantity(quantity)?;
                info!(%item_id, quantity, "Updating cart line");
                persistence.update(cart, &item_id, quantity).await
            }
            CartAction::RemoveItem(item_id) => {
                info!(%item_id, "Removing cart line");
                persistence.remove(cart, &item_id).await
            }
            CartAction::ClearCart => {
                info!("Clearing cart");
                let result = persistence.clear().await;
                cart.clear();
                result
            }
            CartAction::Reload => persistence.load(cart).await,
            // Not mutations; handled before the bracket.
            CartAction::ClearError | CartAction::SwitchMode(_) => Ok(()),
        }
    }

    async fn switch_mode(
        &mut self,
        binding: CartBinding,
        ctx: &CartContext,
        publisher: &StatePublisher<CartState>,
    ) -> Result<CartState, CartError> {
        let CartBinding { mode, owner } = binding;
        if mode == self.state.mode && owner == self.owner {
            return Ok(self.state.clone());
        }
        info!(from = %self.state.mode, to = %mode, ?owner, "Switching cart mode");

        self.persistence = match mode {
            CartMode::Detached => None,
            CartMode::Guest => Some(Box::new(LocalCartPersistence::new(ctx.store.clone()))),
            CartMode::Remote => Some(Box::new(RemoteCartPersistence::new(ctx.gateway.clone()))),
        };
        self.owner = owner;
        // The previous copy is dropped from memory only. A guest cart stays in durable
        // storage and comes back when the session ends.
        self.state = CartState::with_mode(mode);

        if self.persistence.is_none() {
            return Ok(self.state.clone());
        }
        self.mutate(CartAction::Reload, publisher).await
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(CartError::Validation(format!(
            "Quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

#[async_trait]
impl ActorEntity for CartStore {
    type Snapshot = CartState;
    type Action = CartAction;
    type ActionResult = CartState;
    type Context = CartContext;
    type Error = CartError;

    fn snapshot(&self) -> CartState {
        self.state.clone()
    }

    async fn handle_action(
        &mut self,
        action: CartAction,
        ctx: &CartContext,
        publisher: &StatePublisher<CartState>,
    ) -> Result<CartState, CartError> {
        match action {
            CartAction::ClearError => {
                self.state.error = None;
                Ok(self.state.clone())
            }
            CartAction::SwitchMode(binding) => self.switch_mode(binding, ctx, publisher).await,
            mutation => self.mutate(mutation, publisher).await,
        }
    }
}
