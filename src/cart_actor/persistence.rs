//! Where the authoritative cart lives.
//!
//! The cart store holds exactly one [`CartPersistence`] at a time, chosen when the
//! session changes:
//!
//! - [`LocalCartPersistence`] for guests: the cart is mutated in memory and the whole
//!   `{items, total}` snapshot is written to the durable `cart` entry.
//! - [`RemoteCartPersistence`] for signed-in shoppers: every write goes to the cart
//!   service and is followed by [`RemoteCartPersistence::reconcile`], so the local
//!   copy is always the server's.

use super::CartError;
use crate::gateway::{AddItemRequest, CartGateway};
use crate::model::{CartLineItem, CartSnapshot, CartState, LineId};
use crate::storage::{load_json, save_json, DurableStore, CART_KEY};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Strategy for reading and writing the authoritative cart.
///
/// Every method receives the in-memory cart and leaves it matching the authoritative
/// copy on success.
#[async_trait]
pub trait CartPersistence: Send + Sync {
    /// Replaces the in-memory items with the authoritative copy.
    async fn load(&self, cart: &mut CartState) -> Result<(), CartError>;

    async fn add(&self, cart: &mut CartState, line: CartLineItem) -> Result<(), CartError>;

    async fn update(&self, cart: &mut CartState, item_id: &LineId, quantity: u32)
        -> Result<(), CartError>;

    async fn remove(&self, cart: &mut CartState, item_id: &LineId) -> Result<(), CartError>;

    /// Empties the authoritative copy. The caller resets the in-memory cart
    /// whatever the outcome.
    async fn clear(&self) -> Result<(), CartError>;
}

/// Guest cart kept in durable storage.
pub struct LocalCartPersistence {
    store: Arc<dyn DurableStore>,
}

impl LocalCartPersistence {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    // The in-memory mutation has already happened; a failed write is reported but
    // not rolled back.
    async fn persist(&self, cart: &CartState) -> Result<(), CartError> {
        save_json(self.store.as_ref(), CART_KEY, &cart.to_snapshot())
            .await
            .map_err(|e| {
                warn!(error = %e, "Could not save guest cart");
                CartError::from(e)
            })
    }
}

#[async_trait]
impl CartPersistence for LocalCartPersistence {
    async fn load(&self, cart: &mut CartState) -> Result<(), CartError> {
        let snapshot: Option<CartSnapshot> = load_json(self.store.as_ref(), CART_KEY).await?;
        let items = snapshot.map(|s| s.items).unwrap_or_default();
        debug!(lines = items.len(), "Loaded guest cart");
        cart.set_items(items);
        Ok(())
    }

    async fn add(&self, cart: &mut CartState, line: CartLineItem) -> Result<(), CartError> {
        cart.merge_line(line);
        self.persist(cart).await
    }

    async fn update(
        &self,
        cart: &mut CartState,
        item_id: &LineId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if !cart.set_quantity(item_id, quantity) {
            return Err(CartError::ItemNotFound(item_id.clone()));
        }
        self.persist(cart).await
    }

    async fn remove(&self, cart: &mut CartState, item_id: &LineId) -> Result<(), CartError> {
        if !cart.remove_line(item_id) {
            return Err(CartError::ItemNotFound(item_id.clone()));
        }
        self.persist(cart).await
    }

    async fn clear(&self) -> Result<(), CartError> {
        Ok(self.store.remove(CART_KEY).await?)
    }
}

/// Signed-in cart held by the cart service.
pub struct RemoteCartPersistence {
    gateway: Arc<dyn CartGateway>,
}

impl RemoteCartPersistence {
    pub fn new(gateway: Arc<dyn CartGateway>) -> Self {
        Self { gateway }
    }

    /// Fetches the server cart and replaces the in-memory items with it.
    ///
    /// The server's total is not trusted; the cart recomputes its own.
    pub async fn reconcile(&self, cart: &mut CartState) -> Result<(), CartError> {
        let snapshot = self.gateway.fetch_cart().await?;
        cart.set_items(snapshot.items);
        if cart.total() != snapshot.total {
            debug!(server = %snapshot.total, local = %cart.total(), "Server total differs");
        }
        Ok(())
    }
}

#[async_trait]
impl CartPersistence for RemoteCartPersistence {
    async fn load(&self, cart: &mut CartState) -> Result<(), CartError> {
        self.reconcile(cart).await
    }

    async fn add(&self, cart: &mut CartState, line: CartLineItem) -> Result<(), CartError> {
        let request = AddItemRequest::new(
            line.product.id,
            line.quantity,
            line.selected_size.as_deref(),
            line.selected_color.as_deref(),
        );
        self.gateway.add_item(&request).await?;
        self.reconcile(cart).await
    }

    async fn update(
        &self,
        cart: &mut CartState,
        item_id: &LineId,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.gateway.update_item(item_id, quantity).await?;
        self.reconcile(cart).await
    }

    async fn remove(&self, cart: &mut CartState, item_id: &LineId) -> Result<(), CartError> {
        self.gateway.remove_item(item_id).await?;
        self.reconcile(cart).await
    }

    async fn clear(&self) -> Result<(), CartError> {
        Ok(self.gateway.clear_cart().await?)
    }
}
