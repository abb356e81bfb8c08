//! Operations understood by the cart actor.
//!
//! Everything except [`CartAction::ClearError`] and [`CartAction::SwitchMode`] is a
//! mutating operation: it clears `error`, raises `loading` for its duration and
//! records its failure. See [`CartStore`](super::CartStore).

use crate::model::{CartBinding, LineId, Product};

#[derive(Debug, Clone)]
pub enum CartAction {
    /// Adds `quantity` of `product`, merging into an existing line for the same product.
    AddItem {
        product: Product,
        quantity: u32,
        selected_size: Option<String>,
        selected_color: Option<String>,
    },
    /// Sets a line's quantity. A quantity of zero or less removes the line.
    UpdateItem { item_id: LineId, quantity: i64 },
    RemoveItem(LineId),
    ClearCart,
    /// Re-reads the authoritative copy.
    Reload,
    ClearError,
    /// Selects the persistence for a session transition and hydrates from it.
    SwitchMode(CartBinding),
}
