//! Cart lines and the cart read model.
//!
//! [`CartState`] keeps `items` and `total` private so the total can only ever be the
//! sum of `price * quantity` over the lines: every method that touches the lines
//! recomputes it.

use crate::model::{Product, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Largest quantity the cart service accepts on a single line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Identifier of a cart line.
///
/// Server carts number their lines; guest lines are derived from the product id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LineId(pub String);

impl LineId {
    /// The client-assigned id of a guest line for `product_id`.
    pub fn guest(product_id: ProductId) -> Self {
        Self(format!("guest-{product_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LineId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LineId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for LineId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LineId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Self::from(n),
            Repr::Text(s) => Self(s),
        })
    }
}

/// One entry in the cart: a product (plus optional variant) and a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: LineId,
    pub product: Product,
    pub quantity: u32,
    #[serde(default, deserialize_with = "non_blank")]
    pub selected_size: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub selected_color: Option<String>,
}

impl CartLineItem {
    /// A guest line; its id is derived from the product id.
    pub fn guest(
        product: Product,
        quantity: u32,
        selected_size: Option<String>,
        selected_color: Option<String>,
    ) -> Self {
        Self {
            id: LineId::guest(product.id),
            product,
            quantity,
            selected_size: normalize_variant(selected_size),
            selected_color: normalize_variant(selected_color),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Blank variant strings mean "no selection".
pub fn normalize_variant(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(normalize_variant(Option::<String>::deserialize(deserializer)?))
}

/// Wire and durable form of a cart: `{items, total}`.
///
/// The remote cart reports its total as `total_price`; either name is accepted.
/// The total is informational: [`CartState`] recomputes it from the items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartLineItem>,
    #[serde(default, alias = "total_price")]
    pub total: Decimal,
}

/// Which copy of the cart is authoritative right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartMode {
    /// The session has not resolved yet; no persistence is attached.
    #[default]
    Detached,
    /// Unauthenticated: durable local storage is authoritative.
    Guest,
    /// Authenticated: the remote cart service is authoritative.
    Remote,
}

impl Display for CartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Detached => "detached",
            Self::Guest => "guest",
            Self::Remote => "remote",
        })
    }
}

/// Which persistence the cart is attached to, and whose remote cart it is.
///
/// Two bindings in [`CartMode::Remote`] with different owners are different carts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartBinding {
    pub mode: CartMode,
    /// Id of the signed-in user the remote cart was loaded for.
    pub owner: Option<u64>,
}

impl CartBinding {
    pub fn guest() -> Self {
        CartMode::Guest.into()
    }

    pub fn remote(owner: u64) -> Self {
        Self {
            mode: CartMode::Remote,
            owner: Some(owner),
        }
    }
}

impl From<CartMode> for CartBinding {
    fn from(mode: CartMode) -> Self {
        Self { mode, owner: None }
    }
}

/// Read model published by the cart store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartState {
    items: Vec<CartLineItem>,
    total: Decimal,
    /// True while an operation is in flight.
    pub loading: bool,
    /// Last failure message; cleared when the next operation starts.
    pub error: Option<String>,
    pub mode: CartMode,
}

impl CartState {
    /// An empty cart attached in `mode`.
    pub fn with_mode(mode: CartMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product.id == product_id)
    }

    /// The line holding `product_id`, if any.
    pub fn get_cart_item(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    /// Replaces every line, e.g. after a reload.
    pub fn set_items(&mut self, items: Vec<CartLineItem>) {
        self.items = items;
        self.recompute_total();
    }

    /// Adds a line, merging into an existing line for the same product.
    ///
    /// Variants do not split lines: a second size of the same product lands on the
    /// first line and shares its quantity. The merged quantity is capped at
    /// [`MAX_LINE_QUANTITY`].
    pub fn merge_line(&mut self, line: CartLineItem) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product.id == line.product.id)
        {
            Some(existing) => {
                existing.quantity = (existing.quantity + line.quantity).min(MAX_LINE_QUANTITY);
            }
            None => self.items.push(line),
        }
        self.recompute_total();
    }

    /// Sets a line's quantity. Returns false when no such line exists.
    pub fn set_quantity(&mut self, id: &LineId, quantity: u32) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return false;
        };
        item.quantity = quantity;
        self.recompute_total();
        true
    }

    /// Removes a line. Returns false when no such line exists.
    pub fn remove_line(&mut self, id: &LineId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.recompute_total();
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute_total();
    }

    pub fn to_snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total: self.total,
        }
    }

    fn recompute_total(&mut self) {
        self.total = self.items.iter().map(CartLineItem::line_total).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, price: i64) -> Product {
        Product::new(id, format!("Product {id}"), Decimal::from(price))
    }

    #[test]
    fn test_merge_line_increments_existing_product() {
        let mut state = CartState::default();
        state.merge_line(CartLineItem::guest(product(1, 500), 2, None, None));
        state.merge_line(CartLineItem::guest(product(1, 500), 3, Some("M".into()), None));

        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items()[0].quantity, 5);
        assert_eq!(state.total(), Decimal::from(2500));
    }

    #[test]
    fn test_merge_line_caps_quantity() {
        let mut state = CartState::default();
        state.merge_line(CartLineItem::guest(product(1, 10), 90, None, None));
        state.merge_line(CartLineItem::guest(product(1, 10), 20, None, None));
        assert_eq!(state.items()[0].quantity, MAX_LINE_QUANTITY);
        assert_eq!(state.total(), Decimal::from(990));
    }

    #[test]
    fn test_total_tracks_every_change() {
        let mut state = CartState::default();
        state.merge_line(CartLineItem::guest(product(1, 500), 2, None, None));
        state.merge_line(CartLineItem::guest(product(2, 150), 1, None, None));
        assert_eq!(state.total(), Decimal::from(1150));

        assert!(state.set_quantity(&LineId::guest(ProductId(2)), 4));
        assert_eq!(state.total(), Decimal::from(1600));

        assert!(state.remove_line(&LineId::guest(ProductId(1))));
        assert_eq!(state.total(), Decimal::from(600));
        assert_eq!(state.item_count(), 4);

        state.clear();
        assert_eq!(state.total(), Decimal::ZERO);
    }

    #[test]
    fn test_missing_lines_are_reported() {
        let mut state = CartState::default();
        assert!(!state.set_quantity(&LineId::from("nope"), 2));
        assert!(!state.remove_line(&LineId::from("nope")));
    }

    #[test]
    fn test_lookups_by_product_id() {
        let mut state = CartState::default();
        state.merge_line(CartLineItem::guest(product(7, 10), 1, None, None));
        assert!(state.is_in_cart(ProductId(7)));
        assert!(!state.is_in_cart(ProductId(8)));
        assert_eq!(
            state.get_cart_item(ProductId(7)).map(|line| line.id.clone()),
            Some(LineId::from("guest-7"))
        );
    }

    #[test]
    fn test_remote_snapshot_accepts_numeric_ids_and_blank_variants() {
        let json = r#"{
            "id": 4,
            "items": [{
                "id": 31,
                "product": {"id": 9, "name": "Aviator", "price": "1200.00"},
                "product_id": 9,
                "quantity": 1,
                "selected_size": "",
                "selected_color": "Gold",
                "unit_price": "1200.00"
            }],
            "total_price": "1200.00",
            "is_empty": false
        }"#;
        let snapshot: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.items[0].id, LineId::from("31"));
        assert_eq!(snapshot.items[0].selected_size, None);
        assert_eq!(snapshot.items[0].selected_color.as_deref(), Some("Gold"));
        assert_eq!(snapshot.total, Decimal::from(1200));
    }

    #[test]
    fn test_guest_snapshot_survives_json() {
        let mut state = CartState::default();
        state.merge_line(CartLineItem::guest(product(1, 500), 2, Some("L".into()), None));
        let json = serde_json::to_string(&state.to_snapshot()).unwrap();
        let back: CartSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items, state.items());
        assert_eq!(back.total, Decimal::from(1000));
    }

    #[test]
    fn test_with_mode_starts_empty() {
        let state = CartState::with_mode(CartMode::Remote);
        assert_eq!(state.mode, CartMode::Remote);
        assert!(state.is_empty());
        assert_eq!(state.total(), Decimal::ZERO);
        assert!(!state.loading && state.error.is_none());
    }

    #[test]
    fn test_binding_from_mode_has_no_owner() {
        assert_eq!(CartBinding::from(CartMode::Guest), CartBinding::guest());
        assert_ne!(CartBinding::remote(1), CartBinding::remote(2));
        assert_eq!(CartBinding::remote(1).mode, CartMode::Remote);
    }
}
