/// Snapshot of a catalog product, as embedded in a cart line.
///
/// The backend's product serializer is much richer than this; only the fields the
/// cart needs are kept, and unknown fields are ignored on the way in.
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price. Accepted as `"500.00"` or `500`.
    pub price: Decimal,
    #[serde(default, deserialize_with = "brand_name")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "image_refs")]
    pub images: Vec<String>,
    #[serde(default, alias = "ar_enabled", alias = "is_try_on_enabled")]
    pub is_ar_enabled: bool,
}

impl Product {
    /// Creates a Product with no brand, images or try-on support.
    ///
    /// # Arguments
    /// * `id` - Catalog identifier
    /// * `name` - Display name
    /// * `price` - Unit price
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            brand: None,
            images: Vec::new(),
            is_ar_enabled: false,
        }
    }
}

// Brands arrive either as a bare name or as the backend's `{id, name, slug, ...}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum BrandRepr {
    Name(String),
    Object { name: String },
}

fn brand_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let brand = Option::<BrandRepr>::deserialize(deserializer)?;
    Ok(brand
        .map(|b| match b {
            BrandRepr::Name(name) | BrandRepr::Object { name } => name,
        })
        .filter(|name| !name.is_empty()))
}

// Images arrive either as URLs or as `{image, alt_text, ...}` / `{url}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImageRepr {
    Url(String),
    Object {
        #[serde(alias = "url")]
        image: String,
    },
}

fn image_refs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let images = Option::<Vec<ImageRepr>>::deserialize(deserializer)?;
    Ok(images
        .unwrap_or_default()
        .into_iter()
        .map(|image| match image {
            ImageRepr::Url(url) | ImageRepr::Object { image: url } => url,
        })
        .collect())
}

/// Formats an amount the way the storefront shows prices: Indian Rupees, no decimals.
///
/// `format_price(Decimal::new(123456, 0))` renders `₹1,23,456`.
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    // Indian grouping: last three digits, then groups of two.
    let mut groups: Vec<&str> = Vec::new();
    let (mut head, tail) = digits.split_at(digits.len().saturating_sub(3));
    while head.len() > 2 {
        let (rest, group) = head.split_at(head.len() - 2);
        groups.push(group);
        head = rest;
    }
    if !head.is_empty() {
        groups.push(head);
    }
    groups.reverse();
    groups.push(tail);

    let sign = if negative { "-" } else { "" };
    format!("{sign}₹{}", groups.join(","))
}
