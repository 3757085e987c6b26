//! Wire and view-model types for the backend REST API.
//!
//! Response types are deliberately lenient: the backend omits or nulls
//! fields freely, and some endpoints have more than one response shape.

use std::fmt;

use cafe_origen_core::{Price, ProductId, UserId};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Access Token
// =============================================================================

/// Bearer token issued by the backend on login or registration.
///
/// Held as a [`SecretString`] so it is zeroized on drop and redacted in
/// `Debug`. It serializes as a plain string because it lives in the session.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for AccessToken {}

impl Serialize for AccessToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose_secret())
    }
}

impl<'de> Deserialize<'de> for AccessToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Image URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub img: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    pub price: Decimal,
    #[serde(default, deserialize_with = "string_or_number")]
    pub stock: Option<String>,
}

impl Product {
    /// Unit price in the shop currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::eur(self.price)
    }

    /// Storefront link to the product detail page.
    #[must_use]
    pub fn link(&self) -> String {
        format!("/products/{}", self.id)
    }
}

/// Product detail responses come as a one-element array or a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_first(self) -> Option<T> {
        match self {
            Self::Many(items) => items.into_iter().next(),
            Self::One(item) => Some(item),
        }
    }
}

/// Product fields sent when creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub brand: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
}

/// Response to a product creation.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreated {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub product: Option<Product>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FavoritesResponse {
    #[serde(default)]
    pub favorite_products: Vec<Product>,
}

/// Response to a favorite toggle.
///
/// The backend deletes an existing favorite instead of adding a duplicate;
/// `updated_favorite` is only present when the product was added.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteToggle {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub updated_favorite: Option<Vec<ProductId>>,
}

impl FavoriteToggle {
    /// Whether the toggle added the product (as opposed to removing it).
    #[must_use]
    pub const fn added(&self) -> bool {
        self.updated_favorite.is_some()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the visitor's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub img: Option<String>,
}

impl CartItem {
    /// Unit price in the shop currency.
    #[must_use]
    pub const fn price(&self) -> Price {
        Price::eur(self.unit_price)
    }

    /// Unit price times quantity, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price().checked_times(self.quantity)
    }
}

/// Cart rows arrive either as cart lines or as plain product objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartRow {
    Line {
        product_id: ProductId,
        #[serde(default)]
        product_name: Option<String>,
        #[serde(default)]
        product_price: Option<Decimal>,
        #[serde(default)]
        quantity: Option<u32>,
        #[serde(default)]
        img: Option<String>,
    },
    Product {
        id: ProductId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        price: Option<Decimal>,
        #[serde(default)]
        quantity: Option<u32>,
        #[serde(default)]
        img: Option<String>,
    },
}

impl<'de> Deserialize<'de> for CartItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let item = match CartRow::deserialize(deserializer)? {
            CartRow::Line {
                product_id,
                product_name,
                product_price,
                quantity,
                img,
            } => Self {
                product_id,
                name: product_name.unwrap_or_else(|| "Unknown product".to_string()),
                unit_price: product_price.unwrap_or_default(),
                quantity: quantity.unwrap_or(1),
                img,
            },
            CartRow::Product {
                id,
                name,
                price,
                quantity,
                img,
            } => Self {
                product_id: id,
                name: name.unwrap_or_else(|| "Unknown product".to_string()),
                unit_price: price.unwrap_or_default(),
                quantity: quantity.unwrap_or(1),
                img,
            },
        };
        Ok(item)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartResponse {
    #[serde(default)]
    pub shopping_cart_products: Vec<CartItem>,
}

/// Cart lines with their decimal total.
#[derive(Debug, Clone, Default)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub total: Price,
}

impl CartSummary {
    /// Compute the total of the given lines.
    ///
    /// Returns `None` if a line total or the cart total overflows.
    #[must_use]
    pub fn new(items: Vec<CartItem>) -> Option<Self> {
        let line_totals = items
            .iter()
            .map(CartItem::line_total)
            .collect::<Option<Vec<_>>>()?;
        let total = Price::checked_sum(line_totals)?;
        Some(Self { items, total })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |count, i| count.saturating_add(i.quantity))
    }

    /// Find the line for a product.
    #[must_use]
    pub fn find(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }
}

/// What "add to cart" ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAddOutcome {
    /// The product was not in the cart and was added with quantity 1.
    Added,
    /// The product was already in the cart; its quantity was raised.
    Incremented { quantity: u32 },
}

// =============================================================================
// Checkout
// =============================================================================

/// One line sent with a checkout request.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

/// Body of `POST /create-checkout-session`.
///
/// The endpoint prices a single line item, so a multi-line cart is sent as
/// one summary line for the cart total. `items` carries the full breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    pub items: Vec<CheckoutLine>,
}

impl CheckoutRequest {
    /// Build the request for a cart. Returns `None` for an empty cart.
    #[must_use]
    pub fn from_cart(cart: &CartSummary) -> Option<Self> {
        let items: Vec<CheckoutLine> = cart
            .items
            .iter()
            .map(|item| CheckoutLine {
                product_id: item.product_id,
                name: item.name.clone(),
                price: item.price().rounded(),
                quantity: item.quantity,
            })
            .collect();

        match cart.items.as_slice() {
            [] => None,
            [single] => Some(Self {
                name: single.name.clone(),
                price: single.price().rounded(),
                quantity: single.quantity,
                items,
            }),
            _ => Some(Self {
                name: format!("Café de Origen order ({} items)", cart.item_count()),
                price: cart.total.rounded(),
                quantity: 1,
                items,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckoutResponse {
    pub checkout_url: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

/// A user profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "id")]
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Response to login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: AccessToken,
    pub user: UserProfile,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Fields sent on registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub user_name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub is_active: bool,
}

/// Fields sent on a profile update. The password is only sent when changed.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Response to a profile update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdated {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

// =============================================================================
// Misc
// =============================================================================

/// A bare `{msg}` or `{message}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiMessage {
    /// The acknowledgement text, if the backend sent one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.msg.as_deref().or(self.message.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelloResponse {
    pub message: String,
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stock is a string column in the backend but some rows carry a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stock {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Stock>::deserialize(deserializer)?.map(|s| match s {
        Stock::Text(t) => t,
        Stock::Number(n) => n.to_string(),
    }))
}
