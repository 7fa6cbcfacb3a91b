//! Typed records for the EPCC shopper API.
//!
//! Only the fields the storefront reads are modelled; unknown fields are
//! ignored. Optional upstream fields are `Option` or defaulted so a sparse
//! response still parses.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use epcc_storefront_core::{
    Address, CartId, CartItemId, FileId, Money, OrderId, OrderStatus, PaymentStatus, ProductId,
    ShippingStatus, TransactionId,
};

// =============================================================================
// Envelopes
// =============================================================================

/// The `{"data": ...}` wrapper around every EPCC resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}

/// A `{"data": ...}` wrapper whose payload may be missing.
///
/// EPCC omits `data` when checkout or payment did not produce a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct MaybeData<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// A `{"id", "type"}` relationship pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

// =============================================================================
// Authentication
// =============================================================================

/// An implicit-grant access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub access_token: SecretString,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expiry as Unix epoch seconds.
    pub expires: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

// The record is persisted to the shopper's own store, so the bearer value is
// written out in full.
fn serialize_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl AccessToken {
    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires
    }

    /// Whether the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the record carries a bearer value at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.access_token.expose_secret().is_empty()
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// A server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub meta: CartMeta,
    #[serde(default)]
    pub relationships: CartRelationships,
}

impl Cart {
    /// Formatted total including tax, if EPCC priced the cart.
    #[must_use]
    pub fn total_with_tax(&self) -> Option<Cow<'_, str>> {
        self.meta
            .display_price
            .as_ref()
            .and_then(|p| p.with_tax.as_ref())
            .map(Money::display)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMeta {
    #[serde(default)]
    pub display_price: Option<CartDisplayPrice>,
}

/// Aggregate cart prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDisplayPrice {
    #[serde(default)]
    pub with_tax: Option<Money>,
    #[serde(default)]
    pub without_tax: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub without_discount: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRelationships {
    #[serde(default)]
    pub items: Option<RelationshipList>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipList {
    #[serde(default)]
    pub data: Option<Vec<ResourceRef>>,
}

/// A line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub meta: CartItemMeta,
}

impl CartItem {
    fn prices(&self) -> Option<&UnitValue> {
        let display = self.meta.display_price.as_ref()?;
        display.with_tax.as_ref().or(display.without_tax.as_ref())
    }

    /// Formatted unit price, preferring the tax-inclusive figure.
    #[must_use]
    pub fn unit_price(&self) -> Option<Cow<'_, str>> {
        self.prices().map(|p| p.unit.display())
    }

    /// Formatted line total, preferring the tax-inclusive figure.
    #[must_use]
    pub fn line_price(&self) -> Option<Cow<'_, str>> {
        self.prices().map(|p| p.value.display())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemMeta {
    #[serde(default)]
    pub display_price: Option<CartItemDisplayPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemDisplayPrice {
    #[serde(default)]
    pub with_tax: Option<UnitValue>,
    #[serde(default)]
    pub without_tax: Option<UnitValue>,
}

/// A unit price and the line value it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitValue {
    pub unit: Money,
    pub value: Money,
}

/// Response of `GET /v2/carts/{id}?include=items`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartWithItems {
    pub data: Cart,
    #[serde(default)]
    pub included: Option<CartIncluded>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartIncluded {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartWithItems {
    /// Split into the cart and its included items.
    #[must_use]
    pub fn into_parts(self) -> (Cart, Vec<CartItem>) {
        (self.data, self.included.map(|i| i.items).unwrap_or_default())
    }
}

/// Body of `POST /v2/carts`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCart {
    pub name: String,
}

/// Body of `POST /v2/carts/{id}/items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCartItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Product to add.
    pub id: ProductId,
    pub quantity: u32,
}

impl NewCartItem {
    #[must_use]
    pub const fn product(id: ProductId, quantity: u32) -> Self {
        Self {
            kind: "cart_item",
            id,
            quantity,
        }
    }
}

/// Body of `PUT /v2/carts/{id}/items/{item_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemQuantity {
    pub id: CartItemId,
    pub quantity: u32,
}

// =============================================================================
// Order Types
// =============================================================================

/// An order created from a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Missing only when EPCC failed to create the order.
    #[serde(default)]
    pub id: Option<OrderId>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment: PaymentStatus,
    #[serde(default)]
    pub shipping: ShippingStatus,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub meta: OrderMeta,
}

impl Order {
    /// Formatted order total including tax.
    #[must_use]
    pub fn total_with_tax(&self) -> Option<Cow<'_, str>> {
        self.meta
            .display_price
            .as_ref()
            .and_then(|p| p.with_tax.as_ref())
            .map(Money::display)
    }
}

/// Customer details echoed back on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMeta {
    #[serde(default)]
    pub display_price: Option<OrderDisplayPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDisplayPrice {
    #[serde(default)]
    pub with_tax: Option<Money>,
    #[serde(default)]
    pub without_tax: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
}

/// Body of `POST /v2/orders/{id}/payments` for the manual gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ManualPayment {
    pub gateway: &'static str,
    pub method: &'static str,
}

impl Default for ManualPayment {
    fn default() -> Self {
        Self {
            gateway: "manual",
            method: "purchase",
        }
    }
}

/// A payment transaction recorded against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub attributes: ProductAttributes,
    #[serde(default)]
    pub relationships: ProductRelationships,
    #[serde(default)]
    pub meta: ProductMeta,
}

impl Product {
    /// ID of the product's main image file, if linked.
    #[must_use]
    pub fn main_image_id(&self) -> Option<&str> {
        self.relationships
            .main_image
            .as_ref()
            .and_then(|r| r.data.as_ref())
            .map(|r| r.id.as_str())
    }

    /// Formatted display price, preferring the tax-exclusive figure.
    #[must_use]
    pub fn display_price(&self) -> Option<Cow<'_, str>> {
        let prices = self.meta.display_price.as_ref()?;
        prices
            .without_tax
            .as_ref()
            .or(prices.with_tax.as_ref())
            .map(Money::display)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRelationships {
    #[serde(default)]
    pub main_image: Option<SingleRelationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRelationship {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMeta {
    #[serde(default)]
    pub display_price: Option<ProductDisplayPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDisplayPrice {
    #[serde(default)]
    pub with_tax: Option<Money>,
    #[serde(default)]
    pub without_tax: Option<Money>,
}

/// A file resource used as a product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: FileId,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub link: Option<FileLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub href: String,
}

/// Response of `GET /catalog/products?include=main_image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductList {
    #[serde(default)]
    pub data: Vec<Product>,
    #[serde(default)]
    pub included: Option<ProductIncluded>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductIncluded {
    #[serde(default)]
    pub main_images: Vec<ProductImage>,
}

impl ProductList {
    /// Split into products and their included main images.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Product>, Vec<ProductImage>) {
        (
            self.data,
            self.included.map(|i| i.main_images).unwrap_or_default(),
        )
    }
}

/// Resolve a product's main image link from the included images.
#[must_use]
pub fn main_image_url<'a>(product: &Product, images: &'a [ProductImage]) -> Option<&'a str> {
    let image_id = product.main_image_id()?;
    images
        .iter()
        .find(|img| img.id.as_str() == image_id)
        .and_then(|img| img.link.as_ref())
        .map(|link| link.href.as_str())
}
