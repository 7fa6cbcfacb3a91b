//! Checkout request records.
//!
//! These mirror the body EPCC expects under `data` when converting a cart
//! into an order. Required fields are checked by [`CheckoutRequest::validate`]
//! before anything is sent upstream.

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Errors found while validating a checkout request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// A required field is empty or whitespace.
    #[error("{0} is required")]
    MissingField(String),
    /// Country must be a two-letter ISO 3166-1 code.
    #[error("{0} must be a two-letter country code")]
    InvalidCountry(String),
}

/// The customer placing the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Full display name.
    pub name: String,
    /// Contact email.
    pub email: Email,
}

/// A postal address used for billing or shipping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub line_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postcode: String,
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
    /// Delivery instructions (shipping only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Address {
    fn validate(&self, prefix: &str) -> Result<(), CheckoutError> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("line_1", &self.line_1),
            ("city", &self.city),
            ("postcode", &self.postcode),
            ("country", &self.country),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingField(format!("{prefix}.{name}")));
            }
        }

        let country = self.country.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::InvalidCountry(format!("{prefix}.country")));
        }
        Ok(())
    }
}

/// Everything needed to turn a cart into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub billing_address: Address,
    pub shipping_address: Address,
}

impl CheckoutRequest {
    /// Build a request that ships to the billing address.
    ///
    /// The customer name is derived from the address names.
    #[must_use]
    pub fn shipping_to_billing(email: Email, address: Address) -> Self {
        let name = format!("{} {}", address.first_name.trim(), address.last_name.trim());
        let billing_address = Address {
            instructions: None,
            phone_number: None,
            ..address.clone()
        };
        Self {
            customer: Customer { name, email },
            billing_address,
            shipping_address: address,
        }
    }

    /// Check required fields on the customer and both addresses.
    ///
    /// # Errors
    ///
    /// Returns the first missing or malformed field.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.customer.name.trim().is_empty() {
            return Err(CheckoutError::MissingField("customer.name".to_string()));
        }
        self.billing_address.validate("billing_address")?;
        self.shipping_address.validate("shipping_address")
    }
}
