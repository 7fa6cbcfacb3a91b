//! Order lifecycle statuses reported by EPCC.
//!
//! Unknown values deserialize to `Other` so a new upstream status never
//! breaks order parsing.

use serde::{Deserialize, Serialize};

/// Overall order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Incomplete,
    Processing,
    Complete,
    Cancelled,
    #[serde(other)]
    Other,
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Authorized,
    PartiallyAuthorized,
    Paid,
    PartiallyPaid,
    Refunded,
    #[serde(other)]
    Other,
}

impl PaymentStatus {
    /// Whether the order has been paid in full.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Order shipping status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    #[default]
    Unfulfilled,
    Fulfilled,
    #[serde(other)]
    Other,
}
