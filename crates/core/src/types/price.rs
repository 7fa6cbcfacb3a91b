//! Monetary amounts as returned by EPCC.
//!
//! EPCC reports prices in the currency's minor unit (cents for USD) along
//! with a pre-formatted display string. The formatted string is what the
//! storefront shows; when EPCC leaves it out the amount is rendered from its
//! decimal value instead.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display string used when a cart has no priced total yet.
pub const EMPTY_TOTAL: &str = "$0.00";

/// Currencies priced without a fractional unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["JPY", "KRW", "VND", "CLP", "ISK", "HUF"];

/// A monetary amount with currency information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's minor unit (e.g., cents).
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Display string pre-formatted by EPCC (e.g., "$19.99").
    #[serde(default)]
    pub formatted: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: i64, currency: impl Into<String>, formatted: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            formatted: formatted.into(),
        }
    }

    /// Number of fractional digits for this currency.
    #[must_use]
    pub fn scale(&self) -> u32 {
        if ZERO_DECIMAL_CURRENCIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.currency))
        {
            0
        } else {
            2
        }
    }

    /// The amount in the currency's standard unit (dollars, not cents).
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.scale())
    }

    /// The display string, or `"<amount> <currency>"` when EPCC sent none.
    #[must_use]
    pub fn display(&self) -> Cow<'_, str> {
        if self.formatted.is_empty() {
            Cow::Owned(format!("{} {}", self.to_decimal(), self.currency))
        } else {
            Cow::Borrowed(&self.formatted)
        }
    }
}
