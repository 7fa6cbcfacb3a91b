//! Shopper sessions driving the EPCC client.
//!
//! Each session owns its local state behind a `tokio::sync::RwLock` and
//! never holds that lock across a network call. Persisted identifiers (the
//! cart ID) live in the injected [`SessionStore`](crate::storage::SessionStore).
//!
//! Every operation clears the session's error on entry, records
//! `err.to_string()` on failure and returns the error to the caller.

mod cart;
mod checkout;
mod products;

pub use cart::{CartSession, CartSnapshot};
pub use checkout::{CheckoutPhase, CheckoutSession, CheckoutSnapshot, CompletedOrder};
pub use products::{ProductListing, ProductSnapshot, ProductView};

use std::sync::atomic::{AtomicUsize, Ordering};

use epcc_storefront_core::{CheckoutError, OrderId};
use thiserror::Error;

use crate::epcc::EpccError;
use crate::storage::StorageError;

/// Errors raised by shopper sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A cart operation ran before any cart was created.
    #[error("No cart found")]
    NoCart,

    /// Checkout ran with no cart to convert.
    #[error("No cart found. Please add items to your cart first.")]
    NoCartToCheckout,

    /// EPCC accepted checkout but returned no order ID.
    #[error("Failed to create order")]
    OrderCreationFailed,

    /// The order was created but the manual payment returned no transaction.
    #[error("Payment processing failed for order {order_id}")]
    PaymentFailed { order_id: OrderId },

    /// The checkout request is incomplete.
    #[error("Invalid checkout: {0}")]
    InvalidCheckout(#[from] CheckoutError),

    /// An order has already been placed; clear it first.
    #[error("Order already placed")]
    CheckoutComplete,

    /// A checkout is already being submitted.
    #[error("Checkout already in progress")]
    CheckoutInProgress,

    #[error(transparent)]
    Epcc(#[from] EpccError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Number of operations in flight. Each guard leaves on drop, so a cancelled
/// operation never leaves the count raised.
#[derive(Debug, Default)]
struct InFlight(AtomicUsize);

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(&self.0)
    }

    fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
