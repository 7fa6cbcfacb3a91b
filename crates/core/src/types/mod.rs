//! Core types for the EPCC storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod checkout;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use checkout::{Address, CheckoutError, CheckoutRequest, Customer};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{EMPTY_TOTAL, Money};
pub use status::*;
