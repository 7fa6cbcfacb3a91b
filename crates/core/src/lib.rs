//! EPCC Storefront Core - Shared domain types.
//!
//! This crate provides common types used across the storefront components:
//! - `storefront` - EPCC client, shopper sessions and the JSON HTTP surface
//! - `cli` - Command-line shopper backed by a local state file
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, order statuses and checkout records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
