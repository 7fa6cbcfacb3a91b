//! EPCC storefront library.
//!
//! Shopper sessions (token, cart, checkout, catalog) over the Elastic Path
//! Commerce Cloud shopper API, plus the JSON HTTP surface that drives them
//! per browser session.
//!
//! # Modules
//!
//! - [`epcc`] - REST client and implicit-grant token lifecycle
//! - [`session`] - cart, checkout and product listing state
//! - [`storage`] - injected key/value stores for persisted records
//! - [`routes`] - axum handlers and the application router

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod epcc;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;

pub use routes::app;
