//! Storefront client: product listing, a persisted cart, idempotent
//! checkout against the order service and order status polling.

pub mod cart;
pub mod checkout;
pub mod client;
pub mod config;
pub mod domain;
pub mod logging;
pub mod poller;
pub mod render;
