//! # Prize competition server
//!
//! The HTTP surface of the prize competition platform. It is responsible for:
//! * Receiving and authenticating asynchronous payment callbacks from the G2Pay gateway, and driving order
//!   reconciliation and ticket allocation through the engine.
//! * The storefront API: competition listings, cart validation, checkout, order reads, ticket reveals, wallet and
//!   referral endpoints.
//! * The admin API: competition management, draws, payout runs and storage-file audits, behind an API-key check.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod g2pay;
pub mod g2pay_routes;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
