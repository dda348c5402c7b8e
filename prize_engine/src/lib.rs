//! Prize Competition Engine
//!
//! The engine contains the core business logic for the prize competition platform: orders and their reconciliation
//! with the payment gateway, ticket allocation, instant-win reveals, wallet credit, draws and payouts. It is
//! HTTP-agnostic; the server crate drives it through the public APIs.
//!
//! The crate is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Use the public API instead. The exception is the data types used in the database, which live in
//!    [`mod@db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`], [`CartApi`], [`WalletApi`], [`MaintenanceApi`]). Backends implement the
//!    traits in [`mod@traits`] to power these APIs; [`SqliteDatabase`] is the stock implementation.
//!
//! The engine also emits events on order settlement and failure. A simple actor framework ([`mod@events`]) lets
//! you hook into these and perform custom actions without touching the request path.

mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub mod test_utils;
pub mod traits;

pub use api::{
    cart_api::CartApi,
    cart_objects,
    competition_api::CompetitionApi,
    maintenance_api::MaintenanceApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    wallet_api::WalletApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
