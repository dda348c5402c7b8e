//! The behaviour contracts that a storage backend must implement to power the platform.
//!
//! The engine's public APIs ([`crate::OrderFlowApi`], [`crate::CartApi`], [`crate::WalletApi`],
//! [`crate::MaintenanceApi`]) are generic over these traits, so the HTTP layer can be tested against mocks and the
//! production binary can run against [`crate::SqliteDatabase`] without either knowing the difference.

mod competition_management;
mod data_objects;
mod maintenance;
mod payment_gateway_database;
mod wallet_management;

pub use competition_management::{CompetitionApiError, CompetitionManagement};
pub use data_objects::{
    CheckoutOutcome,
    DrawCheck,
    DrawVerification,
    ExpirySweep,
    FailureOutcome,
    PayoutRunResult,
    RevealOutcome,
    SettlementOutcome,
    WalletSummary,
};
pub use maintenance::{MaintenanceError, MaintenanceOperations};
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
pub use wallet_management::{WalletApiError, WalletManagement};
