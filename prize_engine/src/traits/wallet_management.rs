use chrono::Duration;
use pcs_common::Pence;
use thiserror::Error;

use crate::{
    db_types::{NewWalletCredit, ReferralAttribution, WalletCredit, Withdrawal},
    traits::WalletSummary,
};

/// Wallet credit, withdrawals and referral attribution.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// The customer's spendable balance (unexpired credit only) plus the underlying credit entries.
    async fn wallet_summary(&self, customer_id: &str) -> Result<WalletSummary, WalletApiError>;

    async fn award_credit(&self, credit: NewWalletCredit) -> Result<WalletCredit, WalletApiError>;

    /// Requests a withdrawal, debiting the customer's unexpired credit (oldest expiry first) in the same
    /// transaction. Rejected outright if the unexpired balance is less than `amount`.
    async fn request_withdrawal(&self, customer_id: &str, amount: Pence) -> Result<Withdrawal, WalletApiError>;

    /// Records first-touch referral attribution with the given validity window. While an unexpired attribution
    /// exists the call is a no-op returning the existing row; once expired, the new code takes over.
    async fn attribute_referral(
        &self,
        customer_id: &str,
        code: &str,
        validity: Duration,
    ) -> Result<ReferralAttribution, WalletApiError>;

    /// The customer's current attribution, if any unexpired one exists.
    async fn fetch_referral(&self, customer_id: &str) -> Result<Option<ReferralAttribution>, WalletApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Requested {requested} but only {available} of unexpired credit is available")]
    InsufficientBalance { requested: Pence, available: Pence },
    #[error("{0} is not a valid amount for this operation")]
    InvalidAmount(Pence),
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        WalletApiError::DatabaseError(e.to_string())
    }
}
