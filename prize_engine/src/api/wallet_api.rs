use chrono::Duration;
use log::*;
use pcs_common::Pence;

use crate::{
    db_types::{NewWalletCredit, ReferralAttribution, WalletCredit, Withdrawal},
    traits::{WalletApiError, WalletManagement, WalletSummary},
};

/// Wallet credit, withdrawals and referral attribution.
pub struct WalletApi<B> {
    db: B,
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub async fn wallet(&self, customer_id: &str) -> Result<WalletSummary, WalletApiError> {
        self.db.wallet_summary(customer_id).await
    }

    pub async fn award_credit(&self, credit: NewWalletCredit) -> Result<WalletCredit, WalletApiError> {
        self.db.award_credit(credit).await
    }

    pub async fn request_withdrawal(
        &self,
        customer_id: &str,
        amount: Pence,
    ) -> Result<Withdrawal, WalletApiError> {
        let withdrawal = self.db.request_withdrawal(customer_id, amount).await?;
        debug!("💼️ Withdrawal #{} of {amount} recorded for {customer_id}", withdrawal.id);
        Ok(withdrawal)
    }

    pub async fn attribute_referral(
        &self,
        customer_id: &str,
        code: &str,
        validity: Duration,
    ) -> Result<ReferralAttribution, WalletApiError> {
        let attribution = self.db.attribute_referral(customer_id, code, validity).await?;
        debug!("💼️ Referral attribution for {customer_id}: code '{}' until {}", attribution.code, attribution.expires_at);
        Ok(attribution)
    }

    pub async fn referral(&self, customer_id: &str) -> Result<Option<ReferralAttribution>, WalletApiError> {
        self.db.fetch_referral(customer_id).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
