use log::*;

use crate::{
    db_types::{Draw, StorageFile},
    traits::{DrawVerification, MaintenanceError, MaintenanceOperations, PayoutRunResult},
};

/// The back-office surface: draws, payout runs and storage-file audits. Thin relays over the storage trait, with
/// operator-facing logging.
pub struct MaintenanceApi<B> {
    db: B,
}

impl<B> MaintenanceApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> MaintenanceApi<B>
where B: MaintenanceOperations
{
    pub async fn execute_draw(&self, competition_id: i64) -> Result<Draw, MaintenanceError> {
        let draw = self.db.execute_draw(competition_id).await?;
        info!(
            "🎲️ Draw complete for competition {competition_id}. Winning ticket #{}, seal {}",
            draw.winning_ticket_number,
            &draw.seal[..16.min(draw.seal.len())]
        );
        Ok(draw)
    }

    pub async fn verify_draw(&self, competition_id: i64) -> Result<DrawVerification, MaintenanceError> {
        self.db.verify_draw(competition_id).await
    }

    pub async fn process_pending_payouts(&self) -> Result<PayoutRunResult, MaintenanceError> {
        let result = self.db.process_pending_payouts().await?;
        if !result.errors.is_empty() {
            warn!("💸️ Payout run finished with {} errors", result.errors.len());
        }
        Ok(result)
    }

    pub async fn register_file(&self, path: &str) -> Result<StorageFile, MaintenanceError> {
        self.db.register_file(path).await
    }

    pub async fn check_file_usage(&self) -> Result<Vec<StorageFile>, MaintenanceError> {
        let unused = self.db.check_file_usage().await?;
        debug!("🗂️ {} unused storage files found", unused.len());
        Ok(unused)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
