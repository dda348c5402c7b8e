use thiserror::Error;

use crate::{
    db_types::{CompetitionStatus, Draw, StorageFile},
    traits::{DrawVerification, PayoutRunResult},
};

/// The back-office procedures: draw execution and verification, payout runs, and storage-file usage checks.
#[allow(async_fn_in_trait)]
pub trait MaintenanceOperations {
    /// Draws a winner for the competition: picks a uniformly random sold ticket, records the draw with an audit
    /// seal, and moves the competition to `Drawn`. A competition can be drawn exactly once; the unique constraint
    /// on the draws table backstops that.
    async fn execute_draw(&self, competition_id: i64) -> Result<Draw, MaintenanceError>;

    /// Re-checks a recorded draw: recomputes the seal, confirms the winning ticket exists and belongs to the
    /// recorded winner, and confirms the sold counter matches the ticket count.
    async fn verify_draw(&self, competition_id: i64) -> Result<DrawVerification, MaintenanceError>;

    /// Marks every `Requested` withdrawal as `Paid`, stamping the processing time. Per-row failures are collected
    /// into the result rather than aborting the run.
    async fn process_pending_payouts(&self) -> Result<PayoutRunResult, MaintenanceError>;

    async fn register_file(&self, path: &str) -> Result<StorageFile, MaintenanceError>;

    /// Storage files referenced by no competition.
    async fn check_file_usage(&self) -> Result<Vec<StorageFile>, MaintenanceError>;
}

#[derive(Debug, Clone, Error)]
pub enum MaintenanceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested competition {0} does not exist")]
    CompetitionNotFound(i64),
    #[error("Competition {0} has already been drawn")]
    AlreadyDrawn(i64),
    #[error("Competition {0} is {1} and cannot be drawn")]
    NotDrawable(i64, CompetitionStatus),
    #[error("Competition {0} has no sold tickets to draw from")]
    NoTicketsSold(i64),
    #[error("No draw has been recorded for competition {0}")]
    DrawNotFound(i64),
    #[error("A file with path '{0}' is already registered")]
    DuplicateFile(String),
}

impl From<sqlx::Error> for MaintenanceError {
    fn from(e: sqlx::Error) -> Self {
        MaintenanceError::DatabaseError(e.to_string())
    }
}
