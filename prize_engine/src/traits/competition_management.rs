use thiserror::Error;

use crate::db_types::{Competition, CompetitionStatus, NewCompetition, NewInstantPrize};

/// Catalogue access: the storefront listings and the authoritative reads behind cart validation.
#[allow(async_fn_in_trait)]
pub trait CompetitionManagement {
    /// Creates a competition in `Draft` status.
    async fn create_competition(&self, competition: NewCompetition) -> Result<Competition, CompetitionApiError>;

    async fn set_competition_status(
        &self,
        competition_id: i64,
        status: CompetitionStatus,
    ) -> Result<Competition, CompetitionApiError>;

    async fn fetch_competition(&self, competition_id: i64) -> Result<Option<Competition>, CompetitionApiError>;

    async fn fetch_competition_by_slug(&self, slug: &str) -> Result<Option<Competition>, CompetitionApiError>;

    /// All competitions in `Active` status, for the storefront listing page.
    async fn fetch_active_competitions(&self) -> Result<Vec<Competition>, CompetitionApiError>;

    /// Fetches the competitions for the given ids, in no particular order. Missing ids are simply absent from the
    /// result; callers that care must check.
    async fn fetch_competitions_by_ids(&self, ids: &[i64]) -> Result<Vec<Competition>, CompetitionApiError>;

    /// Pre-seeds the instant-win prize pool for a competition. Prize ticket numbers must be unique within the
    /// competition and within its number range.
    async fn seed_instant_prizes(
        &self,
        competition_id: i64,
        prizes: Vec<NewInstantPrize>,
    ) -> Result<u64, CompetitionApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum CompetitionApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("A competition with slug '{0}' already exists")]
    SlugTaken(String),
    #[error("The requested competition {0} does not exist")]
    CompetitionNotFound(i64),
    #[error("Prize ticket number {0} is outside the competition's number range")]
    PrizeNumberOutOfRange(i64),
}

impl From<sqlx::Error> for CompetitionApiError {
    fn from(e: sqlx::Error) -> Self {
        CompetitionApiError::DatabaseError(e.to_string())
    }
}
