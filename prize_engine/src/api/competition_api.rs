use log::*;

use crate::{
    db_types::{Competition, CompetitionStatus, NewCompetition, NewInstantPrize},
    traits::{CompetitionApiError, CompetitionManagement},
};

/// Catalogue reads and back-office competition management.
pub struct CompetitionApi<B> {
    db: B,
}

impl<B> CompetitionApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CompetitionApi<B>
where B: CompetitionManagement
{
    pub async fn create_competition(&self, competition: NewCompetition) -> Result<Competition, CompetitionApiError> {
        self.db.create_competition(competition).await
    }

    pub async fn set_status(
        &self,
        competition_id: i64,
        status: CompetitionStatus,
    ) -> Result<Competition, CompetitionApiError> {
        let competition = self.db.set_competition_status(competition_id, status).await?;
        info!("🏁️ Competition {} is now {}", competition.slug, competition.status);
        Ok(competition)
    }

    pub async fn active_competitions(&self) -> Result<Vec<Competition>, CompetitionApiError> {
        self.db.fetch_active_competitions().await
    }

    pub async fn competition_by_slug(&self, slug: &str) -> Result<Option<Competition>, CompetitionApiError> {
        self.db.fetch_competition_by_slug(slug).await
    }

    pub async fn seed_instant_prizes(
        &self,
        competition_id: i64,
        prizes: Vec<NewInstantPrize>,
    ) -> Result<u64, CompetitionApiError> {
        self.db.seed_instant_prizes(competition_id, prizes).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
