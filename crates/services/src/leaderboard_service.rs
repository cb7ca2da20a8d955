use std::sync::Arc;

use exam_core::model::{CompetitionId, Leaderboard};

use crate::client::ExamApi;
use crate::error::SessionError;

/// Fetches and ranks competition standings.
#[derive(Clone)]
pub struct LeaderboardService {
    api: Arc<dyn ExamApi>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `SessionError::NetworkFailure` if the standings cannot be fetched.
    pub async fn leaderboard(&self, competition_id: &CompetitionId) -> Result<Leaderboard, SessionError> {
        let entries = self.api.fetch_leaderboard(competition_id).await?;
        tracing::debug!(competition = %competition_id, entries = entries.len(), "fetched leaderboard");
        Ok(Leaderboard::rank(competition_id.clone(), entries))
    }
}
