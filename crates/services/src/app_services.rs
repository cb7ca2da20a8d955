use std::sync::Arc;

use storage::repository::{KeyValueStore, Storage};

use crate::Clock;
use crate::client::{ExamApi, HttpExamApi};
use crate::config::ServicesConfig;
use crate::error::AppServicesError;
use crate::leaderboard_service::LeaderboardService;
use crate::notify::Notifier;
use crate::sessions::ExamSessionService;

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn KeyValueStore>,
    sessions: Arc<ExamSessionService>,
    leaderboards: Arc<LeaderboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.db_url` and the HTTP
    /// exam API from `config.api`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        config: &ServicesConfig,
        clock: Clock,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let api: Arc<dyn ExamApi> = Arc::new(HttpExamApi::new(config.api.clone()));
        Ok(Self::with_parts(config, clock, storage, api, notifier))
    }

    /// Build services over already constructed storage and API handles.
    #[must_use]
    pub fn with_parts(
        config: &ServicesConfig,
        clock: Clock,
        storage: Storage,
        api: Arc<dyn ExamApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let sessions = ExamSessionService::new(clock, Arc::clone(&storage.kv), Arc::clone(&api), notifier)
            .with_submit_policy(config.submit_policy)
            .with_shuffle(config.shuffle_questions);

        Self {
            store: storage.kv,
            sessions: Arc::new(sessions),
            leaderboards: Arc::new(LeaderboardService::new(api)),
        }
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn leaderboards(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboards)
    }
}
