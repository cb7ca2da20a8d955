use std::sync::Arc;

use chrono::Duration;
use rand::rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use exam_core::model::{
    ExamMode, ExamSession, Question, QuestionId, SessionKey, SessionResult, SessionSnapshot,
    SessionStateError,
};
use storage::repository::{KeyValueStore, put_json};

use super::progress::SessionProgress;
use super::sync::{SyncHandle, spawn_sync};
use crate::Clock;
use crate::client::ExamApi;
use crate::config::SubmitPolicy;
use crate::error::SessionError;
use crate::notify::{Notice, Notifier};

//
// ─── ACTIVE EXAM ───────────────────────────────────────────────────────────────
//

/// A running exam: its persistence key, the session state and, once finished,
/// the latest result.
#[derive(Debug, Clone)]
pub struct ActiveExam {
    key: SessionKey,
    session: ExamSession,
    result: Option<SessionResult>,
    resumed: bool,
}

impl ActiveExam {
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.session.mode()
    }

    /// Latest result returned by `finish()`.
    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Whether this exam was rehydrated from a stored snapshot.
    #[must_use]
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub(crate) fn seed_bookmarks(&mut self, ids: impl IntoIterator<Item = QuestionId>) {
        self.session.set_bookmarks(ids);
    }
}

/// Outcome of an optimistic bookmark toggle.
#[derive(Debug)]
pub struct BookmarkToggle {
    /// Local membership after the toggle.
    pub bookmarked: bool,
    pub sync: SyncHandle,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives `ActiveExam`s: resume or start, write-through persistence after every
/// mutation, background syncs to the exam API and final scoring.
#[derive(Clone)]
pub struct ExamSessionService {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn ExamApi>,
    notifier: Arc<dyn Notifier>,
    submit_policy: SubmitPolicy,
    shuffle: bool,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn ExamApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            store,
            api,
            notifier,
            submit_policy: SubmitPolicy::default(),
            shuffle: false,
        }
    }

    #[must_use]
    pub fn with_submit_policy(mut self, submit_policy: SubmitPolicy) -> Self {
        self.submit_policy = submit_policy;
        self
    }

    /// Shuffle question order for fresh sessions. The order is stored with the
    /// snapshot, so resumed sessions keep it.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub(crate) fn api(&self) -> &Arc<dyn ExamApi> {
        &self.api
    }

    pub(crate) fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Resume the stored session for `key`, or start and persist a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for an empty or duplicated question set
    /// and `SessionError::Storage` if the snapshot cannot be read or written.
    pub async fn start(
        &self,
        key: SessionKey,
        mut questions: Vec<Question>,
        time_limit: Option<Duration>,
    ) -> Result<ActiveExam, SessionError> {
        if questions.is_empty() {
            return Err(SessionStateError::EmptyQuestionSet.into());
        }

        let storage_key = key.storage_key();
        if let Some(raw) = self.store.get(&storage_key).await? {
            match serde_json::from_str::<SessionSnapshot>(&raw) {
                Ok(snapshot) => {
                    let restored =
                        self.restore(key.clone(), questions.clone(), &snapshot, time_limit);
                    if let Some(exam) = restored {
                        debug!(
                            key = %storage_key,
                            index = exam.session.current_index(),
                            "resumed session"
                        );
                        return Ok(exam);
                    }
                    debug!(key = %storage_key, "stale snapshot discarded");
                }
                Err(err) => debug!(key = %storage_key, error = %err, "unreadable snapshot discarded"),
            }
        }

        if self.shuffle {
            questions.shuffle(&mut rng());
        }
        let session = ExamSession::new(key.mode(), questions, self.clock.now(), time_limit)?;
        self.persist(&storage_key, &session).await?;
        info!(
            key = %storage_key,
            questions = session.question_count(),
            "started session"
        );

        Ok(ActiveExam {
            key,
            session,
            result: None,
            resumed: false,
        })
    }

    /// Rehydrate from `snapshot`. `None` means the snapshot is stale for this
    /// question set.
    #[must_use]
    pub fn restore(
        &self,
        key: SessionKey,
        questions: Vec<Question>,
        snapshot: &SessionSnapshot,
        time_limit: Option<Duration>,
    ) -> Option<ActiveExam> {
        let session =
            ExamSession::restore(key.mode(), questions, snapshot, self.clock.now(), time_limit)?;
        Some(ActiveExam {
            key,
            session,
            result: None,
            resumed: true,
        })
    }

    /// Persisted representation of `exam`, stamped with the service clock.
    #[must_use]
    pub fn snapshot(&self, exam: &ActiveExam) -> SessionSnapshot {
        exam.session.snapshot(self.clock.now())
    }

    /// Record an answer. Frozen questions are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for unknown questions or out-of-range
    /// ordinals, `SessionError::Storage` if the new state cannot be persisted.
    pub async fn select_option(
        &self,
        exam: &mut ActiveExam,
        question_id: &QuestionId,
        ordinal: u32,
    ) -> Result<bool, SessionError> {
        self.commit(exam, |session| session.select_option(question_id, ordinal))
            .await
    }

    /// Mark a question studied. The first reveal posts study progress in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` in mock mode or for unknown questions,
    /// `SessionError::Storage` if the new state cannot be persisted.
    pub async fn reveal(
        &self,
        exam: &mut ActiveExam,
        question_id: &QuestionId,
    ) -> Result<Option<SyncHandle>, SessionError> {
        let first = self
            .commit(exam, |session| session.reveal(question_id))
            .await?;
        if !first {
            return Ok(None);
        }

        let api = Arc::clone(&self.api);
        let id = question_id.clone();
        Ok(Some(spawn_sync(
            Arc::clone(&self.notifier),
            "study progress",
            async move { api.post_study_progress(&id).await },
        )))
    }

    /// Flip explanation visibility, returning the new visibility.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for unknown questions and for
    /// explanations still locked (not yet revealed in study mode, not yet
    /// submitted in mock mode), `SessionError::Storage` if the new state cannot be
    /// persisted.
    pub async fn toggle_explanation(
        &self,
        exam: &mut ActiveExam,
        question_id: &QuestionId,
    ) -> Result<bool, SessionError> {
        let mut visible = false;
        self.commit(exam, |session| {
            visible = session.toggle_explanation(question_id)?;
            Ok(true)
        })
        .await?;
        Ok(visible)
    }

    /// Jump to `index`, clamped into range. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new position cannot be persisted.
    pub async fn navigate(&self, exam: &mut ActiveExam, index: i64) -> Result<usize, SessionError> {
        self.move_to(exam, |session| session.navigate(index)).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new position cannot be persisted.
    pub async fn next(&self, exam: &mut ActiveExam) -> Result<usize, SessionError> {
        self.move_to(exam, ExamSession::next).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new position cannot be persisted.
    pub async fn previous(&self, exam: &mut ActiveExam) -> Result<usize, SessionError> {
        self.move_to(exam, ExamSession::previous).await
    }

    /// Flip bookmark membership locally and sync it in the background.
    ///
    /// The local change is never rolled back; a failed sync is reported through
    /// the notifier. Overlapping toggles are not ordered, so the backend keeps
    /// whichever request lands last.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for unknown questions.
    pub fn toggle_bookmark(
        &self,
        exam: &mut ActiveExam,
        question_id: &QuestionId,
    ) -> Result<BookmarkToggle, SessionError> {
        let bookmarked = exam.session.toggle_bookmark(question_id)?;

        let api = Arc::clone(&self.api);
        let id = question_id.clone();
        let sync = spawn_sync(Arc::clone(&self.notifier), "bookmark", async move {
            if bookmarked {
                api.post_bookmark(&id).await
            } else {
                api.delete_bookmark(&id).await
            }
        });
        Ok(BookmarkToggle { bookmarked, sync })
    }

    /// Send a problem report for a question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyReport` for a blank description,
    /// `SessionError::InvalidInput` for unknown questions and
    /// `SessionError::NetworkFailure` if the API rejects the report.
    pub async fn report(
        &self,
        exam: &ActiveExam,
        question_id: &QuestionId,
        description: &str,
    ) -> Result<(), SessionError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(SessionError::EmptyReport);
        }
        if exam.session.question(question_id).is_none() {
            return Err(SessionStateError::UnknownQuestion(question_id.clone()).into());
        }

        if let Err(err) = self.api.post_report(question_id, description).await {
            tracing::warn!(error = %err, question = %question_id, "report failed");
            self.notifier
                .notify(Notice::network_failure(format!("Could not send report: {err}")));
            return Err(err.into());
        }
        self.notifier.notify(Notice::info("Report sent"));
        Ok(())
    }

    /// Score the exam, freeze its answers and clear the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a repeat call under
    /// `SubmitPolicy::AtMostOnce` and `SessionError::Storage` if the snapshot
    /// cannot be cleared.
    pub async fn finish(&self, exam: &mut ActiveExam) -> Result<SessionResult, SessionError> {
        if exam.session.is_submitted() && self.submit_policy == SubmitPolicy::AtMostOnce {
            return Err(SessionError::AlreadySubmitted);
        }

        let mut session = exam.session.clone();
        let result = session.submit(self.clock.now());
        self.store.remove(&exam.key.storage_key()).await?;

        exam.session = session;
        exam.result = Some(result.clone());
        info!(
            key = %exam.key,
            correct = result.correct(),
            total = result.total(),
            "finished session"
        );
        Ok(result)
    }

    /// Abandon the exam and clear its stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the snapshot cannot be removed.
    pub async fn exit(&self, exam: ActiveExam) -> Result<(), SessionError> {
        let removed = self.store.remove(&exam.key.storage_key()).await?;
        debug!(key = %exam.key, removed, "exited session");
        Ok(())
    }

    /// Read model for rendering, evaluated against the service clock.
    #[must_use]
    pub fn progress(&self, exam: &ActiveExam) -> SessionProgress {
        let session = &exam.session;
        let now = self.clock.now();
        SessionProgress {
            current_index: session.current_index(),
            total: session.question_count(),
            answered: session.answers().len(),
            studied: session.studied().len(),
            bookmarked_current: session.is_bookmarked(session.current_question().id()),
            remaining: session.remaining(now),
            expired: session.is_expired(now),
            submitted: session.is_submitted(),
        }
    }

    //
    // ─── WRITE-THROUGH ─────────────────────────────────────────────────────────
    //

    /// Apply `op` to a copy of the session and keep it only once the new snapshot
    /// is stored. Submitted sessions have no snapshot and are updated in memory.
    async fn commit<F>(&self, exam: &mut ActiveExam, op: F) -> Result<bool, SessionError>
    where
        F: FnOnce(&mut ExamSession) -> Result<bool, SessionStateError>,
    {
        let mut session = exam.session.clone();
        let changed = op(&mut session)?;
        if changed && !session.is_submitted() {
            self.persist(&exam.key.storage_key(), &session).await?;
        }
        exam.session = session;
        Ok(changed)
    }

    async fn move_to<F>(&self, exam: &mut ActiveExam, op: F) -> Result<usize, SessionError>
    where
        F: FnOnce(&mut ExamSession) -> usize,
    {
        let before = exam.session.current_index();
        let mut index = before;
        self.commit(exam, |session| {
            index = op(session);
            Ok(index != before)
        })
        .await?;
        Ok(index)
    }

    async fn persist(&self, storage_key: &str, session: &ExamSession) -> Result<(), SessionError> {
        let snapshot = session.snapshot(self.clock.now());
        put_json(self.store.as_ref(), storage_key, &snapshot).await?;
        Ok(())
    }
}
