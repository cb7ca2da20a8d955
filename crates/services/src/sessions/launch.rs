use exam_core::model::{CoursePayload, ExamHandoff, HANDOFF_KEY};
use storage::repository::take_json;
use tracing::{debug, warn};

use super::service::{ActiveExam, ExamSessionService};
use crate::error::SessionError;
use crate::notify::Notice;

impl ExamSessionService {
    /// Consume the handoff record left by the selection screen and start (or
    /// resume) the exam it describes.
    ///
    /// The record is removed before anything else happens, so a failed launch
    /// cannot be retried from the same record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingHandoff` when no record is stored, plus
    /// everything `launch_from` can return.
    pub async fn launch(&self) -> Result<ActiveExam, SessionError> {
        let handoff: ExamHandoff = take_json(self.store().as_ref(), HANDOFF_KEY)
            .await?
            .ok_or(SessionError::MissingHandoff)?;
        self.launch_from(handoff).await
    }

    /// Start the exam described by `handoff`.
    ///
    /// Questions carried by the record are used as is; an empty list is fetched
    /// from the exam API. Bookmarks are loaded best-effort.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for an unusable record or question
    /// set, `SessionError::NetworkFailure` if questions had to be fetched and the
    /// fetch failed, and `SessionError::Storage` for store failures.
    pub async fn launch_from(&self, handoff: ExamHandoff) -> Result<ActiveExam, SessionError> {
        handoff.scope()?;

        let known = match &handoff.course {
            CoursePayload::Detailed { .. } => Vec::new(),
            _ => self.api().fetch_courses().await.unwrap_or_else(|err| {
                debug!(error = %err, "course catalogue unavailable");
                Vec::new()
            }),
        };
        let (course, key) = handoff.session_key(&known)?;

        let questions = if handoff.questions.is_empty() {
            let scope = key.scope().clone();
            self.api()
                .fetch_questions(&course, &scope, handoff.exam_type)
                .await?
        } else {
            handoff.validated_questions()?
        };

        let mut exam = self.start(key, questions, handoff.time_limit()).await?;

        match self.api().get_bookmarks().await {
            Ok(ids) => exam.seed_bookmarks(ids),
            Err(err) => {
                warn!(error = %err, "bookmarks unavailable");
                self.notifier()
                    .notify(Notice::network_failure(format!("Could not load bookmarks: {err}")));
            }
        }
        Ok(exam)
    }
}
