use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::course::{Course, CoursePayload};
use crate::model::ids::CompetitionId;
use crate::model::mode::{ExamMode, ExamScope, SessionKey};
use crate::model::question::{Question, QuestionDraft, QuestionError};

/// Well-known store key the selection screen writes its handoff record under.
pub const HANDOFF_KEY: &str = "exam_handoff";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandoffError {
    #[error("handoff names neither a year nor a competition")]
    MissingScope,

    #[error("handoff names both year {year} and competition {competition}")]
    AmbiguousScope { year: String, competition: String },

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// One-shot record passed from the exam selection screen to the session screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamHandoff {
    pub course: CoursePayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_id: Option<CompetitionId>,
    pub exam_type: ExamMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u32>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

impl ExamHandoff {
    /// Resolve the year/competition pair into a scope.
    ///
    /// # Errors
    ///
    /// Returns `HandoffError::MissingScope` if neither is set and
    /// `HandoffError::AmbiguousScope` if both are.
    pub fn scope(&self) -> Result<ExamScope, HandoffError> {
        let year = self
            .year
            .as_deref()
            .map(str::trim)
            .filter(|y| !y.is_empty());
        match (year, &self.competition_id) {
            (Some(year), None) => Ok(ExamScope::Year(year.to_owned())),
            (None, Some(id)) => Ok(ExamScope::Competition(id.clone())),
            (Some(year), Some(id)) => Err(HandoffError::AmbiguousScope {
                year: year.to_owned(),
                competition: id.to_string(),
            }),
            (None, None) => Err(HandoffError::MissingScope),
        }
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::seconds(i64::from(secs)))
    }

    /// Canonical course plus session key for this handoff.
    ///
    /// # Errors
    ///
    /// Returns `HandoffError` if the scope cannot be resolved.
    pub fn session_key(&self, known: &[Course]) -> Result<(Course, SessionKey), HandoffError> {
        let course = self.course.clone().resolve(known);
        let key = SessionKey::new(self.exam_type, &course, self.scope()?);
        Ok((course, key))
    }

    /// Validate every carried question draft, in order.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` encountered.
    pub fn validated_questions(&self) -> Result<Vec<Question>, HandoffError> {
        self.questions
            .iter()
            .cloned()
            .map(|draft| draft.validate().map_err(HandoffError::from))
            .collect()
    }
}
