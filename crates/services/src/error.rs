//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{HandoffError, QuestionError, SessionStateError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the remote exam API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("exam API is not configured")]
    Disabled,
    #[error("invalid exam API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("exam API request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("exam API returned an invalid question: {0}")]
    InvalidQuestion(#[from] QuestionError),
}

/// Errors emitted by `ExamSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Rejected caller input: empty question set, bad ordinal, unknown question.
    #[error("invalid input: {0}")]
    InvalidInput(#[source] exam_core::Error),
    #[error("invalid input: report description is empty")]
    EmptyReport,
    #[error("session already submitted")]
    AlreadySubmitted,
    #[error("no exam handoff record to launch from")]
    MissingHandoff,
    #[error("network failure: {0}")]
    NetworkFailure(#[from] ClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SessionError::InvalidInput(_) | SessionError::EmptyReport)
    }
}

impl From<SessionStateError> for SessionError {
    fn from(err: SessionStateError) -> Self {
        SessionError::InvalidInput(err.into())
    }
}

impl From<HandoffError> for SessionError {
    fn from(err: HandoffError) -> Self {
        SessionError::InvalidInput(err.into())
    }
}

impl From<QuestionError> for SessionError {
    fn from(err: QuestionError) -> Self {
        SessionError::InvalidInput(err.into())
    }
}

/// Errors emitted while building CSV exports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Flush(String),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
