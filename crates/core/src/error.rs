use thiserror::Error;

use crate::model::{HandoffError, QuestionError, SessionStateError};

/// Any domain-level rejection from this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Session(#[from] SessionStateError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}
