use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has no text")]
    EmptyText { id: QuestionId },

    #[error("question {id} needs at least two options, got {len}")]
    TooFewOptions { id: QuestionId, len: usize },

    #[error("question {id} has an empty option at position {ordinal}")]
    EmptyOption { id: QuestionId, ordinal: u32 },

    #[error("question {id} marks option {correct} correct but has {len} options")]
    CorrectOptionOutOfRange {
        id: QuestionId,
        correct: u32,
        len: usize,
    },
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives in a handoff record or API payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into a `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if text or options are empty, fewer than two options
    /// are given, or the correct option is not a 1-based ordinal within the options.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.id.as_str().trim().is_empty() {
            return Err(QuestionError::EmptyId);
        }
        let text = self.text.trim();
        if text.is_empty() {
            return Err(QuestionError::EmptyText { id: self.id });
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                len: self.options.len(),
                id: self.id,
            });
        }
        if let Some(pos) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption {
                id: self.id,
                ordinal: u32::try_from(pos + 1).unwrap_or(u32::MAX),
            });
        }
        if self.correct_option == 0 || self.correct_option as usize > self.options.len() {
            return Err(QuestionError::CorrectOptionOutOfRange {
                correct: self.correct_option,
                len: self.options.len(),
                id: self.id,
            });
        }

        let explanation = self
            .explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Question {
            text: text.to_owned(),
            id: self.id,
            options: self.options,
            correct_option: self.correct_option,
            explanation,
            year: self.year,
        })
    }
}

/// A validated multiple-choice question.
///
/// Option ordinals are 1-based throughout: `correct_option() == 1` means the first
/// entry of `options()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: u32,
    explanation: Option<String>,
    year: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Returns the option text for a 1-based ordinal.
    #[must_use]
    pub fn option(&self, ordinal: u32) -> Option<&str> {
        let idx = usize::try_from(ordinal).ok()?.checked_sub(1)?;
        self.options.get(idx).map(String::as_str)
    }

    #[must_use]
    pub fn correct_option(&self) -> u32 {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// True if `ordinal` names one of this question's options.
    #[must_use]
    pub fn accepts(&self, ordinal: u32) -> bool {
        ordinal >= 1 && (ordinal as usize) <= self.options.len()
    }

    #[must_use]
    pub fn is_correct(&self, ordinal: u32) -> bool {
        ordinal == self.correct_option
    }
}

/// Letter label used when reading or printing options ("A", "B", ...).
#[must_use]
pub fn option_label(ordinal: u32) -> String {
    match ordinal {
        1..=26 => char::from(b'A' + u8::try_from(ordinal - 1).unwrap_or(0)).to_string(),
        _ => ordinal.to_string(),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
