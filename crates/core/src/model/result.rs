use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::QuestionId;
use crate::model::mode::ExamMode;

/// How a single question ended up when the session was scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub position: usize,
    pub chosen: Option<u32>,
    pub correct: u32,
    pub verdict: Verdict,
}

/// Aggregate score for a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    mode: ExamMode,
    total: u32,
    answered: u32,
    correct: u32,
    started_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
    outcomes: Vec<QuestionOutcome>,
}

impl SessionResult {
    /// Build a result from per-question outcomes in session order.
    #[must_use]
    pub fn from_outcomes(
        mode: ExamMode,
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
        outcomes: Vec<QuestionOutcome>,
    ) -> Self {
        let mut answered = 0_u32;
        let mut correct = 0_u32;
        for outcome in &outcomes {
            match outcome.verdict {
                Verdict::Correct => {
                    answered = answered.saturating_add(1);
                    correct = correct.saturating_add(1);
                }
                Verdict::Incorrect => answered = answered.saturating_add(1),
                Verdict::Unanswered => {}
            }
        }
        let total = u32::try_from(outcomes.len()).unwrap_or(u32::MAX);

        Self {
            mode,
            total,
            answered,
            correct,
            started_at,
            submitted_at,
            outcomes,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.mode
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.total - self.correct
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.submitted_at - self.started_at
    }

    #[must_use]
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }

    /// Score as a percentage of all questions, unanswered counting as wrong.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) * 100.0 / f64::from(self.total)
    }
}
