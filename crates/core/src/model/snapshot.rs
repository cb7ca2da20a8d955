use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::QuestionId;

/// Persisted form of an in-progress session.
///
/// Field names match the JSON layout already present in users' local storage, so
/// existing snapshots keep resuming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub user_answers: BTreeMap<QuestionId, u32>,
    #[serde(default)]
    pub studied_questions: Vec<QuestionId>,
    #[serde(default)]
    pub show_explanation: BTreeMap<QuestionId, bool>,
    #[serde(default)]
    pub current_question_index: usize,
    /// Epoch milliseconds of the write.
    pub timestamp: i64,
    /// Epoch milliseconds the timed session began; absent for study sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    /// Question ids in the order the session presents them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_order: Option<Vec<QuestionId>>,
}

impl SessionSnapshot {
    /// Every question id the snapshot mentions.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &QuestionId> {
        self.user_answers
            .keys()
            .chain(self.studied_questions.iter())
            .chain(self.show_explanation.keys())
    }
}
