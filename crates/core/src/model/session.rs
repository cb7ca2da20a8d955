use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::mode::ExamMode;
use crate::model::question::Question;
use crate::model::result::{QuestionOutcome, SessionResult, Verdict};
use crate::model::snapshot::SessionSnapshot;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejected session operations. All of these are caller input errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("a session needs at least one question")]
    EmptyQuestionSet,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),

    #[error("option {ordinal} is out of range for question {id} (1..={len})")]
    OptionOutOfRange {
        id: QuestionId,
        ordinal: u32,
        len: usize,
    },

    #[error("answers can only be revealed in study mode")]
    RevealInMockMode,

    #[error("the explanation for {0} is not available yet")]
    ExplanationLocked(QuestionId),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single-question-at-a-time exam state.
///
/// Pure state machine: every mutator reports whether it changed anything so the
/// caller knows when a new snapshot must be written. Time is always passed in.
#[derive(Debug, Clone)]
pub struct ExamSession {
    mode: ExamMode,
    questions: Arc<[Question]>,
    positions: Arc<HashMap<QuestionId, usize>>,
    current: usize,
    answers: BTreeMap<QuestionId, u32>,
    studied: BTreeSet<QuestionId>,
    show_explanation: BTreeMap<QuestionId, bool>,
    bookmarked: BTreeSet<QuestionId>,
    started_at: DateTime<Utc>,
    time_limit: Option<Duration>,
    submitted_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Create a fresh session positioned on the first question.
    ///
    /// `time_limit` only applies to mock sessions and is ignored in study mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::EmptyQuestionSet` for an empty question list and
    /// `SessionStateError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        mode: ExamMode,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
        time_limit: Option<Duration>,
    ) -> Result<Self, SessionStateError> {
        if questions.is_empty() {
            return Err(SessionStateError::EmptyQuestionSet);
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (idx, question) in questions.iter().enumerate() {
            if positions.insert(question.id().clone(), idx).is_some() {
                return Err(SessionStateError::DuplicateQuestion(question.id().clone()));
            }
        }

        let time_limit = match mode {
            ExamMode::Mock => time_limit.filter(|limit| *limit > Duration::zero()),
            ExamMode::Study => None,
        };

        Ok(Self {
            mode,
            questions: questions.into(),
            positions: Arc::new(positions),
            current: 0,
            answers: BTreeMap::new(),
            studied: BTreeSet::new(),
            show_explanation: BTreeMap::new(),
            bookmarked: BTreeSet::new(),
            started_at,
            time_limit,
            submitted_at: None,
        })
    }

    /// Rehydrate a session from a persisted snapshot.
    ///
    /// Returns `None` when the snapshot does not belong to `questions`: it mentions
    /// an id outside the set, records an ordinal the question does not have, or
    /// points past the end of the list. A stored question order covering exactly the
    /// same ids is re-applied, so the cursor lands on the question it was on.
    #[must_use]
    pub fn restore(
        mode: ExamMode,
        questions: Vec<Question>,
        snapshot: &SessionSnapshot,
        now: DateTime<Utc>,
        time_limit: Option<Duration>,
    ) -> Option<Self> {
        let started_at = match (mode, snapshot.started_at) {
            (ExamMode::Mock, Some(ms)) => DateTime::<Utc>::from_timestamp_millis(ms)?,
            _ => now,
        };
        let questions = match &snapshot.question_order {
            Some(order) => apply_order(questions, order),
            None => questions,
        };
        let mut session = Self::new(mode, questions, started_at, time_limit).ok()?;

        if snapshot
            .referenced_ids()
            .any(|id| !session.positions.contains_key(id))
        {
            return None;
        }
        if snapshot.current_question_index >= session.questions.len() {
            return None;
        }
        for (id, ordinal) in &snapshot.user_answers {
            if !session.question(id)?.accepts(*ordinal) {
                return None;
            }
        }
        if mode == ExamMode::Mock && !snapshot.studied_questions.is_empty() {
            return None;
        }

        session.current = snapshot.current_question_index;
        session.answers = snapshot.user_answers.clone();
        session.studied = snapshot.studied_questions.iter().cloned().collect();
        session.show_explanation = snapshot.show_explanation.clone();
        Some(session)
    }

    /// Persisted representation of the current state, stamped with `now`.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            user_answers: self.answers.clone(),
            studied_questions: self.studied.iter().cloned().collect(),
            show_explanation: self.show_explanation.clone(),
            current_question_index: self.current,
            timestamp: now.timestamp_millis(),
            started_at: match self.mode {
                ExamMode::Mock => Some(self.started_at.timestamp_millis()),
                ExamMode::Study => None,
            },
            question_order: Some(self.questions.iter().map(|q| q.id().clone()).collect()),
        }
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.mode
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.positions.get(id).map(|idx| &self.questions[*idx])
    }

    #[must_use]
    pub fn position_of(&self, id: &QuestionId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn answer(&self, id: &QuestionId) -> Option<u32> {
        self.answers.get(id).copied()
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, u32> {
        &self.answers
    }

    #[must_use]
    pub fn studied(&self) -> &BTreeSet<QuestionId> {
        &self.studied
    }

    #[must_use]
    pub fn is_studied(&self, id: &QuestionId) -> bool {
        self.studied.contains(id)
    }

    /// True when the answer for `id` no longer accepts writes.
    #[must_use]
    pub fn is_frozen(&self, id: &QuestionId) -> bool {
        self.submitted_at.is_some() || (self.mode == ExamMode::Study && self.is_studied(id))
    }

    #[must_use]
    pub fn explanation_visible(&self, id: &QuestionId) -> bool {
        self.show_explanation.get(id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn bookmarked(&self) -> &BTreeSet<QuestionId> {
        &self.bookmarked
    }

    #[must_use]
    pub fn is_bookmarked(&self, id: &QuestionId) -> bool {
        self.bookmarked.contains(id)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Time left on a timed session, never negative. `None` when untimed.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.time_limit.map(|limit| {
            let left = limit - (now - self.started_at);
            left.max(Duration::zero())
        })
    }

    /// True once a timed session has run out of time. Acting on it is up to the caller.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now).is_some_and(|left| left <= Duration::zero())
    }

    // ─── Mutations ─────────────────────────────────────────────────────────────

    /// Record `ordinal` (1-based) as the answer for `id`.
    ///
    /// Frozen questions ignore the write and return `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` or
    /// `SessionStateError::OptionOutOfRange`.
    pub fn select_option(&mut self, id: &QuestionId, ordinal: u32) -> Result<bool, SessionStateError> {
        let question = self
            .question(id)
            .ok_or_else(|| SessionStateError::UnknownQuestion(id.clone()))?;
        if !question.accepts(ordinal) {
            return Err(SessionStateError::OptionOutOfRange {
                id: id.clone(),
                ordinal,
                len: question.option_count(),
            });
        }
        if self.is_frozen(id) {
            return Ok(false);
        }
        Ok(self.answers.insert(id.clone(), ordinal) != Some(ordinal))
    }

    /// Mark `id` as studied, freezing its answer and showing its explanation.
    ///
    /// Returns `Ok(true)` only the first time a question is revealed.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::RevealInMockMode` outside study mode and
    /// `SessionStateError::UnknownQuestion` for ids outside the session.
    pub fn reveal(&mut self, id: &QuestionId) -> Result<bool, SessionStateError> {
        if self.mode != ExamMode::Study {
            return Err(SessionStateError::RevealInMockMode);
        }
        if !self.positions.contains_key(id) {
            return Err(SessionStateError::UnknownQuestion(id.clone()));
        }
        if !self.studied.insert(id.clone()) {
            return Ok(false);
        }
        self.show_explanation.insert(id.clone(), true);
        Ok(true)
    }

    /// Flip explanation visibility for `id`, returning the new visibility.
    ///
    /// Explanations open once the question is studied or the session is submitted.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` for ids outside the session and
    /// `SessionStateError::ExplanationLocked` before the answer is settled.
    pub fn toggle_explanation(&mut self, id: &QuestionId) -> Result<bool, SessionStateError> {
        if !self.positions.contains_key(id) {
            return Err(SessionStateError::UnknownQuestion(id.clone()));
        }
        if !self.is_studied(id) && !self.is_submitted() {
            return Err(SessionStateError::ExplanationLocked(id.clone()));
        }
        let visible = !self.explanation_visible(id);
        self.show_explanation.insert(id.clone(), visible);
        Ok(visible)
    }

    /// Move to `index`, clamped into the question range. Returns the new index.
    pub fn navigate(&mut self, index: i64) -> usize {
        let last = self.questions.len() - 1;
        self.current = usize::try_from(index.max(0)).map_or(last, |idx| idx.min(last));
        self.current
    }

    pub fn next(&mut self) -> usize {
        self.navigate(i64::try_from(self.current).unwrap_or(i64::MAX).saturating_add(1))
    }

    pub fn previous(&mut self) -> usize {
        self.navigate(i64::try_from(self.current).unwrap_or(i64::MAX) - 1)
    }

    /// Flip bookmark membership for `id`, returning whether it is now bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` for ids outside the session.
    pub fn toggle_bookmark(&mut self, id: &QuestionId) -> Result<bool, SessionStateError> {
        if !self.positions.contains_key(id) {
            return Err(SessionStateError::UnknownQuestion(id.clone()));
        }
        if self.bookmarked.remove(id) {
            Ok(false)
        } else {
            self.bookmarked.insert(id.clone());
            Ok(true)
        }
    }

    /// Seed bookmarks from the backend. Ids outside this session are ignored.
    pub fn set_bookmarks<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = QuestionId>,
    {
        self.bookmarked = ids
            .into_iter()
            .filter(|id| self.positions.contains_key(id))
            .collect();
    }

    /// Score the session and freeze all answers.
    ///
    /// The first call fixes `submitted_at`; later calls score the current state again
    /// against that same timestamp.
    pub fn submit(&mut self, now: DateTime<Utc>) -> SessionResult {
        let submitted_at = *self.submitted_at.get_or_insert(now);
        self.score(submitted_at)
    }

    /// Score the current answers without changing state.
    #[must_use]
    pub fn score(&self, at: DateTime<Utc>) -> SessionResult {
        let outcomes = self
            .questions
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let chosen = self.answer(question.id());
                let verdict = match chosen {
                    None => Verdict::Unanswered,
                    Some(ordinal) if question.is_correct(ordinal) => Verdict::Correct,
                    Some(_) => Verdict::Incorrect,
                };
                QuestionOutcome {
                    question_id: question.id().clone(),
                    position,
                    chosen,
                    correct: question.correct_option(),
                    verdict,
                }
            })
            .collect();
        SessionResult::from_outcomes(self.mode, self.started_at, at, outcomes)
    }
}

/// Reorder `questions` to follow `order`. Left as given unless `order` names
/// exactly the same ids.
fn apply_order(questions: Vec<Question>, order: &[QuestionId]) -> Vec<Question> {
    let rank: HashMap<&QuestionId, usize> =
        order.iter().enumerate().map(|(idx, id)| (id, idx)).collect();
    if rank.len() != order.len() || order.len() != questions.len() {
        return questions;
    }
    let Some(ranks) = questions
        .iter()
        .map(|q| rank.get(q.id()).copied())
        .collect::<Option<Vec<_>>>()
    else {
        return questions;
    };

    let mut keyed: Vec<(usize, Question)> = ranks.into_iter().zip(questions).collect();
    keyed.sort_by_key(|(idx, _)| *idx);
    keyed.into_iter().map(|(_, q)| q).collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
