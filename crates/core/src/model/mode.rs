use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::course::Course;
use crate::model::ids::CompetitionId;

/// Which flow a session runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamMode {
    /// Untimed review; revealing a question freezes its answer.
    Study,
    /// Timed exam; answers stay editable until submission.
    Mock,
}

impl ExamMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamMode::Study => "study",
            ExamMode::Mock => "mock",
        }
    }
}

impl fmt::Display for ExamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown exam mode: {}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for ExamMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "study" => Ok(ExamMode::Study),
            "mock" | "exam" => Ok(ExamMode::Mock),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}

/// What a question set was drawn from: a past-paper year or a competition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExamScope {
    Year(String),
    Competition(CompetitionId),
}

impl ExamScope {
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            ExamScope::Year(year) => year,
            ExamScope::Competition(id) => id.as_str(),
        }
    }
}

/// Persistence key of a session: `mode_course_identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    mode: ExamMode,
    course: String,
    scope: ExamScope,
}

impl SessionKey {
    #[must_use]
    pub fn new(mode: ExamMode, course: &Course, scope: ExamScope) -> Self {
        Self {
            mode,
            course: course.key_token().to_owned(),
            scope,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ExamMode {
        self.mode
    }

    #[must_use]
    pub fn course(&self) -> &str {
        &self.course
    }

    #[must_use]
    pub fn scope(&self) -> &ExamScope {
        &self.scope
    }

    /// Storage key string.
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.mode, self.course, self.scope.identifier())
    }
}
