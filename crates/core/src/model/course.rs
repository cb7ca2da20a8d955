use serde::{Deserialize, Serialize};

use crate::model::ids::CourseId;

/// Canonical course shape used everywhere past the data-client boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
        }
    }

    /// Short token used in session keys. Falls back to the id when no code is known.
    #[must_use]
    pub fn key_token(&self) -> &str {
        if self.code.trim().is_empty() {
            self.id.as_str()
        } else {
            self.code.trim()
        }
    }
}

/// The shapes a course arrives in from the backend.
///
/// Depending on the endpoint a course is a bare string (code or id), an object
/// carrying only an id, or a fully populated object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoursePayload {
    Detailed {
        #[serde(alias = "_id")]
        id: CourseId,
        code: String,
        #[serde(alias = "title")]
        name: String,
    },
    Reference {
        #[serde(alias = "_id")]
        id: CourseId,
    },
    Text(String),
}

impl CoursePayload {
    /// Resolve into a canonical `Course`, consulting `known` for references.
    ///
    /// A bare string matches a known course by id or by code (case-insensitive);
    /// unmatched strings become a course whose id, code and name are that string.
    #[must_use]
    pub fn resolve(self, known: &[Course]) -> Course {
        match self {
            CoursePayload::Detailed { id, code, name } => Course { id, code, name },
            CoursePayload::Reference { id } => known
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .unwrap_or_else(|| Course::new(id.clone(), id.as_str(), id.as_str())),
            CoursePayload::Text(raw) => {
                let raw = raw.trim();
                known
                    .iter()
                    .find(|c| c.id.as_str() == raw || c.code.eq_ignore_ascii_case(raw))
                    .cloned()
                    .unwrap_or_else(|| Course::new(CourseId::new(raw), raw, raw))
            }
        }
    }
}

impl From<Course> for CoursePayload {
    fn from(course: Course) -> Self {
        CoursePayload::Detailed {
            id: course.id,
            code: course.code,
            name: course.name,
        }
    }
}
