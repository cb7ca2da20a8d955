mod course;
mod handoff;
mod ids;
mod leaderboard;
mod mode;
mod question;
mod result;
mod session;
mod snapshot;

pub use ids::{CompetitionId, CourseId, ParseIdError, QuestionId};

pub use course::{Course, CoursePayload};
pub use handoff::{ExamHandoff, HANDOFF_KEY, HandoffError};
pub use leaderboard::{Leaderboard, LeaderboardEntry, RankedEntry};
pub use mode::{ExamMode, ExamScope, ParseModeError, SessionKey};
pub use question::{Question, QuestionDraft, QuestionError, option_label};
pub use result::{QuestionOutcome, SessionResult, Verdict};
pub use session::{ExamSession, SessionStateError};
pub use snapshot::SessionSnapshot;
