mod launch;
mod progress;
mod service;
mod sync;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{ActiveExam, BookmarkToggle, ExamSessionService};
pub use sync::SyncHandle;
