use chrono::Duration;

/// Aggregated view of exam progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub studied: usize,
    pub bookmarked_current: bool,
    /// Time left on a timed mock session, floored at zero.
    pub remaining: Option<Duration>,
    pub expired: bool,
    pub submitted: bool,
}
