//! Challenge lifecycle status

use serde::{Deserialize, Serialize};

/// Lifecycle status of a challenge group.
///
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Start date is in the future
    Upcoming,
    /// Between start and end date (inclusive)
    Active,
    /// End date has passed
    Completed,
    /// Cancelled by its creator
    Cancelled,
}

string_enum!(ChallengeStatus, "challenge status", {
    Upcoming => "upcoming",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl ChallengeStatus {
    /// Whether no further transitions are possible
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}
