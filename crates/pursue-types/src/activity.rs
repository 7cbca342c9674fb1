//! Group activity feed

use serde::{Deserialize, Serialize};

/// Kind of event shown in a group's activity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProgressLogged,
    MemberJoined,
    ChallengeCompleted,
    WeeklyRecap,
    GroupCreated,
}

string_enum!(ActivityKind, "activity kind", {
    ProgressLogged => "progress_logged",
    MemberJoined => "member_joined",
    ChallengeCompleted => "challenge_completed",
    WeeklyRecap => "weekly_recap",
    GroupCreated => "group_created",
});

impl ActivityKind {
    /// System events have no acting user
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::ChallengeCompleted | Self::WeeklyRecap)
    }
}
