//! Core errors

use pursue_db::DbError;
use pursue_types::ParseEnumError;
use thiserror::Error;

/// Result alias used across the core services
pub type CoreResult<T> = Result<T, CoreError>;

/// Business-rule and lookup failures.
///
/// Each variant carries one stable error code (see [`CoreError::code`]).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("user not found")]
    UserNotFound,

    #[error("group not found")]
    GroupNotFound,

    #[error("member not found")]
    MemberNotFound,

    #[error("goal not found")]
    GoalNotFound,

    #[error("no active subscription")]
    SubscriptionNotFound,

    #[error("activity not found")]
    ActivityNotFound,

    #[error("share card not found")]
    ShareCardNotFound,

    /// Regular group limit for the tier is used up
    #[error("group limit reached: {current_count} / {limit}")]
    GroupLimitReached {
        current_count: i64,
        limit: i64,
        upgrade_required: bool,
    },

    #[error("premium subscription required")]
    PremiumRequired,

    /// Account is over its limit and no group has been kept yet
    #[error("select which group to keep before making changes")]
    GroupSelectionRequired,

    #[error("group is read-only on your current plan")]
    GroupReadOnly,

    #[error("goals cannot be changed while the challenge is active")]
    ChallengeGoalsLocked,

    #[error("challenge has ended")]
    ChallengeEnded,

    #[error("challenge has not started yet")]
    ChallengeNotStarted,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("unknown product: {0}")]
    InvalidProduct(String),

    #[error("group name is not available")]
    NameNotAvailable,

    #[error("group must be one of your active regular groups")]
    InvalidGroupSelection,

    /// Requested export window is longer than the tier allows
    #[error("date range of {requested_days} days exceeds the {max_days_allowed} day limit")]
    ExportRangeExceeded {
        max_days_allowed: i64,
        requested_days: i64,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not a member of this group")]
    NotAMember,

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::GroupNotFound => "GROUP_NOT_FOUND",
            Self::MemberNotFound => "MEMBER_NOT_FOUND",
            Self::GoalNotFound => "GOAL_NOT_FOUND",
            Self::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            Self::ActivityNotFound => "ACTIVITY_NOT_FOUND",
            Self::ShareCardNotFound => "SHARE_CARD_NOT_FOUND",
            Self::GroupLimitReached { .. } => "GROUP_LIMIT_REACHED",
            Self::PremiumRequired => "PREMIUM_REQUIRED",
            Self::GroupSelectionRequired => "SUBSCRIPTION_GROUP_SELECTION_REQUIRED",
            Self::GroupReadOnly => "GROUP_READ_ONLY",
            Self::ChallengeGoalsLocked => "CHALLENGE_GOALS_LOCKED",
            Self::ChallengeEnded => "CHALLENGE_ENDED",
            Self::ChallengeNotStarted => "CHALLENGE_NOT_STARTED",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidProduct(_) => "INVALID_PRODUCT",
            Self::NameNotAvailable => "NAME_NOT_AVAILABLE",
            Self::InvalidGroupSelection => "INVALID_GROUP_SELECTION",
            Self::ExportRangeExceeded { .. } => "date_range_exceeds_tier_limit",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotAMember => "NOT_A_MEMBER",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound
                | Self::GroupNotFound
                | Self::MemberNotFound
                | Self::GoalNotFound
                | Self::SubscriptionNotFound
                | Self::ActivityNotFound
                | Self::ShareCardNotFound
        )
    }

    /// Check if this error is a policy denial (HTTP 403)
    pub fn is_policy_denial(&self) -> bool {
        matches!(
            self,
            Self::GroupLimitReached { .. }
                | Self::PremiumRequired
                | Self::GroupSelectionRequired
                | Self::GroupReadOnly
                | Self::ChallengeGoalsLocked
                | Self::Forbidden(_)
                | Self::NotAMember
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<ParseEnumError> for CoreError {
    /// A stored enum column held an unknown value
    fn from(err: ParseEnumError) -> Self {
        Self::Database(DbError::Corrupt(err.to_string()))
    }
}
