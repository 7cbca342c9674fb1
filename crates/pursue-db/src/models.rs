//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, NaiveDate, Utc};
use pursue_types::{
    AccountStatus, ChallengeStatus, GroupId, MemberRole, MembershipStatus, Tier, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{DbError, DbResult};

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub display_name: String,
    pub current_subscription_tier: String,
    pub subscription_status: String,
    pub group_limit: i64,
    pub downgrade_kept_group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: String,
    pub status: String,
    pub platform: String,
    pub product_id: String,
    pub expires_at: DateTime<Utc>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Group row from the database (regular groups and challenges)
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub visibility: String,
    pub invite_code: String,
    pub is_challenge: bool,
    pub challenge_start_date: Option<NaiveDate>,
    pub challenge_end_date: Option<NaiveDate>,
    pub challenge_status: Option<String>,
    pub challenge_template_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Membership row from the database
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
    pub read_only: bool,
    pub read_only_since: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

/// A user's membership joined with the group it belongs to
#[derive(Debug, Clone, FromRow)]
pub struct MemberGroupRow {
    #[sqlx(flatten)]
    pub group: GroupRow,
    pub role: String,
    pub status: String,
    pub read_only: bool,
    pub joined_at: DateTime<Utc>,
}

/// Active member of a group together with their cached tier
#[derive(Debug, Clone, FromRow)]
pub struct MemberTierRow {
    pub user_id: Uuid,
    pub display_name: String,
    pub current_subscription_tier: String,
}

/// Goal row from the database
#[derive(Debug, Clone, FromRow)]
pub struct GoalRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cadence: String,
    pub metric_type: String,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub active_days: Option<Vec<i32>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Progress entry row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ProgressEntryRow {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub value: f64,
    pub note: Option<String>,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Number of distinct members who logged progress on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct DailyParticipationRow {
    pub entry_date: NaiveDate,
    pub loggers: i64,
}

/// Activity feed row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Reaction row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ReactionRow {
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Challenge completion share card
#[derive(Debug, Clone, FromRow)]
pub struct ShareCardRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub stat: String,
    pub quote: String,
    pub background: String,
    pub referral_token: String,
    pub created_at: DateTime<Utc>,
}

fn decode<T: std::str::FromStr>(column: &str, value: &str) -> DbResult<T> {
    value
        .parse()
        .map_err(|_| DbError::Corrupt(format!("{column} = {value:?}")))
}

// Conversion helpers from Row types to pursue-types domain types
impl UserRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.id)
    }

    /// Cached tier
    pub fn tier(&self) -> DbResult<Tier> {
        decode("current_subscription_tier", &self.current_subscription_tier)
    }

    /// Cached account status
    pub fn status(&self) -> DbResult<AccountStatus> {
        decode("subscription_status", &self.subscription_status)
    }

    /// Group retained by the last downgrade selection
    pub fn kept_group_id(&self) -> Option<GroupId> {
        self.downgrade_kept_group_id.map(GroupId)
    }
}

impl GroupRow {
    /// Convert to domain GroupId
    pub fn group_id(&self) -> GroupId {
        GroupId(self.id)
    }

    /// Stored challenge status, `None` for regular groups
    pub fn stored_challenge_status(&self) -> DbResult<Option<ChallengeStatus>> {
        self.challenge_status
            .as_deref()
            .map(|s| decode("challenge_status", s))
            .transpose()
    }
}

impl MembershipRow {
    pub fn role(&self) -> DbResult<MemberRole> {
        decode("role", &self.role)
    }

    pub fn status(&self) -> DbResult<MembershipStatus> {
        decode("status", &self.status)
    }

    /// Whether this is an approved membership
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active.as_str()
    }
}

impl MemberGroupRow {
    pub fn role(&self) -> DbResult<MemberRole> {
        decode("role", &self.role)
    }

    /// Whether this membership counts toward the regular group limit
    pub fn counts_toward_limit(&self) -> bool {
        self.status == MembershipStatus::Active.as_str() && !self.group.is_challenge
    }
}

