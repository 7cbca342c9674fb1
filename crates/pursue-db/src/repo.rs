//! Repository traits
//!
//! Define async repository interfaces for database operations. Methods whose
//! name ends in `_within_limit` and [`MembershipRepository::resolve_over_limit`]
//! lock the user row and run check and write in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>>;

    /// Create a new user
    async fn create(&self, user: CreateUser) -> DbResult<UserRow>;

    /// Write recomputed subscription state if the row still matches
    /// `expected`. Returns false when a concurrent writer got there first.
    async fn update_subscription_state(
        &self,
        id: Uuid,
        expected: &SubscriptionState,
        new: &SubscriptionState,
    ) -> DbResult<bool>;
}

/// Create user input
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: Uuid,
    pub display_name: String,
}

/// The cached subscription columns of a user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub tier: String,
    pub status: String,
    pub group_limit: i64,
    pub kept_group_id: Option<Uuid>,
}

impl From<&UserRow> for SubscriptionState {
    fn from(row: &UserRow) -> Self {
        Self {
            tier: row.current_subscription_tier.clone(),
            status: row.subscription_status.clone(),
            group_limit: row.group_limit,
            kept_group_id: row.downgrade_kept_group_id,
        }
    }
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Most recent subscription for a user that has not been marked expired
    async fn find_current_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Expire the user's other open subscriptions and insert a new one
    async fn create_replacing(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow>;

    /// Turn off auto-renew and mark cancelled
    async fn cancel(&self, id: Uuid) -> DbResult<()>;

    /// Mark every open subscription with `expires_at <= now` as expired.
    /// Returns the affected user IDs.
    async fn expire_lapsed(&self, now: DateTime<Utc>) -> DbResult<Vec<Uuid>>;

    /// Same as [`Self::expire_lapsed`] for a single user
    async fn expire_lapsed_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> DbResult<u64>;
}

/// Create subscription input
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: String,
    pub platform: String,
    pub product_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Group repository trait
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Find a group by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GroupRow>>;

    /// Find a group by its invite code
    async fn find_by_invite_code(&self, code: &str) -> DbResult<Option<GroupRow>>;

    /// Whether a public group with this name (case-insensitive) exists
    async fn public_name_taken(&self, name: &str) -> DbResult<bool>;

    /// Insert a group and its creator membership. When
    /// `max_regular_groups` is set, the creator's active regular-group count
    /// is checked against it under a row lock first.
    async fn create_with_creator(
        &self,
        group: CreateGroup,
        max_regular_groups: Option<i64>,
    ) -> DbResult<CreateGroupOutcome>;

    /// Challenges in `upcoming` or `active` status
    async fn list_open_challenges(&self) -> DbResult<Vec<GroupRow>>;

    /// Challenges the user is an active member of
    async fn list_challenges_for_user(&self, user_id: Uuid) -> DbResult<Vec<GroupRow>>;

    /// Store a timer-driven status change, only if the stored status is still
    /// `from`. Returns whether a row changed.
    async fn transition_challenge(&self, id: Uuid, from: &str, to: &str) -> DbResult<bool>;

    /// Set status to cancelled unless already terminal. Returns whether a
    /// row changed.
    async fn cancel_challenge(&self, id: Uuid) -> DbResult<bool>;

    /// Groups with at least one active member
    async fn list_with_active_members(&self) -> DbResult<Vec<GroupRow>>;
}

/// Challenge-specific columns of a new group
#[derive(Debug, Clone)]
pub struct ChallengeFields {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub template_id: Option<String>,
}

/// Create group input
#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub visibility: String,
    pub invite_code: String,
    pub challenge: Option<ChallengeFields>,
}

/// Result of a limit-checked group insert
#[derive(Debug, Clone)]
pub enum CreateGroupOutcome {
    Created(GroupRow),
    LimitReached { current_count: i64 },
}

/// Membership repository trait
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Find a single membership
    async fn find(&self, group_id: Uuid, user_id: Uuid) -> DbResult<Option<MembershipRow>>;

    /// All memberships of a user joined with their groups
    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<MemberGroupRow>>;

    /// All memberships of a group
    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<MembershipRow>>;

    /// Active members of a group with their cached tier
    async fn list_active_members(&self, group_id: Uuid) -> DbResult<Vec<MemberTierRow>>;

    /// Active memberships in non-challenge groups
    async fn count_active_regular(&self, user_id: Uuid) -> DbResult<i64>;

    /// Insert a membership. Existing memberships are returned untouched.
    /// Active regular memberships are limit-checked when
    /// `max_regular_groups` is set.
    async fn join_within_limit(
        &self,
        membership: CreateMembership,
        max_regular_groups: Option<i64>,
    ) -> DbResult<JoinOutcome>;

    /// Flip a pending membership to active, limit-checked like
    /// [`Self::join_within_limit`].
    async fn activate_within_limit(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        max_regular_groups: Option<i64>,
    ) -> DbResult<ActivateOutcome>;

    /// Delete a membership. Returns whether it existed.
    async fn delete(&self, group_id: Uuid, user_id: Uuid) -> DbResult<bool>;

    /// Make every regular membership of a user writable again
    async fn clear_read_only(&self, user_id: Uuid) -> DbResult<u64>;

    /// Downgrade resolution: requires the stored account status to be
    /// `over_limit`, keeps `keep_group_id` writable, marks the other active
    /// regular memberships read-only and flips the status to `active`.
    async fn resolve_over_limit(
        &self,
        user_id: Uuid,
        keep_group_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<ResolveOutcome>;
}

/// Create membership input
#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
}

/// Result of [`MembershipRepository::join_within_limit`]
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Joined(MembershipRow),
    AlreadyMember(MembershipRow),
    LimitReached { current_count: i64 },
}

/// Result of [`MembershipRepository::activate_within_limit`]
#[derive(Debug, Clone)]
pub enum ActivateOutcome {
    Activated(MembershipRow),
    AlreadyActive(MembershipRow),
    NotFound,
    LimitReached { current_count: i64 },
}

/// Result of [`MembershipRepository::resolve_over_limit`]
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    /// Stored status was not `over_limit`
    NotOverLimit,
    /// The kept group is not an active regular membership of the user
    InvalidSelection,
    Resolved {
        kept: GroupRow,
        read_only: Vec<GroupRow>,
    },
}

/// Goal repository trait
#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GoalRow>>;

    async fn create(&self, goal: CreateGoal) -> DbResult<GoalRow>;

    async fn update(&self, id: Uuid, update: UpdateGoal) -> DbResult<GoalRow>;

    async fn archive(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()>;

    /// Non-archived goals of a group
    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<GoalRow>>;
}

/// Create goal input
#[derive(Debug, Clone)]
pub struct CreateGoal {
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
}

/// Full replacement of a goal's editable columns
#[derive(Debug, Clone)]
pub struct UpdateGoal {
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub active_days: Option<Vec<i32>>,
}

/// Progress repository trait
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn create(&self, entry: CreateProgressEntry) -> DbResult<ProgressEntryRow>;

    /// Distinct loggers per day for a group, days with no entries omitted
    async fn daily_participation(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<DailyParticipationRow>>;

    /// Total entries logged in a group between two dates (inclusive)
    async fn count_for_group(&self, group_id: Uuid, from: NaiveDate, to: NaiveDate)
        -> DbResult<i64>;

    /// Distinct members who logged anything in a group between two dates
    /// (inclusive)
    async fn count_distinct_loggers(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64>;

    /// Entries a user logged in a group between two dates (inclusive)
    async fn count_for_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64>;
}

/// Create progress entry input
#[derive(Debug, Clone)]
pub struct CreateProgressEntry {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub value: f64,
    pub note: Option<String>,
    pub entry_date: NaiveDate,
}

/// Activity feed and reactions
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: CreateActivity) -> DbResult<ActivityRow>;

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ActivityRow>>;

    /// Newest first
    async fn list_for_group(&self, group_id: Uuid, limit: i64) -> DbResult<Vec<ActivityRow>>;

    /// Insert or replace the user's reaction. Returns whether an existing,
    /// different emoji was replaced.
    async fn upsert_reaction(&self, activity_id: Uuid, user_id: Uuid, emoji: &str)
        -> DbResult<bool>;

    /// Returns whether a reaction existed
    async fn delete_reaction(&self, activity_id: Uuid, user_id: Uuid) -> DbResult<bool>;

    async fn list_reactions(&self, activity_id: Uuid) -> DbResult<Vec<ReactionRow>>;
}

/// Create activity input
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Challenge completion share cards
#[async_trait]
pub trait ShareCardRepository: Send + Sync {
    /// Insert unless the user already has a card for the group. Returns
    /// whether a card was created.
    async fn create_if_absent(&self, card: CreateShareCard) -> DbResult<bool>;

    async fn find(&self, user_id: Uuid, group_id: Uuid) -> DbResult<Option<ShareCardRow>>;
}

/// Create share card input
#[derive(Debug, Clone)]
pub struct CreateShareCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub stat: String,
    pub quote: String,
    pub background: String,
    pub referral_token: String,
}

/// Connectivity probe used by readiness checks
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> DbResult<()>;
}
