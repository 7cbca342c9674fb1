//! Group membership ledger and the group write gate

use chrono::{DateTime, NaiveDate, Utc};
use pursue_db::{
    ActivateOutcome, CreateGroup, CreateGroupOutcome, CreateMembership, GroupRow, JoinOutcome,
    MembershipRow, Repositories,
};
use pursue_types::{ActivityKind, ChallengeStatus, MemberRole, MembershipStatus, Visibility};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::subscription::{is_read_only, SubscriptionService};
use super::{record_activity, today, with_invite_code};
use crate::challenge;
use crate::error::{CoreError, CoreResult};
use crate::policy::{self, ExportRange};

const RESERVED_NAMES: &[&str] = &["admin", "pursue", "support", "moderator", "official"];
const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Create group input
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
}

/// Challenge window and status as seen by clients
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeInfo {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ChallengeStatus,
    pub template_id: Option<String>,
}

/// A group as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub visibility: String,
    pub invite_code: String,
    pub is_challenge: bool,
    pub challenge: Option<ChallengeInfo>,
    pub created_at: DateTime<Utc>,
}

impl GroupView {
    /// Build the view, evaluating the challenge status as of `today`
    pub fn from_row(row: GroupRow, today: NaiveDate) -> CoreResult<Self> {
        let status = effective_status(&row, today)?;
        let challenge = match (status, row.challenge_start_date, row.challenge_end_date) {
            (Some(status), Some(start_date), Some(end_date)) => Some(ChallengeInfo {
                start_date,
                end_date,
                status,
                template_id: row.challenge_template_id.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            creator_id: row.creator_id,
            visibility: row.visibility,
            invite_code: row.invite_code,
            is_challenge: row.is_challenge,
            challenge,
            created_at: row.created_at,
        })
    }
}

/// Entry of `GET /groups`
#[derive(Debug, Clone, Serialize)]
pub struct GroupListItem {
    #[serde(flatten)]
    pub group: GroupView,
    pub role: String,
    pub membership_status: String,
    pub is_read_only: bool,
}

/// `GET /groups/{id}` body
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: GroupView,
    pub member_count: usize,
    pub role: Option<String>,
    pub membership_status: Option<String>,
    pub is_read_only: bool,
}

/// Result of a join request
#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    pub group_id: Uuid,
    pub role: String,
    pub status: String,
    pub already_member: bool,
}

impl JoinResult {
    fn new(row: MembershipRow, already_member: bool) -> Self {
        Self {
            group_id: row.group_id,
            role: row.role,
            status: row.status,
            already_member,
        }
    }
}

/// A membership as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct MembershipView {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
    pub read_only: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<MembershipRow> for MembershipView {
    fn from(row: MembershipRow) -> Self {
        Self {
            group_id: row.group_id,
            user_id: row.user_id,
            role: row.role,
            status: row.status,
            read_only: row.read_only,
            joined_at: row.joined_at,
        }
    }
}

/// Proof that a user passed the write gate of a group
#[derive(Debug, Clone)]
pub struct WriteAccess {
    pub group: GroupRow,
    pub membership: MembershipRow,
    /// Effective challenge status, `None` for regular groups. Challenge
    /// gates are left to the caller since they differ per operation.
    pub challenge_status: Option<ChallengeStatus>,
}

impl WriteAccess {
    pub fn role(&self) -> CoreResult<MemberRole> {
        Ok(self.membership.role()?)
    }

    /// Require an admin or creator role
    pub fn require_manager(&self) -> CoreResult<()> {
        if self.role()?.can_manage() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "only group admins can do this".to_string(),
            ))
        }
    }
}

/// Status of a challenge group as of `today`, `None` for regular groups
pub(crate) fn effective_status(
    group: &GroupRow,
    today: NaiveDate,
) -> CoreResult<Option<ChallengeStatus>> {
    let Some(stored) = group.stored_challenge_status()? else {
        return Ok(None);
    };
    match (group.challenge_start_date, group.challenge_end_date) {
        (Some(start), Some(end)) => Ok(Some(challenge::next_state(today, stored, start, end))),
        _ => Err(CoreError::Internal(format!(
            "challenge {} has no date window",
            group.id
        ))),
    }
}

fn validate_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(CoreError::validation(format!(
            "name must be 1 to {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_description(description: Option<String>) -> CoreResult<Option<String>> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
    {
        return Err(CoreError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(description)
}

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Group service
#[derive(Clone)]
pub struct GroupService {
    repos: Repositories,
    subscriptions: SubscriptionService,
}

impl GroupService {
    pub fn new(repos: Repositories, subscriptions: SubscriptionService) -> Self {
        Self {
            repos,
            subscriptions,
        }
    }

    // =========================================================================
    // Create / join
    // =========================================================================

    /// Create a regular group with the caller as creator
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_group(&self, user_id: Uuid, input: NewGroup) -> CoreResult<GroupView> {
        let name = validate_name(&input.name)?;
        let description = validate_description(input.description)?;
        if is_reserved(&name) || self.repos.groups.public_name_taken(&name).await? {
            return Err(CoreError::NameNotAvailable);
        }

        let state = self.subscriptions.sync(user_id).await?;
        if !state.can_create_group() {
            return Err(state.limit_reached());
        }

        let group_id = Uuid::new_v4();
        let visibility = input.visibility;
        let limit = state.group_limit;
        let outcome = with_invite_code(|invite_code| {
            let groups = self.repos.groups.clone();
            let group = CreateGroup {
                id: group_id,
                name: name.clone(),
                description: description.clone(),
                creator_id: user_id,
                visibility: visibility.as_str().to_string(),
                invite_code,
                challenge: None,
            };
            async move { groups.create_with_creator(group, Some(limit)).await }
        })
        .await?;

        let row = match outcome {
            CreateGroupOutcome::Created(row) => row,
            CreateGroupOutcome::LimitReached { current_count } => {
                return Err(policy::limit_reached(state.tier, current_count));
            }
        };

        record_activity(
            &self.repos,
            row.id,
            user_id,
            ActivityKind::GroupCreated,
            json!({ "name": row.name }),
        )
        .await?;
        info!(group_id = %row.id, "group created");
        metrics::counter!("pursue_groups_created_total", "kind" => "regular").increment(1);

        GroupView::from_row(row, today())
    }

    /// Join by group id. Public groups are auto-approved within the limit,
    /// private groups get a pending membership.
    #[instrument(skip_all, fields(user_id = %user_id, group_id = %group_id))]
    pub async fn join_group(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<JoinResult> {
        let group = self
            .repos
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::GroupNotFound)?;
        self.join_loaded(user_id, group, false).await
    }

    /// Join by invite code. Regular groups get a pending membership,
    /// challenges are joined immediately.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn join_by_invite_code(&self, user_id: Uuid, code: &str) -> CoreResult<JoinResult> {
        let code = code.trim().to_uppercase();
        let group = self
            .repos
            .groups
            .find_by_invite_code(&code)
            .await?
            .ok_or(CoreError::GroupNotFound)?;
        self.join_loaded(user_id, group, true).await
    }

    async fn join_loaded(
        &self,
        user_id: Uuid,
        group: GroupRow,
        via_invite: bool,
    ) -> CoreResult<JoinResult> {
        if effective_status(&group, today())?.is_some_and(|s| s.is_terminal()) {
            return Err(CoreError::ChallengeEnded);
        }

        if let Some(existing) = self.repos.memberships.find(group.id, user_id).await? {
            return Ok(JoinResult::new(existing, true));
        }

        let auto_approve = group.is_challenge
            || (group.visibility == Visibility::Public.as_str() && !via_invite);
        let state = if group.is_challenge || !auto_approve {
            None
        } else {
            let state = self.subscriptions.sync(user_id).await?;
            if !state.can_join_group() {
                return Err(state.limit_reached());
            }
            Some(state)
        };
        let status = if auto_approve {
            MembershipStatus::Active
        } else {
            MembershipStatus::Pending
        };

        let outcome = self
            .repos
            .memberships
            .join_within_limit(
                CreateMembership {
                    group_id: group.id,
                    user_id,
                    role: MemberRole::Member.as_str().to_string(),
                    status: status.as_str().to_string(),
                },
                state.as_ref().map(|s| s.group_limit),
            )
            .await?;

        match outcome {
            JoinOutcome::Joined(row) => {
                if row.is_active() {
                    self.member_joined(&row).await?;
                }
                info!(status = %row.status, "joined group");
                Ok(JoinResult::new(row, false))
            }
            JoinOutcome::AlreadyMember(row) => Ok(JoinResult::new(row, true)),
            JoinOutcome::LimitReached { current_count } => Err(match state {
                Some(state) => policy::limit_reached(state.tier, current_count),
                None => CoreError::Internal("limit reached on an unchecked join".to_string()),
            }),
        }
    }

    async fn member_joined(&self, row: &MembershipRow) -> CoreResult<()> {
        record_activity(
            &self.repos,
            row.group_id,
            row.user_id,
            ActivityKind::MemberJoined,
            json!({}),
        )
        .await
    }

    // =========================================================================
    // Membership management
    // =========================================================================

    /// Approve a pending member. The target's group limit is re-checked
    /// together with the activation.
    #[instrument(skip_all, fields(actor_id = %actor_id, group_id = %group_id, target_id = %target_id))]
    pub async fn approve_member(
        &self,
        actor_id: Uuid,
        group_id: Uuid,
        target_id: Uuid,
    ) -> CoreResult<MembershipView> {
        let access = self.authorize_manage(actor_id, group_id).await?;
        if access.challenge_status.is_some_and(|s| s.is_terminal()) {
            return Err(CoreError::ChallengeEnded);
        }

        let pending = self
            .repos
            .memberships
            .find(group_id, target_id)
            .await?
            .ok_or(CoreError::MemberNotFound)?;
        if pending.is_active() {
            return Ok(pending.into());
        }

        let state = if access.group.is_challenge {
            None
        } else {
            let state = self.subscriptions.sync(target_id).await?;
            if !state.can_join_group() {
                return Err(state.limit_reached());
            }
            Some(state)
        };

        match self
            .repos
            .memberships
            .activate_within_limit(group_id, target_id, state.as_ref().map(|s| s.group_limit))
            .await?
        {
            ActivateOutcome::Activated(row) => {
                self.member_joined(&row).await?;
                info!("member approved");
                Ok(row.into())
            }
            ActivateOutcome::AlreadyActive(row) => Ok(row.into()),
            ActivateOutcome::NotFound => Err(CoreError::MemberNotFound),
            ActivateOutcome::LimitReached { current_count } => Err(match state {
                Some(state) => policy::limit_reached(state.tier, current_count),
                None => CoreError::Internal("limit reached on an unchecked approval".to_string()),
            }),
        }
    }

    /// Leave a group. Leaving the group kept by a downgrade selection can
    /// put the account back over its limit.
    #[instrument(skip_all, fields(user_id = %user_id, group_id = %group_id))]
    pub async fn leave_group(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<()> {
        if !self.repos.memberships.delete(group_id, user_id).await? {
            return Err(CoreError::NotAMember);
        }
        let state = self.subscriptions.sync(user_id).await?;
        info!(status = %state.status, "left group");
        Ok(())
    }

    /// Remove another member. The creator cannot be removed.
    #[instrument(skip_all, fields(actor_id = %actor_id, group_id = %group_id, target_id = %target_id))]
    pub async fn remove_member(
        &self,
        actor_id: Uuid,
        group_id: Uuid,
        target_id: Uuid,
    ) -> CoreResult<()> {
        if actor_id == target_id {
            return self.leave_group(actor_id, group_id).await;
        }

        self.authorize_manage(actor_id, group_id).await?;
        let target = self
            .repos
            .memberships
            .find(group_id, target_id)
            .await?
            .ok_or(CoreError::MemberNotFound)?;
        if target.role()? == MemberRole::Creator {
            return Err(CoreError::Forbidden(
                "the group creator cannot be removed".to_string(),
            ));
        }

        self.repos.memberships.delete(group_id, target_id).await?;
        info!("member removed");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Groups the user belongs to, with their read-only flag
    pub async fn list_my_groups(&self, user_id: Uuid) -> CoreResult<Vec<GroupListItem>> {
        self.subscriptions.sync(user_id).await?;
        let today = today();

        self.repos
            .memberships
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|m| {
                let is_read_only = is_read_only(&m);
                Ok(GroupListItem {
                    role: m.role,
                    membership_status: m.status,
                    is_read_only,
                    group: GroupView::from_row(m.group, today)?,
                })
            })
            .collect()
    }

    /// A single group. Private groups are visible to active members only.
    pub async fn get_group(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<GroupDetail> {
        let group = self
            .repos
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::GroupNotFound)?;
        let membership = self.repos.memberships.find(group_id, user_id).await?;

        let is_member = membership.as_ref().is_some_and(MembershipRow::is_active);
        if group.visibility == Visibility::Private.as_str() && !is_member {
            return Err(CoreError::NotAMember);
        }

        let member_count = self.repos.memberships.list_active_members(group_id).await?.len();
        let is_read_only = membership.as_ref().is_some_and(|m| m.read_only) && !group.is_challenge;

        Ok(GroupDetail {
            group: GroupView::from_row(group, today())?,
            member_count,
            role: membership.as_ref().map(|m| m.role.clone()),
            membership_status: membership.map(|m| m.status),
            is_read_only,
        })
    }

    /// Active regular memberships
    pub async fn current_group_count(&self, user_id: Uuid) -> CoreResult<i64> {
        Ok(self.repos.memberships.count_active_regular(user_id).await?)
    }

    /// Similar-group suggestions. Vector search is not available, so there
    /// are never any.
    pub async fn recommendations(&self, _user_id: Uuid) -> CoreResult<Vec<GroupView>> {
        Ok(Vec::new())
    }

    /// Check a progress export window against the caller's tier
    pub async fn validate_export_range(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<ExportRange> {
        self.require_member(user_id, group_id).await?;
        let state = self.subscriptions.sync(user_id).await?;
        policy::validate_export_range(state.tier, start, end)
    }

    // =========================================================================
    // Gates
    // =========================================================================

    /// Group and active membership of a reader. Read-only members pass.
    pub async fn require_member(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> CoreResult<(GroupRow, MembershipRow)> {
        let group = self
            .repos
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::GroupNotFound)?;
        let membership = self
            .repos
            .memberships
            .find(group_id, user_id)
            .await?
            .filter(MembershipRow::is_active)
            .ok_or(CoreError::NotAMember)?;
        Ok((group, membership))
    }

    /// Write gate: membership, then challenge exemption, then the
    /// subscription gates.
    pub async fn authorize_write(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<WriteAccess> {
        let (group, membership) = self.require_member(user_id, group_id).await?;
        self.gate(user_id, group, membership).await
    }

    /// Write gate for admin-only operations. The role is checked before the
    /// subscription gates.
    async fn authorize_manage(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<WriteAccess> {
        let (group, membership) = self.require_member(user_id, group_id).await?;
        if !membership.role()?.can_manage() {
            return Err(CoreError::Forbidden(
                "only group admins can do this".to_string(),
            ));
        }
        self.gate(user_id, group, membership).await
    }

    async fn gate(
        &self,
        user_id: Uuid,
        group: GroupRow,
        membership: MembershipRow,
    ) -> CoreResult<WriteAccess> {
        let challenge_status = effective_status(&group, today())?;
        let membership = if challenge_status.is_some() {
            membership
        } else {
            let state = self.subscriptions.sync(user_id).await?;
            if state.is_over_limit() {
                return Err(CoreError::GroupSelectionRequired);
            }
            // sync may have restored read-only memberships
            let membership = self
                .repos
                .memberships
                .find(group.id, user_id)
                .await?
                .ok_or(CoreError::NotAMember)?;
            if membership.read_only {
                return Err(CoreError::GroupReadOnly);
            }
            membership
        };

        Ok(WriteAccess {
            group,
            membership,
            challenge_status,
        })
    }
}
