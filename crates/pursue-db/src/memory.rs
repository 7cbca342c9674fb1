//! In-memory repository implementations
//!
//! Backed by `DashMap` tables. Every write takes one async mutex, so the
//! composite operations that Postgres runs under a user-row lock are
//! serialized here as well. Used by tests and `STORAGE=memory` runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::*;
use crate::repo::*;

type MemberKey = (Uuid, Uuid);

#[derive(Default)]
struct Tables {
    users: DashMap<Uuid, UserRow>,
    subscriptions: DashMap<Uuid, SubscriptionRow>,
    groups: DashMap<Uuid, GroupRow>,
    /// Keyed by (group_id, user_id)
    memberships: DashMap<MemberKey, MembershipRow>,
    goals: DashMap<Uuid, GoalRow>,
    progress: DashMap<Uuid, ProgressEntryRow>,
    activities: DashMap<Uuid, ActivityRow>,
    /// Keyed by (activity_id, user_id)
    reactions: DashMap<MemberKey, ReactionRow>,
    /// Keyed by (user_id, group_id)
    share_cards: DashMap<MemberKey, ShareCardRow>,
    write_lock: Mutex<()>,
}

/// In-memory store implementing every repository trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn group(&self, id: Uuid) -> Option<GroupRow> {
        self.tables.groups.get(&id).map(|g| g.value().clone())
    }

    fn membership(&self, group_id: Uuid, user_id: Uuid) -> Option<MembershipRow> {
        self.tables
            .memberships
            .get(&(group_id, user_id))
            .map(|m| m.value().clone())
    }

    fn member_groups(&self, user_id: Uuid) -> Vec<MemberGroupRow> {
        let mut rows: Vec<MemberGroupRow> = self
            .tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                self.group(m.group_id).map(|group| MemberGroupRow {
                    group,
                    role: m.role.clone(),
                    status: m.status.clone(),
                    read_only: m.read_only,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.joined_at);
        rows
    }

    fn active_regular_count(&self, user_id: Uuid) -> i64 {
        self.member_groups(user_id)
            .iter()
            .filter(|m| m.counts_toward_limit())
            .count() as i64
    }

    fn require_user(&self, user_id: Uuid) -> DbResult<UserRow> {
        self.tables
            .users
            .get(&user_id)
            .map(|u| u.value().clone())
            .ok_or(DbError::NotFound)
    }

    fn progress_in_group(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<ProgressEntryRow> {
        self.tables
            .progress
            .iter()
            .filter(|p| p.entry_date >= from && p.entry_date <= to)
            .filter(|p| {
                self.tables
                    .goals
                    .get(&p.goal_id)
                    .is_some_and(|g| g.group_id == group_id)
            })
            .map(|p| p.value().clone())
            .collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        Ok(self.tables.users.get(&id).map(|u| u.value().clone()))
    }

    async fn create(&self, user: CreateUser) -> DbResult<UserRow> {
        let _guard = self.tables.write_lock.lock().await;
        if self.tables.users.contains_key(&user.id) {
            return Err(DbError::Conflict("users_pkey".into()));
        }
        let now = Utc::now();
        let row = UserRow {
            id: user.id,
            display_name: user.display_name,
            current_subscription_tier: "free".into(),
            subscription_status: "active".into(),
            group_limit: 1,
            downgrade_kept_group_id: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_subscription_state(
        &self,
        id: Uuid,
        expected: &SubscriptionState,
        new: &SubscriptionState,
    ) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        let Some(mut user) = self.tables.users.get_mut(&id) else {
            return Ok(false);
        };
        if SubscriptionState::from(&*user) != *expected {
            return Ok(false);
        }
        user.current_subscription_tier = new.tier.clone();
        user.subscription_status = new.status.clone();
        user.group_limit = new.group_limit;
        user.downgrade_kept_group_id = new.kept_group_id;
        user.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find_current_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .tables
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.status != "expired")
            .max_by_key(|s| s.created_at)
            .map(|s| s.value().clone()))
    }

    async fn create_replacing(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let _guard = self.tables.write_lock.lock().await;
        let now = Utc::now();
        for mut existing in self.tables.subscriptions.iter_mut() {
            if existing.user_id == sub.user_id && existing.status != "expired" {
                existing.status = "expired".into();
                existing.auto_renew = false;
                existing.updated_at = now;
            }
        }
        let row = SubscriptionRow {
            id: sub.id,
            user_id: sub.user_id,
            tier: sub.tier,
            status: "active".into(),
            platform: sub.platform,
            product_id: sub.product_id,
            expires_at: sub.expires_at,
            auto_renew: true,
            created_at: now,
            updated_at: now,
        };
        self.tables.subscriptions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn cancel(&self, id: Uuid) -> DbResult<()> {
        let _guard = self.tables.write_lock.lock().await;
        if let Some(mut sub) = self.tables.subscriptions.get_mut(&id) {
            if sub.status == "active" {
                sub.status = "cancelled".into();
                sub.auto_renew = false;
                sub.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>) -> DbResult<Vec<Uuid>> {
        let _guard = self.tables.write_lock.lock().await;
        let mut user_ids = Vec::new();
        for mut sub in self.tables.subscriptions.iter_mut() {
            if sub.status != "expired" && sub.expires_at <= now {
                sub.status = "expired".into();
                sub.auto_renew = false;
                sub.updated_at = Utc::now();
                user_ids.push(sub.user_id);
            }
        }
        user_ids.sort_unstable();
        user_ids.dedup();
        Ok(user_ids)
    }

    async fn expire_lapsed_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> DbResult<u64> {
        let _guard = self.tables.write_lock.lock().await;
        let mut expired = 0;
        for mut sub in self.tables.subscriptions.iter_mut() {
            if sub.user_id == user_id && sub.status != "expired" && sub.expires_at <= now {
                sub.status = "expired".into();
                sub.auto_renew = false;
                sub.updated_at = Utc::now();
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GroupRow>> {
        Ok(self.group(id))
    }

    async fn find_by_invite_code(&self, code: &str) -> DbResult<Option<GroupRow>> {
        Ok(self
            .tables
            .groups
            .iter()
            .find(|g| g.invite_code == code)
            .map(|g| g.value().clone()))
    }

    async fn public_name_taken(&self, name: &str) -> DbResult<bool> {
        let wanted = name.to_lowercase();
        Ok(self
            .tables
            .groups
            .iter()
            .any(|g| g.visibility == "public" && g.name.to_lowercase() == wanted))
    }

    async fn create_with_creator(
        &self,
        group: CreateGroup,
        max_regular_groups: Option<i64>,
    ) -> DbResult<CreateGroupOutcome> {
        let _guard = self.tables.write_lock.lock().await;
        self.require_user(group.creator_id)?;

        if let Some(max) = max_regular_groups {
            let current_count = self.active_regular_count(group.creator_id);
            if current_count >= max {
                return Ok(CreateGroupOutcome::LimitReached { current_count });
            }
        }

        if self
            .tables
            .groups
            .iter()
            .any(|g| g.invite_code == group.invite_code)
        {
            return Err(DbError::Conflict("groups_invite_code_key".into()));
        }

        let now = Utc::now();
        let challenge = group.challenge.as_ref();
        let row = GroupRow {
            id: group.id,
            name: group.name,
            description: group.description,
            creator_id: group.creator_id,
            visibility: group.visibility,
            invite_code: group.invite_code,
            is_challenge: challenge.is_some(),
            challenge_start_date: challenge.map(|c| c.start_date),
            challenge_end_date: challenge.map(|c| c.end_date),
            challenge_status: challenge.map(|c| c.status.clone()),
            challenge_template_id: challenge.and_then(|c| c.template_id.clone()),
            created_at: now,
        };
        self.tables.groups.insert(row.id, row.clone());
        self.tables.memberships.insert(
            (row.id, row.creator_id),
            MembershipRow {
                group_id: row.id,
                user_id: row.creator_id,
                role: "creator".into(),
                status: "active".into(),
                read_only: false,
                read_only_since: None,
                joined_at: now,
            },
        );

        Ok(CreateGroupOutcome::Created(row))
    }

    async fn list_open_challenges(&self) -> DbResult<Vec<GroupRow>> {
        let mut rows: Vec<GroupRow> = self
            .tables
            .groups
            .iter()
            .filter(|g| {
                g.is_challenge
                    && matches!(g.challenge_status.as_deref(), Some("upcoming" | "active"))
            })
            .map(|g| g.value().clone())
            .collect();
        rows.sort_by_key(|g| g.challenge_start_date);
        Ok(rows)
    }

    async fn list_challenges_for_user(&self, user_id: Uuid) -> DbResult<Vec<GroupRow>> {
        let mut rows: Vec<GroupRow> = self
            .member_groups(user_id)
            .into_iter()
            .filter(|m| m.group.is_challenge && m.status == "active")
            .map(|m| m.group)
            .collect();
        rows.sort_by_key(|g| std::cmp::Reverse(g.challenge_start_date));
        Ok(rows)
    }

    async fn transition_challenge(&self, id: Uuid, from: &str, to: &str) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        let Some(mut group) = self.tables.groups.get_mut(&id) else {
            return Ok(false);
        };
        if !group.is_challenge || group.challenge_status.as_deref() != Some(from) {
            return Ok(false);
        }
        group.challenge_status = Some(to.to_string());
        Ok(true)
    }

    async fn cancel_challenge(&self, id: Uuid) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        let Some(mut group) = self.tables.groups.get_mut(&id) else {
            return Ok(false);
        };
        if !group.is_challenge
            || !matches!(group.challenge_status.as_deref(), Some("upcoming" | "active"))
        {
            return Ok(false);
        }
        group.challenge_status = Some("cancelled".into());
        Ok(true)
    }

    async fn list_with_active_members(&self) -> DbResult<Vec<GroupRow>> {
        let mut rows: Vec<GroupRow> = self
            .tables
            .groups
            .iter()
            .filter(|g| {
                self.tables
                    .memberships
                    .iter()
                    .any(|m| m.group_id == g.id && m.status == "active")
            })
            .map(|g| g.value().clone())
            .collect();
        rows.sort_by_key(|g| g.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn find(&self, group_id: Uuid, user_id: Uuid) -> DbResult<Option<MembershipRow>> {
        Ok(self.membership(group_id, user_id))
    }

    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<MemberGroupRow>> {
        Ok(self.member_groups(user_id))
    }

    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<MembershipRow>> {
        let mut rows: Vec<MembershipRow> = self
            .tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.value().clone())
            .collect();
        rows.sort_by_key(|m| m.joined_at);
        Ok(rows)
    }

    async fn list_active_members(&self, group_id: Uuid) -> DbResult<Vec<MemberTierRow>> {
        let mut members: Vec<(DateTime<Utc>, MemberTierRow)> = self
            .tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id && m.status == "active")
            .filter_map(|m| {
                self.tables.users.get(&m.user_id).map(|u| {
                    (
                        m.joined_at,
                        MemberTierRow {
                            user_id: u.id,
                            display_name: u.display_name.clone(),
                            current_subscription_tier: u.current_subscription_tier.clone(),
                        },
                    )
                })
            })
            .collect();
        members.sort_by_key(|(joined_at, _)| *joined_at);
        Ok(members.into_iter().map(|(_, m)| m).collect())
    }

    async fn count_active_regular(&self, user_id: Uuid) -> DbResult<i64> {
        Ok(self.active_regular_count(user_id))
    }

    async fn join_within_limit(
        &self,
        membership: CreateMembership,
        max_regular_groups: Option<i64>,
    ) -> DbResult<JoinOutcome> {
        let _guard = self.tables.write_lock.lock().await;
        self.require_user(membership.user_id)?;
        if self.group(membership.group_id).is_none() {
            return Err(DbError::NotFound);
        }

        if let Some(existing) = self.membership(membership.group_id, membership.user_id) {
            return Ok(JoinOutcome::AlreadyMember(existing));
        }

        if let Some(max) = max_regular_groups {
            let current_count = self.active_regular_count(membership.user_id);
            if current_count >= max {
                return Ok(JoinOutcome::LimitReached { current_count });
            }
        }

        let row = MembershipRow {
            group_id: membership.group_id,
            user_id: membership.user_id,
            role: membership.role,
            status: membership.status,
            read_only: false,
            read_only_since: None,
            joined_at: Utc::now(),
        };
        self.tables
            .memberships
            .insert((row.group_id, row.user_id), row.clone());
        Ok(JoinOutcome::Joined(row))
    }

    async fn activate_within_limit(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        max_regular_groups: Option<i64>,
    ) -> DbResult<ActivateOutcome> {
        let _guard = self.tables.write_lock.lock().await;
        let Some(existing) = self.membership(group_id, user_id) else {
            return Ok(ActivateOutcome::NotFound);
        };
        if existing.is_active() {
            return Ok(ActivateOutcome::AlreadyActive(existing));
        }

        if let Some(max) = max_regular_groups {
            let current_count = self.active_regular_count(user_id);
            if current_count >= max {
                return Ok(ActivateOutcome::LimitReached { current_count });
            }
        }

        let mut row = existing;
        row.status = "active".into();
        self.tables
            .memberships
            .insert((group_id, user_id), row.clone());
        Ok(ActivateOutcome::Activated(row))
    }

    async fn delete(&self, group_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        Ok(self
            .tables
            .memberships
            .remove(&(group_id, user_id))
            .is_some())
    }

    async fn clear_read_only(&self, user_id: Uuid) -> DbResult<u64> {
        let _guard = self.tables.write_lock.lock().await;
        let mut cleared = 0;
        for mut m in self.tables.memberships.iter_mut() {
            if m.user_id == user_id && m.read_only {
                m.read_only = false;
                m.read_only_since = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn resolve_over_limit(
        &self,
        user_id: Uuid,
        keep_group_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<ResolveOutcome> {
        let _guard = self.tables.write_lock.lock().await;
        let user = self.require_user(user_id)?;
        if user.subscription_status != "over_limit" {
            return Ok(ResolveOutcome::NotOverLimit);
        }

        let regular: Vec<MemberGroupRow> = self
            .member_groups(user_id)
            .into_iter()
            .filter(MemberGroupRow::counts_toward_limit)
            .collect();

        let Some(kept) = regular.iter().find(|m| m.group.id == keep_group_id).cloned() else {
            return Ok(ResolveOutcome::InvalidSelection);
        };

        let mut read_only = Vec::new();
        for member in regular {
            let Some(mut row) = self
                .tables
                .memberships
                .get_mut(&(member.group.id, user_id))
            else {
                continue;
            };
            if member.group.id == keep_group_id {
                row.read_only = false;
                row.read_only_since = None;
            } else {
                row.read_only = true;
                row.read_only_since.get_or_insert(now);
                read_only.push(member.group);
            }
        }

        if let Some(mut user) = self.tables.users.get_mut(&user_id) {
            user.subscription_status = "active".into();
            user.downgrade_kept_group_id = Some(keep_group_id);
            user.updated_at = Utc::now();
        }

        Ok(ResolveOutcome::Resolved {
            kept: kept.group,
            read_only,
        })
    }
}

#[async_trait]
impl GoalRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GoalRow>> {
        Ok(self.tables.goals.get(&id).map(|g| g.value().clone()))
    }

    async fn create(&self, goal: CreateGoal) -> DbResult<GoalRow> {
        let _guard = self.tables.write_lock.lock().await;
        let row = GoalRow {
            id: goal.id,
            group_id: goal.group_id,
            title: goal.title,
            description: goal.description,
            cadence: goal.cadence,
            metric_type: goal.metric_type,
            target_value: goal.target_value,
            unit: goal.unit,
            active_days: goal.active_days,
            created_by: goal.created_by,
            created_at: Utc::now(),
            archived_at: None,
        };
        self.tables.goals.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: UpdateGoal) -> DbResult<GoalRow> {
        let _guard = self.tables.write_lock.lock().await;
        let mut goal = self.tables.goals.get_mut(&id).ok_or(DbError::NotFound)?;
        goal.title = update.title;
        goal.description = update.description;
        goal.target_value = update.target_value;
        goal.unit = update.unit;
        goal.active_days = update.active_days;
        Ok(goal.clone())
    }

    async fn archive(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        let _guard = self.tables.write_lock.lock().await;
        if let Some(mut goal) = self.tables.goals.get_mut(&id) {
            goal.archived_at.get_or_insert(at);
        }
        Ok(())
    }

    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<GoalRow>> {
        let mut goals: Vec<GoalRow> = self
            .tables
            .goals
            .iter()
            .filter(|g| g.group_id == group_id && g.archived_at.is_none())
            .map(|g| g.value().clone())
            .collect();
        goals.sort_by_key(|g| g.created_at);
        Ok(goals)
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn create(&self, entry: CreateProgressEntry) -> DbResult<ProgressEntryRow> {
        let _guard = self.tables.write_lock.lock().await;
        let row = ProgressEntryRow {
            id: entry.id,
            goal_id: entry.goal_id,
            user_id: entry.user_id,
            value: entry.value,
            note: entry.note,
            entry_date: entry.entry_date,
            created_at: Utc::now(),
        };
        self.tables.progress.insert(row.id, row.clone());
        Ok(row)
    }

    async fn daily_participation(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<DailyParticipationRow>> {
        let mut by_day: std::collections::BTreeMap<NaiveDate, std::collections::HashSet<Uuid>> =
            std::collections::BTreeMap::new();
        for entry in self.progress_in_group(group_id, from, to) {
            by_day.entry(entry.entry_date).or_default().insert(entry.user_id);
        }
        Ok(by_day
            .into_iter()
            .map(|(entry_date, users)| DailyParticipationRow {
                entry_date,
                loggers: users.len() as i64,
            })
            .collect())
    }

    async fn count_for_group(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        Ok(self.progress_in_group(group_id, from, to).len() as i64)
    }

    async fn count_distinct_loggers(
        &self,
        group_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        let users: std::collections::HashSet<Uuid> = self
            .progress_in_group(group_id, from, to)
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        Ok(users.len() as i64)
    }

    async fn count_for_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        Ok(self
            .progress_in_group(group_id, from, to)
            .iter()
            .filter(|p| p.user_id == user_id)
            .count() as i64)
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn create(&self, activity: CreateActivity) -> DbResult<ActivityRow> {
        let _guard = self.tables.write_lock.lock().await;
        let row = ActivityRow {
            id: activity.id,
            group_id: activity.group_id,
            user_id: activity.user_id,
            kind: activity.kind,
            payload: activity.payload,
            created_at: Utc::now(),
        };
        self.tables.activities.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ActivityRow>> {
        Ok(self.tables.activities.get(&id).map(|a| a.value().clone()))
    }

    async fn list_for_group(&self, group_id: Uuid, limit: i64) -> DbResult<Vec<ActivityRow>> {
        let mut rows: Vec<ActivityRow> = self
            .tables
            .activities
            .iter()
            .filter(|a| a.group_id == group_id)
            .map(|a| a.value().clone())
            .collect();
        rows.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn upsert_reaction(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        let previous = self
            .tables
            .reactions
            .insert(
                (activity_id, user_id),
                ReactionRow {
                    activity_id,
                    user_id,
                    emoji: emoji.to_string(),
                    created_at: Utc::now(),
                },
            )
            .map(|r| r.emoji);
        Ok(previous.is_some_and(|p| p != emoji))
    }

    async fn delete_reaction(&self, activity_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        Ok(self
            .tables
            .reactions
            .remove(&(activity_id, user_id))
            .is_some())
    }

    async fn list_reactions(&self, activity_id: Uuid) -> DbResult<Vec<ReactionRow>> {
        let mut rows: Vec<ReactionRow> = self
            .tables
            .reactions
            .iter()
            .filter(|r| r.activity_id == activity_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl ShareCardRepository for MemoryStore {
    async fn create_if_absent(&self, card: CreateShareCard) -> DbResult<bool> {
        let _guard = self.tables.write_lock.lock().await;
        let key = (card.user_id, card.group_id);
        if self.tables.share_cards.contains_key(&key) {
            return Ok(false);
        }
        self.tables.share_cards.insert(
            key,
            ShareCardRow {
                id: card.id,
                user_id: card.user_id,
                group_id: card.group_id,
                title: card.title,
                subtitle: card.subtitle,
                stat: card.stat,
                quote: card.quote,
                background: card.background,
                referral_token: card.referral_token,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn find(&self, user_id: Uuid, group_id: Uuid) -> DbResult<Option<ShareCardRow>> {
        Ok(self
            .tables
            .share_cards
            .get(&(user_id, group_id))
            .map(|c| c.value().clone()))
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(store: &MemoryStore) -> Uuid {
        let id = Uuid::new_v4();
        UserRepository::create(
            store,
            CreateUser {
                id,
                display_name: "tester".into(),
            },
        )
        .await
        .unwrap();
        id
    }

    fn regular(creator_id: Uuid, code: &str) -> CreateGroup {
        CreateGroup {
            id: Uuid::new_v4(),
            name: format!("group {code}"),
            description: None,
            creator_id,
            visibility: "private".into(),
            invite_code: code.into(),
            challenge: None,
        }
    }

    #[tokio::test]
    async fn test_create_with_creator_enforces_limit() {
        let store = MemoryStore::new();
        let owner = user(&store).await;

        let first = store
            .create_with_creator(regular(owner, "AAAA1111"), Some(1))
            .await
            .unwrap();
        assert!(matches!(first, CreateGroupOutcome::Created(_)));

        let second = store
            .create_with_creator(regular(owner, "BBBB2222"), Some(1))
            .await
            .unwrap();
        assert!(matches!(
            second,
            CreateGroupOutcome::LimitReached { current_count: 1 }
        ));
    }

    #[tokio::test]
    async fn test_challenge_memberships_do_not_count() {
        let store = MemoryStore::new();
        let owner = user(&store).await;

        let mut challenge = regular(owner, "CHAL0001");
        challenge.challenge = Some(ChallengeFields {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            status: "active".into(),
            template_id: None,
        });
        store.create_with_creator(challenge, None).await.unwrap();

        assert_eq!(store.active_regular_count(owner), 0);
    }

    #[tokio::test]
    async fn test_reaction_upsert_reports_replacement() {
        let store = MemoryStore::new();
        let activity = Uuid::new_v4();
        let reactor = Uuid::new_v4();

        assert!(!store.upsert_reaction(activity, reactor, "🔥").await.unwrap());
        assert!(!store.upsert_reaction(activity, reactor, "🔥").await.unwrap());
        assert!(store.upsert_reaction(activity, reactor, "👏").await.unwrap());
        assert_eq!(store.list_reactions(activity).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_requires_over_limit_status() {
        let store = MemoryStore::new();
        let owner = user(&store).await;
        let outcome = store
            .resolve_over_limit(owner, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, ResolveOutcome::NotOverLimit));
    }
}
