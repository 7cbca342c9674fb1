//! Activity feed, reactions, heat and the weekly recap job

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pursue_db::{ActivityRow, ReactionRow, Repositories};
use pursue_types::ActivityKind;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::groups::GroupService;
use super::{record_activity, today};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::heat::{self, Heat};

const MAX_EMOJI_CHARS: usize = 16;

/// A reaction on an activity
#[derive(Debug, Clone, Serialize)]
pub struct ReactionView {
    pub user_id: Uuid,
    pub emoji: String,
}

impl From<ReactionRow> for ReactionView {
    fn from(row: ReactionRow) -> Self {
        Self {
            user_id: row.user_id,
            emoji: row.emoji,
        }
    }
}

/// Feed entry
#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<ReactionView>,
}

impl ActivityView {
    fn new(row: ActivityRow, reactions: Vec<ReactionRow>) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            user_id: row.user_id,
            kind: row.kind,
            payload: row.payload,
            created_at: row.created_at,
            reactions: reactions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of adding a reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionOutcome {
    /// A different emoji from the same user was replaced
    pub replaced: bool,
}

/// Result of the weekly recap job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecapReport {
    pub groups_processed: u64,
    pub recaps_created: u64,
}

/// Activity service
#[derive(Clone)]
pub struct ActivityService {
    repos: Repositories,
    groups: GroupService,
    config: CoreConfig,
}

impl ActivityService {
    pub fn new(repos: Repositories, groups: GroupService, config: CoreConfig) -> Self {
        Self {
            repos,
            groups,
            config,
        }
    }

    /// Newest activity of a group, with reactions
    pub async fn feed(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        limit: Option<i64>,
    ) -> CoreResult<Vec<ActivityView>> {
        self.groups.require_member(user_id, group_id).await?;
        let limit = limit
            .unwrap_or(self.config.default_activity_limit)
            .clamp(1, self.config.max_activity_limit);

        let rows = self.repos.activities.list_for_group(group_id, limit).await?;
        let mut feed = Vec::with_capacity(rows.len());
        for row in rows {
            let reactions = self.repos.activities.list_reactions(row.id).await?;
            feed.push(ActivityView::new(row, reactions));
        }
        Ok(feed)
    }

    /// Add or replace the caller's reaction
    #[instrument(skip_all, fields(user_id = %user_id, activity_id = %activity_id))]
    pub async fn react(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
        emoji: &str,
    ) -> CoreResult<ReactionOutcome> {
        let emoji = emoji.trim();
        if emoji.is_empty() || emoji.chars().count() > MAX_EMOJI_CHARS {
            return Err(CoreError::validation(format!(
                "emoji must be 1 to {MAX_EMOJI_CHARS} characters"
            )));
        }

        let activity = self.find_activity(activity_id).await?;
        self.groups.require_member(user_id, activity.group_id).await?;

        let replaced = self
            .repos
            .activities
            .upsert_reaction(activity_id, user_id, emoji)
            .await?;
        Ok(ReactionOutcome { replaced })
    }

    /// Remove the caller's reaction. Removing a missing reaction is a
    /// no-op.
    pub async fn remove_reaction(&self, user_id: Uuid, activity_id: Uuid) -> CoreResult<()> {
        let activity = self.find_activity(activity_id).await?;
        self.groups.require_member(user_id, activity.group_id).await?;
        self.repos
            .activities
            .delete_reaction(activity_id, user_id)
            .await?;
        Ok(())
    }

    /// Heat of a group as of today
    pub async fn heat(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<Heat> {
        self.groups.require_member(user_id, group_id).await?;
        self.heat_as_of(group_id, today()).await
    }

    async fn heat_as_of(&self, group_id: Uuid, day: NaiveDate) -> CoreResult<Heat> {
        let members = self.repos.memberships.list_active_members(group_id).await?;
        let rows = self
            .repos
            .progress
            .daily_participation(group_id, heat::window_start(day), day)
            .await?;
        Ok(heat::compute(
            members.len() as i64,
            &heat::loggers_by_age(&rows, day),
        ))
    }

    /// Post a recap of the seven days ending the day before `as_of` to every
    /// group with members
    #[instrument(skip(self))]
    pub async fn run_weekly_recap(&self, as_of: NaiveDate) -> CoreResult<RecapReport> {
        let to = as_of - Duration::days(1);
        let from = heat::window_start(to);
        let mut report = RecapReport::default();

        for group in self.repos.groups.list_with_active_members().await? {
            report.groups_processed += 1;
            match self.recap(group.id, group.creator_id, from, to).await {
                Ok(()) => report.recaps_created += 1,
                Err(e) => warn!(group_id = %group.id, error = %e, "weekly recap failed"),
            }
        }

        info!(
            groups_processed = report.groups_processed,
            recaps_created = report.recaps_created,
            "weekly recap finished"
        );
        Ok(report)
    }

    async fn recap(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<()> {
        let entries = self.repos.progress.count_for_group(group_id, from, to).await?;
        let loggers = self
            .repos
            .progress
            .count_distinct_loggers(group_id, from, to)
            .await?;
        let heat = self.heat_as_of(group_id, to).await?;

        record_activity(
            &self.repos,
            group_id,
            creator_id,
            ActivityKind::WeeklyRecap,
            json!({
                "week_start": from,
                "week_end": to,
                "entries_logged": entries,
                "active_loggers": loggers,
                "member_count": heat.member_count,
                "heat_score": heat.score,
                "heat_tier": heat.tier_name,
            }),
        )
        .await
    }

    async fn find_activity(&self, activity_id: Uuid) -> CoreResult<ActivityRow> {
        self.repos
            .activities
            .find_by_id(activity_id)
            .await?
            .ok_or(CoreError::ActivityNotFound)
    }
}
