//! Challenge creation, cancellation, the status job and share cards

use chrono::{DateTime, NaiveDate, Utc};
use pursue_db::{
    ChallengeFields, CreateGoal, CreateGroup, CreateGroupOutcome, CreateShareCard, GroupRow,
    Repositories, ShareCardRow,
};
use pursue_types::{ActivityKind, ChallengeStatus, MemberRole, Tier, Visibility};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::groups::{effective_status, validate_description, GroupView};
use super::subscription::SubscriptionService;
use super::{record_activity, today, with_invite_code};
use crate::challenge::{self, ChallengeTemplate, TEMPLATES};
use crate::error::{CoreError, CoreResult};
use crate::policy;

/// Create challenge input. Either `template_id` or `end_date` must be set.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Completion share card as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ShareCardView {
    pub challenge_id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub stat: String,
    pub quote: String,
    pub background: String,
    pub referral_token: String,
    pub created_at: DateTime<Utc>,
}

impl From<ShareCardRow> for ShareCardView {
    fn from(row: ShareCardRow) -> Self {
        Self {
            challenge_id: row.group_id,
            title: row.title,
            subtitle: row.subtitle,
            stat: row.stat,
            quote: row.quote,
            background: row.background,
            referral_token: row.referral_token,
            created_at: row.created_at,
        }
    }
}

/// Result of the status-update job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusUpdateReport {
    pub activated: u64,
    pub completed: u64,
    pub completion_notifications: u64,
    /// Challenges left for the next run after an error
    pub failures: u64,
}

/// Challenge service
#[derive(Clone)]
pub struct ChallengeService {
    repos: Repositories,
    subscriptions: SubscriptionService,
}

impl ChallengeService {
    pub fn new(repos: Repositories, subscriptions: SubscriptionService) -> Self {
        Self {
            repos,
            subscriptions,
        }
    }

    /// Built-in templates
    pub fn templates(&self) -> &'static [ChallengeTemplate] {
        TEMPLATES
    }

    /// Create a challenge from a template (any tier) or from scratch
    /// (premium only). The creator's membership does not count toward the
    /// group limit.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_challenge(
        &self,
        user_id: Uuid,
        input: NewChallenge,
    ) -> CoreResult<GroupView> {
        let state = self.subscriptions.sync(user_id).await?;
        if state.is_over_limit() {
            return Err(policy::limit_reached(state.tier, state.current_group_count));
        }

        let template = match input.template_id.as_deref() {
            Some(id) => Some(challenge::template(id).ok_or_else(|| {
                CoreError::Validation(format!("unknown challenge template: {id}"))
            })?),
            None if state.tier.can_create_custom_challenge() => None,
            None => return Err(CoreError::PremiumRequired),
        };

        let start = input.start_date;
        let end = match (template, input.end_date) {
            (Some(t), _) => t.end_date(start),
            (None, Some(end)) => end,
            (None, None) => {
                return Err(CoreError::validation(
                    "end_date is required without a template",
                ))
            }
        };
        let today = today();
        challenge::validate_dates(today, start, end)?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or_else(|| template.map(|t| t.title.to_string()))
            .ok_or_else(|| CoreError::validation("name is required"))?;
        if name.chars().count() > 100 {
            return Err(CoreError::validation("name must be at most 100 characters"));
        }
        let description = validate_description(input.description)?
            .or_else(|| template.map(|t| t.description.to_string()));

        let status = challenge::initial_status(today, start);
        let group_id = Uuid::new_v4();
        let outcome = with_invite_code(|invite_code| {
            let groups = self.repos.groups.clone();
            let group = CreateGroup {
                id: group_id,
                name: name.clone(),
                description: description.clone(),
                creator_id: user_id,
                visibility: Visibility::Private.as_str().to_string(),
                invite_code,
                challenge: Some(ChallengeFields {
                    start_date: start,
                    end_date: end,
                    status: status.as_str().to_string(),
                    template_id: template.map(|t| t.id.to_string()),
                }),
            };
            async move { groups.create_with_creator(group, None).await }
        })
        .await?;

        let CreateGroupOutcome::Created(row) = outcome else {
            return Err(CoreError::Internal(
                "limit reached on an unchecked challenge insert".to_string(),
            ));
        };

        for goal in template.map(|t| t.goals).unwrap_or_default() {
            self.repos
                .goals
                .create(CreateGoal {
                    id: Uuid::new_v4(),
                    group_id: row.id,
                    title: goal.title.to_string(),
                    description: None,
                    cadence: goal.cadence.as_str().to_string(),
                    metric_type: goal.metric_type.as_str().to_string(),
                    target_value: goal.target_value,
                    unit: goal.unit.map(str::to_string),
                    active_days: None,
                    created_by: user_id,
                })
                .await?;
        }

        record_activity(
            &self.repos,
            row.id,
            user_id,
            ActivityKind::GroupCreated,
            json!({ "name": row.name, "challenge": true }),
        )
        .await?;
        info!(group_id = %row.id, %status, "challenge created");
        metrics::counter!("pursue_groups_created_total", "kind" => "challenge").increment(1);

        GroupView::from_row(row, today)
    }

    /// Challenges the user is an active member of
    pub async fn list_challenges(&self, user_id: Uuid) -> CoreResult<Vec<GroupView>> {
        let today = today();
        self.repos
            .groups
            .list_challenges_for_user(user_id)
            .await?
            .into_iter()
            .map(|row| GroupView::from_row(row, today))
            .collect()
    }

    /// A single challenge, visible to its members
    pub async fn get_challenge(&self, user_id: Uuid, challenge_id: Uuid) -> CoreResult<GroupView> {
        let group = self.find_challenge(challenge_id).await?;
        self.repos
            .memberships
            .find(challenge_id, user_id)
            .await?
            .filter(|m| m.is_active())
            .ok_or(CoreError::NotAMember)?;
        GroupView::from_row(group, today())
    }

    /// Cancel a challenge. Creator only, and only before it ends.
    #[instrument(skip_all, fields(user_id = %user_id, challenge_id = %challenge_id))]
    pub async fn cancel_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> CoreResult<GroupView> {
        let group = self.find_challenge(challenge_id).await?;
        let is_creator = self
            .repos
            .memberships
            .find(challenge_id, user_id)
            .await?
            .map(|m| m.role())
            .transpose()?
            == Some(MemberRole::Creator);
        if !is_creator {
            return Err(CoreError::Forbidden(
                "only the challenge creator can cancel it".to_string(),
            ));
        }

        let today = today();
        let current = effective_status(&group, today)?.ok_or(CoreError::GroupNotFound)?;
        challenge::cancel(current)?;

        if !self.repos.groups.cancel_challenge(challenge_id).await? {
            return Err(CoreError::InvalidState(
                "challenge is no longer open".to_string(),
            ));
        }
        info!("challenge cancelled");
        metrics::counter!("pursue_challenge_transitions_total", "to" => "cancelled").increment(1);

        let group = self.find_challenge(challenge_id).await?;
        GroupView::from_row(group, today)
    }

    /// The caller's completion card for a challenge
    pub async fn share_card(&self, user_id: Uuid, challenge_id: Uuid) -> CoreResult<ShareCardView> {
        self.repos
            .share_cards
            .find(user_id, challenge_id)
            .await?
            .map(Into::into)
            .ok_or(CoreError::ShareCardNotFound)
    }

    // =========================================================================
    // Status job
    // =========================================================================

    /// Apply calendar transitions to every open challenge as of `today`.
    /// A challenge that fails is counted and skipped; the rest still run.
    #[instrument(skip(self))]
    pub async fn run_status_update(&self, today: NaiveDate) -> CoreResult<StatusUpdateReport> {
        let mut report = StatusUpdateReport::default();

        for group in self.repos.groups.list_open_challenges().await? {
            if let Err(e) = self.advance(&group, today, &mut report).await {
                report.failures += 1;
                warn!(challenge_id = %group.id, error = %e, "challenge status update failed");
            }
        }

        Ok(report)
    }

    async fn advance(
        &self,
        group: &GroupRow,
        today: NaiveDate,
        report: &mut StatusUpdateReport,
    ) -> CoreResult<()> {
        let Some(stored) = group.stored_challenge_status()? else {
            return Ok(());
        };
        let Some(next) = effective_status(group, today)? else {
            return Ok(());
        };
        if next == stored {
            return Ok(());
        }

        if !self
            .repos
            .groups
            .transition_challenge(group.id, stored.as_str(), next.as_str())
            .await?
        {
            // changed by someone else since the listing
            return Ok(());
        }

        match next {
            ChallengeStatus::Active => report.activated += 1,
            ChallengeStatus::Completed => match self.complete(group).await {
                Ok(notified) => {
                    report.completed += 1;
                    report.completion_notifications += notified;
                }
                Err(e) => {
                    // Reopen so the next run retries the completion
                    self.repos
                        .groups
                        .transition_challenge(group.id, next.as_str(), stored.as_str())
                        .await?;
                    return Err(e);
                }
            },
            _ => {}
        }

        metrics::counter!("pursue_challenge_transitions_total", "to" => next.as_str())
            .increment(1);
        info!(challenge_id = %group.id, from = %stored, to = %next, "challenge transitioned");
        Ok(())
    }

    /// Completion side effects. Returns the number of members to notify.
    ///
    /// Nothing after the activity entry may fail the completion: share cards
    /// are best effort per member.
    async fn complete(&self, group: &GroupRow) -> CoreResult<u64> {
        let members = self.repos.memberships.list_active_members(group.id).await?;
        record_activity(
            &self.repos,
            group.id,
            group.creator_id,
            ActivityKind::ChallengeCompleted,
            json!({ "name": group.name, "participants": members.len() }),
        )
        .await?;

        if let (Some(start), Some(end)) = (group.challenge_start_date, group.challenge_end_date) {
            for member in &members {
                if let Err(e) = self.share_card_for(group, member.user_id, start, end).await {
                    warn!(user_id = %member.user_id, error = %e, "share card not created");
                }
            }
        }

        Ok(members.len() as u64)
    }

    /// Issue a card if the member is premium right now. The cached tier on
    /// the user row may predate a lapse, so it is synced first.
    async fn share_card_for(
        &self,
        group: &GroupRow,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<()> {
        if self.subscriptions.sync(user_id).await?.tier != Tier::Premium {
            return Ok(());
        }

        let entries = self
            .repos
            .progress
            .count_for_member(group.id, user_id, start, end)
            .await?;
        let seed = user_id.as_u128() ^ group.id.as_u128();
        let content = challenge::share_card_content(&group.name, start, end, entries, seed);

        self.repos
            .share_cards
            .create_if_absent(CreateShareCard {
                id: Uuid::new_v4(),
                user_id,
                group_id: group.id,
                title: content.title,
                subtitle: content.subtitle,
                stat: content.stat,
                quote: content.quote,
                background: content.background,
                referral_token: Uuid::new_v4().simple().to_string(),
            })
            .await?;
        Ok(())
    }

    async fn find_challenge(&self, challenge_id: Uuid) -> CoreResult<GroupRow> {
        self.repos
            .groups
            .find_by_id(challenge_id)
            .await?
            .filter(|g| g.is_challenge)
            .ok_or(CoreError::GroupNotFound)
    }
}
