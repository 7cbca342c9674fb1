//! Stateful services over the repositories
//!
//! Every mutating entry point syncs the caller's subscription state first
//! and then consults [`crate::policy`] and, for challenge groups,
//! [`crate::challenge`] before writing.

mod activity;
mod challenges;
mod goals;
mod groups;
mod subscription;

pub use activity::{ActivityService, ActivityView, ReactionOutcome, ReactionView, RecapReport};
pub use challenges::{ChallengeService, NewChallenge, ShareCardView, StatusUpdateReport};
pub use goals::{GoalService, GoalUpdate, GoalView, NewGoal, NewProgress, ProgressView};
pub use groups::{
    ChallengeInfo, GroupDetail, GroupListItem, GroupService, GroupView, JoinResult,
    MembershipView, NewGroup, WriteAccess,
};
pub use subscription::{
    AccountState, ExpiryReport, GroupSummary, SelectGroupOutcome, SubscriptionDetails,
    SubscriptionService, SubscriptionView,
};

use chrono::{NaiveDate, Utc};
use pursue_db::{CreateActivity, DbError, Repositories};
use pursue_types::ActivityKind;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::CoreResult;

/// Attempts at finding a free invite code
const INVITE_CODE_ATTEMPTS: usize = 5;

/// All services wired to one repository bundle
#[derive(Clone)]
pub struct Services {
    pub subscriptions: SubscriptionService,
    pub groups: GroupService,
    pub challenges: ChallengeService,
    pub goals: GoalService,
    pub activity: ActivityService,
}

impl Services {
    pub fn new(repos: Repositories, config: CoreConfig) -> Self {
        let subscriptions = SubscriptionService::new(repos.clone(), config.clone());
        let groups = GroupService::new(repos.clone(), subscriptions.clone());
        Self {
            challenges: ChallengeService::new(repos.clone(), subscriptions.clone()),
            goals: GoalService::new(repos.clone(), groups.clone()),
            activity: ActivityService::new(repos, groups.clone(), config),
            subscriptions,
            groups,
        }
    }
}

/// Current UTC calendar date
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Eight uppercase alphanumerics
pub(crate) fn invite_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase()
}

/// Run an insert with fresh invite codes until one does not collide
pub(crate) async fn with_invite_code<T, F, Fut>(mut insert: F) -> CoreResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<T, DbError>>,
{
    let mut last = None;
    for _ in 0..INVITE_CODE_ATTEMPTS {
        match insert(invite_code()).await {
            Err(DbError::Conflict(constraint)) if constraint.contains("invite_code") => {
                tracing::debug!("invite code collision, retrying");
                last = Some(DbError::Conflict(constraint));
            }
            other => return Ok(other?),
        }
    }
    Err(last
        .map(Into::into)
        .unwrap_or_else(|| crate::CoreError::Internal("no invite code attempts".into())))
}

/// Append an entry to a group's activity feed
pub(crate) async fn record_activity(
    repos: &Repositories,
    group_id: Uuid,
    user_id: Uuid,
    kind: ActivityKind,
    payload: serde_json::Value,
) -> CoreResult<()> {
    repos
        .activities
        .create(CreateActivity {
            id: Uuid::new_v4(),
            group_id,
            user_id: (!kind.is_system()).then_some(user_id),
            kind: kind.as_str().to_string(),
            payload,
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_code_shape() {
        let code = invite_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
