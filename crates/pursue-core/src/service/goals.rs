//! Goals and progress logging

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pursue_db::{
    CreateGoal, CreateProgressEntry, GoalRow, ProgressEntryRow, Repositories, UpdateGoal,
};
use pursue_types::{ActiveDays, ActivityKind, Cadence, ChallengeStatus, MetricType};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::groups::{GroupService, WriteAccess};
use super::{record_activity, today};
use crate::error::{CoreError, CoreResult};

const MAX_TITLE_CHARS: usize = 200;
const MAX_NOTE_CHARS: usize = 1000;

/// Create goal input
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cadence: Cadence,
    pub metric_type: MetricType,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub active_days: Option<Vec<i64>>,
}

/// Partial goal update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub active_days: Option<Vec<i64>>,
}

/// Log progress input
#[derive(Debug, Clone)]
pub struct NewProgress {
    pub goal_id: Uuid,
    pub value: f64,
    /// Defaults to today (UTC)
    pub entry_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// A goal as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
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
}

impl From<GoalRow> for GoalView {
    fn from(row: GoalRow) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            title: row.title,
            description: row.description,
            cadence: row.cadence,
            metric_type: row.metric_type,
            target_value: row.target_value,
            unit: row.unit,
            active_days: row.active_days,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// A logged progress entry
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub value: f64,
    pub note: Option<String>,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<ProgressEntryRow> for ProgressView {
    fn from(row: ProgressEntryRow) -> Self {
        Self {
            id: row.id,
            goal_id: row.goal_id,
            user_id: row.user_id,
            value: row.value,
            note: row.note,
            entry_date: row.entry_date,
            created_at: row.created_at,
        }
    }
}

/// Goal mutations on a challenge: open while upcoming, locked while
/// running, closed afterwards.
fn check_goal_mutation(status: Option<ChallengeStatus>) -> CoreResult<()> {
    match status {
        None | Some(ChallengeStatus::Upcoming) => Ok(()),
        Some(ChallengeStatus::Active) => Err(CoreError::ChallengeGoalsLocked),
        Some(ChallengeStatus::Completed | ChallengeStatus::Cancelled) => {
            Err(CoreError::ChallengeEnded)
        }
    }
}

fn validate_title(title: &str) -> CoreResult<String> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(CoreError::validation(format!(
            "title must be 1 to {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_target(target: Option<f64>) -> CoreResult<Option<f64>> {
    match target {
        Some(t) if !t.is_finite() || t <= 0.0 => {
            Err(CoreError::validation("target_value must be greater than 0"))
        }
        other => Ok(other),
    }
}

fn validate_active_days(days: Option<&[i64]>, cadence: Cadence) -> CoreResult<Option<Vec<i32>>> {
    days.map(|days| {
        ActiveDays::for_cadence(days, cadence)
            .map(|d| d.days().iter().map(|&day| i32::from(day)).collect())
            .map_err(|e| CoreError::Validation(e.to_string()))
    })
    .transpose()
}

/// Check a logged value against the goal's metric
pub(crate) fn validate_value(
    metric: MetricType,
    value: f64,
    note: Option<&str>,
) -> CoreResult<()> {
    if !value.is_finite() {
        return Err(CoreError::validation("value must be a finite number"));
    }
    match metric {
        MetricType::Binary if value != 0.0 && value != 1.0 => {
            Err(CoreError::validation("binary goals take a value of 0 or 1"))
        }
        MetricType::Numeric | MetricType::Duration if value < 0.0 => {
            Err(CoreError::validation("value must not be negative"))
        }
        MetricType::Journal if note.map_or(true, |n| n.trim().is_empty()) => {
            Err(CoreError::validation("journal entries need a note"))
        }
        _ => Ok(()),
    }
}

/// Goal service
#[derive(Clone)]
pub struct GoalService {
    repos: Repositories,
    groups: GroupService,
}

impl GoalService {
    pub fn new(repos: Repositories, groups: GroupService) -> Self {
        Self { repos, groups }
    }

    /// Add a goal to a group. Admins only.
    #[instrument(skip_all, fields(user_id = %user_id, group_id = %input.group_id))]
    pub async fn create_goal(&self, user_id: Uuid, input: NewGoal) -> CoreResult<GoalView> {
        let access = self.manage_goals(user_id, input.group_id).await?;

        let title = validate_title(&input.title)?;
        let target_value = validate_target(input.target_value)?;
        let active_days = validate_active_days(input.active_days.as_deref(), input.cadence)?;

        let row = self
            .repos
            .goals
            .create(CreateGoal {
                id: Uuid::new_v4(),
                group_id: access.group.id,
                title,
                description: input.description,
                cadence: input.cadence.as_str().to_string(),
                metric_type: input.metric_type.as_str().to_string(),
                target_value,
                unit: input.unit,
                active_days,
                created_by: user_id,
            })
            .await?;

        info!(goal_id = %row.id, "goal created");
        Ok(row.into())
    }

    /// Change a goal's editable fields
    #[instrument(skip_all, fields(user_id = %user_id, goal_id = %goal_id))]
    pub async fn update_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        update: GoalUpdate,
    ) -> CoreResult<GoalView> {
        let goal = self.find_goal(goal_id).await?;
        self.manage_goals(user_id, goal.group_id).await?;

        let cadence: Cadence = goal.cadence.parse()?;
        let active_days = match update.active_days.as_deref() {
            Some(days) => validate_active_days(Some(days), cadence)?,
            None => goal.active_days,
        };

        let row = self
            .repos
            .goals
            .update(
                goal_id,
                UpdateGoal {
                    title: match update.title {
                        Some(title) => validate_title(&title)?,
                        None => goal.title,
                    },
                    description: update.description.or(goal.description),
                    target_value: validate_target(update.target_value)?.or(goal.target_value),
                    unit: update.unit.or(goal.unit),
                    active_days,
                },
            )
            .await?;

        Ok(row.into())
    }

    /// Archive a goal. Its progress history is kept.
    #[instrument(skip_all, fields(user_id = %user_id, goal_id = %goal_id))]
    pub async fn archive_goal(&self, user_id: Uuid, goal_id: Uuid) -> CoreResult<()> {
        let goal = self.find_goal(goal_id).await?;
        self.manage_goals(user_id, goal.group_id).await?;
        self.repos.goals.archive(goal_id, Utc::now()).await?;
        info!("goal archived");
        Ok(())
    }

    /// Goals of a group, for its members
    pub async fn list_goals(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<Vec<GoalView>> {
        self.groups.require_member(user_id, group_id).await?;
        Ok(self
            .repos
            .goals
            .list_for_group(group_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Record progress on a goal
    #[instrument(skip_all, fields(user_id = %user_id, goal_id = %input.goal_id))]
    pub async fn log_progress(&self, user_id: Uuid, input: NewProgress) -> CoreResult<ProgressView> {
        let goal = self.find_goal(input.goal_id).await?;
        let access = self.groups.authorize_write(user_id, goal.group_id).await?;

        let today = today();
        let entry_date = input.entry_date.unwrap_or(today);
        if entry_date > today + Duration::days(1) {
            return Err(CoreError::validation(
                "entry_date cannot be more than one day in the future",
            ));
        }
        check_progress_window(&access, entry_date)?;

        let metric: MetricType = goal.metric_type.parse()?;
        let note = input
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS) {
            return Err(CoreError::validation(format!(
                "note must be at most {MAX_NOTE_CHARS} characters"
            )));
        }
        validate_value(metric, input.value, note.as_deref())?;

        if let Some(days) = goal.active_days.as_deref() {
            let days: Vec<i64> = days.iter().map(|&d| i64::from(d)).collect();
            let active = ActiveDays::parse(&days).map_err(|e| CoreError::Internal(e.to_string()))?;
            if !active.includes(entry_date) {
                return Err(CoreError::validation(
                    "goal is not active on that day of the week",
                ));
            }
        }

        let row = self
            .repos
            .progress
            .create(CreateProgressEntry {
                id: Uuid::new_v4(),
                goal_id: goal.id,
                user_id,
                value: input.value,
                note,
                entry_date,
            })
            .await?;

        record_activity(
            &self.repos,
            goal.group_id,
            user_id,
            ActivityKind::ProgressLogged,
            json!({
                "goal_id": goal.id,
                "goal_title": goal.title,
                "value": row.value,
                "entry_date": row.entry_date,
            }),
        )
        .await?;
        metrics::counter!("pursue_progress_logged_total").increment(1);

        Ok(row.into())
    }

    async fn find_goal(&self, goal_id: Uuid) -> CoreResult<GoalRow> {
        self.repos
            .goals
            .find_by_id(goal_id)
            .await?
            .filter(|g| g.archived_at.is_none())
            .ok_or(CoreError::GoalNotFound)
    }

    async fn manage_goals(&self, user_id: Uuid, group_id: Uuid) -> CoreResult<WriteAccess> {
        let access = self.groups.authorize_write(user_id, group_id).await?;
        check_goal_mutation(access.challenge_status)?;
        access.require_manager()?;
        Ok(access)
    }
}

/// Progress on a challenge is only accepted while it runs, and only for
/// dates inside its window.
fn check_progress_window(access: &WriteAccess, entry_date: NaiveDate) -> CoreResult<()> {
    match access.challenge_status {
        None => Ok(()),
        Some(ChallengeStatus::Upcoming) => Err(CoreError::ChallengeNotStarted),
        Some(ChallengeStatus::Completed | ChallengeStatus::Cancelled) => {
            Err(CoreError::ChallengeEnded)
        }
        Some(ChallengeStatus::Active) => {
            let inside = match (
                access.group.challenge_start_date,
                access.group.challenge_end_date,
            ) {
                (Some(start), Some(end)) => entry_date >= start && entry_date <= end,
                _ => false,
            };
            if inside {
                Ok(())
            } else {
                Err(CoreError::validation(
                    "entry_date is outside the challenge window",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_mutation_gate() {
        assert!(check_goal_mutation(None).is_ok());
        assert!(check_goal_mutation(Some(ChallengeStatus::Upcoming)).is_ok());
        assert!(matches!(
            check_goal_mutation(Some(ChallengeStatus::Active)),
            Err(CoreError::ChallengeGoalsLocked)
        ));
        assert!(matches!(
            check_goal_mutation(Some(ChallengeStatus::Cancelled)),
            Err(CoreError::ChallengeEnded)
        ));
    }

    #[test]
    fn test_value_rules() {
        assert!(validate_value(MetricType::Binary, 1.0, None).is_ok());
        assert!(validate_value(MetricType::Binary, 0.5, None).is_err());
        assert!(validate_value(MetricType::Numeric, -1.0, None).is_err());
        assert!(validate_value(MetricType::Duration, 45.0, None).is_ok());
        assert!(validate_value(MetricType::Journal, 0.0, Some("  ")).is_err());
        assert!(validate_value(MetricType::Journal, 0.0, Some("felt good")).is_ok());
    }

    #[test]
    fn test_active_days_require_daily() {
        assert!(validate_active_days(Some(&[1, 3][..]), Cadence::Weekly).is_err());
        assert_eq!(
            validate_active_days(Some(&[5, 1][..]), Cadence::Daily).unwrap(),
            Some(vec![1, 5])
        );
        assert_eq!(validate_active_days(None, Cadence::Weekly).unwrap(), None);
    }

    #[test]
    fn test_target_must_be_positive() {
        assert!(validate_target(Some(0.0)).is_err());
        assert!(validate_target(Some(3.0)).is_ok());
    }
}
