//! Challenge lifecycle
//!
//! A challenge is a time-boxed group. Its status is derived from the
//! calendar except for cancellation, which is an explicit transition:
//!
//! ```text
//! Upcoming ──start──▶ Active ──end──▶ Completed
//!     │                  │
//!     └────cancel────────┴──────────▶ Cancelled
//! ```

use chrono::{Duration, NaiveDate};
use pursue_types::{Cadence, ChallengeStatus, MetricType};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// Longest allowed challenge, in inclusive days
pub const MAX_CHALLENGE_DAYS: i64 = 365;

/// Status of a challenge created on `today` that starts on `start`
pub fn initial_status(today: NaiveDate, start: NaiveDate) -> ChallengeStatus {
    if start > today {
        ChallengeStatus::Upcoming
    } else {
        ChallengeStatus::Active
    }
}

/// Calendar-driven transition. Terminal states are fixed points and
/// status never moves backwards.
pub fn next_state(
    today: NaiveDate,
    stored: ChallengeStatus,
    start: NaiveDate,
    end: NaiveDate,
) -> ChallengeStatus {
    match stored {
        ChallengeStatus::Completed | ChallengeStatus::Cancelled => stored,
        ChallengeStatus::Upcoming | ChallengeStatus::Active if today > end => {
            ChallengeStatus::Completed
        }
        ChallengeStatus::Upcoming if today >= start => ChallengeStatus::Active,
        _ => stored,
    }
}

/// Explicit cancellation
pub fn cancel(stored: ChallengeStatus) -> CoreResult<ChallengeStatus> {
    if stored.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "challenge is already {stored}"
        )));
    }
    Ok(ChallengeStatus::Cancelled)
}

/// Validate the window of a new challenge
pub fn validate_dates(today: NaiveDate, start: NaiveDate, end: NaiveDate) -> CoreResult<()> {
    if start < today {
        return Err(CoreError::validation("start_date must not be in the past"));
    }
    if end < start {
        return Err(CoreError::validation("end_date must not be before start_date"));
    }
    if (end - start).num_days() + 1 > MAX_CHALLENGE_DAYS {
        return Err(CoreError::validation(format!(
            "challenges may last at most {MAX_CHALLENGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Goal seeded into a challenge created from a template
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TemplateGoal {
    pub title: &'static str,
    pub cadence: Cadence,
    pub metric_type: MetricType,
    pub target_value: Option<f64>,
    pub unit: Option<&'static str>,
}

/// Built-in challenge template
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub duration_days: i64,
    pub goals: &'static [TemplateGoal],
}

impl ChallengeTemplate {
    /// Last day of a run starting on `start`
    pub fn end_date(&self, start: NaiveDate) -> NaiveDate {
        start + Duration::days(self.duration_days - 1)
    }
}

/// Static template catalog
pub const TEMPLATES: &[ChallengeTemplate] = &[
    ChallengeTemplate {
        id: "30-day-fitness",
        title: "30-Day Fitness",
        description: "Move every day for a month.",
        category: "fitness",
        duration_days: 30,
        goals: &[TemplateGoal {
            title: "Work out",
            cadence: Cadence::Daily,
            metric_type: MetricType::Duration,
            target_value: Some(30.0),
            unit: Some("minutes"),
        }],
    },
    ChallengeTemplate {
        id: "21-day-reading",
        title: "21-Day Reading",
        description: "Build a reading habit in three weeks.",
        category: "learning",
        duration_days: 21,
        goals: &[TemplateGoal {
            title: "Read",
            cadence: Cadence::Daily,
            metric_type: MetricType::Numeric,
            target_value: Some(20.0),
            unit: Some("pages"),
        }],
    },
    ChallengeTemplate {
        id: "14-day-mindfulness",
        title: "14-Day Mindfulness",
        description: "Two weeks of daily meditation and reflection.",
        category: "wellness",
        duration_days: 14,
        goals: &[
            TemplateGoal {
                title: "Meditate",
                cadence: Cadence::Daily,
                metric_type: MetricType::Duration,
                target_value: Some(10.0),
                unit: Some("minutes"),
            },
            TemplateGoal {
                title: "Gratitude journal",
                cadence: Cadence::Daily,
                metric_type: MetricType::Journal,
                target_value: None,
                unit: None,
            },
        ],
    },
    ChallengeTemplate {
        id: "7-day-hydration",
        title: "7-Day Hydration",
        description: "Drink enough water every day for a week.",
        category: "health",
        duration_days: 7,
        goals: &[TemplateGoal {
            title: "Drink 8 glasses of water",
            cadence: Cadence::Daily,
            metric_type: MetricType::Binary,
            target_value: None,
            unit: None,
        }],
    },
];

/// Find a template by id
pub fn template(id: &str) -> Option<&'static ChallengeTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

const QUOTES: &[&str] = &[
    "Small steps every day add up to big results.",
    "Discipline is choosing what you want most over what you want now.",
    "You showed up. That is what winners do.",
    "Progress, not perfection.",
];

const BACKGROUNDS: &[&str] = &["sunrise", "ocean", "forest", "ember"];

/// Text of a challenge completion share card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCardContent {
    pub title: String,
    pub subtitle: String,
    pub stat: String,
    pub quote: String,
    pub background: String,
}

/// Compose a share card. `seed` picks the quote and background so one user
/// always gets the same card for the same challenge.
pub fn share_card_content(
    challenge_name: &str,
    start: NaiveDate,
    end: NaiveDate,
    entries_logged: i64,
    seed: u128,
) -> ShareCardContent {
    let days = (end - start).num_days() + 1;
    let pick = |len: usize| (seed % len as u128) as usize;
    let stat = match entries_logged {
        1 => format!("1 check-in over {days} days"),
        n => format!("{n} check-ins over {days} days"),
    };

    ShareCardContent {
        title: "Challenge complete!".to_string(),
        subtitle: challenge_name.to_string(),
        stat,
        quote: QUOTES[pick(QUOTES.len())].to_string(),
        background: BACKGROUNDS[pick(BACKGROUNDS.len())].to_string(),
    }
}
