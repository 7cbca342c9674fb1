//! Group heat scoring
//!
//! Momentum over the last seven days: the share of active members who
//! logged progress each day, weighted toward recent days.

use chrono::{Duration, NaiveDate};
use pursue_db::DailyParticipationRow;
use serde::Serialize;

/// Days considered, today included
pub const WINDOW_DAYS: usize = 7;

/// Weight multiplier per day of age
const DECAY: f64 = 0.8;

/// Named heat bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatTier {
    Cold,
    Spark,
    Warm,
    Hot,
    Blazing,
    Inferno,
}

impl HeatTier {
    /// Band for a score in 0..=100
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 10.0 => Self::Cold,
            s if s < 25.0 => Self::Spark,
            s if s < 45.0 => Self::Warm,
            s if s < 65.0 => Self::Hot,
            s if s < 85.0 => Self::Blazing,
            _ => Self::Inferno,
        }
    }

    /// Numeric level, 0 (cold) to 5 (inferno)
    pub const fn level(&self) -> u8 {
        *self as u8
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cold => "Cold",
            Self::Spark => "Spark",
            Self::Warm => "Warm",
            Self::Hot => "Hot",
            Self::Blazing => "Blazing",
            Self::Inferno => "Inferno",
        }
    }
}

/// Computed heat of a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Heat {
    pub score: f64,
    pub tier: u8,
    pub tier_name: &'static str,
    pub member_count: i64,
}

/// Score a group. `loggers_by_age[0]` is today, `[1]` yesterday and so on;
/// missing days count as zero.
pub fn compute(member_count: i64, loggers_by_age: &[i64]) -> Heat {
    let score = if member_count <= 0 {
        0.0
    } else {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for age in 0..WINDOW_DAYS {
            let weight = DECAY.powi(age as i32);
            let loggers = loggers_by_age.get(age).copied().unwrap_or(0);
            let rate = (loggers as f64 / member_count as f64).clamp(0.0, 1.0);
            weighted += weight * rate;
            total_weight += weight;
        }
        (1000.0 * weighted / total_weight).round() / 10.0
    };

    let tier = HeatTier::from_score(score);
    Heat {
        score,
        tier: tier.level(),
        tier_name: tier.name(),
        member_count,
    }
}

/// First day of the window ending on `today`
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WINDOW_DAYS as i64 - 1)
}

/// Arrange per-day participation rows by age relative to `today`
pub fn loggers_by_age(rows: &[DailyParticipationRow], today: NaiveDate) -> [i64; WINDOW_DAYS] {
    let mut by_age = [0; WINDOW_DAYS];
    for row in rows {
        let age = (today - row.entry_date).num_days();
        if let Ok(age) = usize::try_from(age) {
            if let Some(slot) = by_age.get_mut(age) {
                *slot = row.loggers;
            }
        }
    }
    by_age
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_members_is_cold() {
        let heat = compute(0, &[5, 5, 5]);
        assert_eq!(heat.score, 0.0);
        assert_eq!(heat.tier, 0);
        assert_eq!(heat.tier_name, "Cold");
    }

    #[test]
    fn test_everyone_every_day_is_inferno() {
        let heat = compute(4, &[4; WINDOW_DAYS]);
        assert_eq!(heat.score, 100.0);
        assert_eq!(heat.tier, 5);
    }

    #[test]
    fn test_recent_days_weigh_more() {
        let today_only = compute(2, &[2, 0, 0, 0, 0, 0, 0]);
        let week_ago_only = compute(2, &[0, 0, 0, 0, 0, 0, 2]);
        assert!(today_only.score > week_ago_only.score);
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(HeatTier::from_score(9.9), HeatTier::Cold);
        assert_eq!(HeatTier::from_score(10.0), HeatTier::Spark);
        assert_eq!(HeatTier::from_score(45.0), HeatTier::Hot);
        assert_eq!(HeatTier::from_score(85.0), HeatTier::Inferno);
    }

    #[test]
    fn test_loggers_by_age_ignores_out_of_window() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let rows = [
            DailyParticipationRow {
                entry_date: today,
                loggers: 3,
            },
            DailyParticipationRow {
                entry_date: today - Duration::days(2),
                loggers: 1,
            },
            DailyParticipationRow {
                entry_date: today - Duration::days(9),
                loggers: 7,
            },
        ];
        assert_eq!(loggers_by_age(&rows, today), [3, 0, 1, 0, 0, 0, 0]);
    }
}
