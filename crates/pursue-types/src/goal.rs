//! Goal types

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ActiveDaysError;

/// How often a goal is meant to be hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

string_enum!(Cadence, "cadence", {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
});

/// What a progress entry measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Done / not done (value 0 or 1)
    Binary,
    /// A count toward a target
    Numeric,
    /// Minutes spent
    Duration,
    /// Free-text entry; the note is the payload
    Journal,
}

string_enum!(MetricType, "metric type", {
    Binary => "binary",
    Numeric => "numeric",
    Duration => "duration",
    Journal => "journal",
});

/// Weekdays a daily goal applies to, Sunday = 0.
///
/// Always non-empty, unique and sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct ActiveDays(Vec<u8>);

impl ActiveDays {
    /// Validate a raw day list without reference to a cadence
    pub fn parse(values: &[i64]) -> Result<Self, ActiveDaysError> {
        if values.is_empty() {
            return Err(ActiveDaysError::Empty);
        }

        let mut days = Vec::with_capacity(values.len());
        for &value in values {
            let day = u8::try_from(value)
                .ok()
                .filter(|d| *d <= 6)
                .ok_or(ActiveDaysError::OutOfRange(value))?;
            if days.contains(&day) {
                return Err(ActiveDaysError::Duplicate(day));
            }
            days.push(day);
        }
        days.sort_unstable();

        Ok(Self(days))
    }

    /// Validate a day list for a goal with the given cadence
    pub fn for_cadence(values: &[i64], cadence: Cadence) -> Result<Self, ActiveDaysError> {
        if cadence != Cadence::Daily {
            return Err(ActiveDaysError::NotDaily);
        }
        Self::parse(values)
    }

    /// Days as stored, Sunday-first
    pub fn days(&self) -> &[u8] {
        &self.0
    }

    /// Whether the goal is due on `date`
    pub fn includes(&self, date: NaiveDate) -> bool {
        let day = date.weekday().num_days_from_sunday() as u8;
        self.0.contains(&day)
    }
}

impl TryFrom<Vec<i64>> for ActiveDays {
    type Error = ActiveDaysError;

    fn try_from(values: Vec<i64>) -> Result<Self, Self::Error> {
        Self::parse(&values)
    }
}

impl From<ActiveDays> for Vec<i64> {
    fn from(days: ActiveDays) -> Self {
        days.0.into_iter().map(i64::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_days_sorted_and_deduplicated_check() {
        let days = ActiveDays::parse(&[5, 1, 3]).unwrap();
        assert_eq!(days.days(), &[1, 3, 5]);
        assert_eq!(
            ActiveDays::parse(&[1, 1]).unwrap_err(),
            ActiveDaysError::Duplicate(1)
        );
    }

    #[test]
    fn test_active_days_bounds() {
        assert_eq!(ActiveDays::parse(&[]).unwrap_err(), ActiveDaysError::Empty);
        assert_eq!(
            ActiveDays::parse(&[7]).unwrap_err(),
            ActiveDaysError::OutOfRange(7)
        );
        assert_eq!(
            ActiveDays::parse(&[-1]).unwrap_err(),
            ActiveDaysError::OutOfRange(-1)
        );
        assert!(ActiveDays::parse(&[0, 6]).is_ok());
    }

    #[test]
    fn test_active_days_requires_daily_cadence() {
        assert_eq!(
            ActiveDays::for_cadence(&[1], Cadence::Weekly).unwrap_err(),
            ActiveDaysError::NotDaily
        );
        assert!(ActiveDays::for_cadence(&[1], Cadence::Daily).is_ok());
    }

    #[test]
    fn test_includes_uses_sunday_first_numbering() {
        let weekdays = ActiveDays::parse(&[1, 2, 3, 4, 5]).unwrap();
        // 2026-10-18 is a Sunday, 2026-10-19 a Monday
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(!weekdays.includes(sunday));
        assert!(weekdays.includes(monday));
    }

    #[test]
    fn test_active_days_deserialize_validates() {
        let ok: ActiveDays = serde_json::from_str("[0,6]").unwrap();
        assert_eq!(ok.days(), &[0, 6]);
        assert!(serde_json::from_str::<ActiveDays>("[9]").is_err());
    }
}
