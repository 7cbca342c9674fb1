//! Subscription policy engine
//!
//! Pure decisions over a user's tier, stored account status and the number
//! of active memberships they hold in regular (non-challenge) groups. No
//! I/O happens here; the services gather the inputs and act on the answers.

use chrono::NaiveDate;
use pursue_types::{AccountStatus, Tier};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// Eligibility reason when the tier limit is used up
pub const REASON_AT_GROUP_LIMIT: &str = "at_group_limit";
/// Eligibility reason while a downgrade selection is outstanding
pub const REASON_GROUP_SELECTION_REQUIRED: &str = "group_selection_required";

/// Regular groups a tier may hold
pub fn group_limit(tier: Tier) -> i64 {
    tier.group_limit()
}

/// Whether `count` regular groups exceed `limit`
pub fn is_over_limit(count: i64, limit: i64) -> bool {
    count > limit
}

/// Whether another regular group may be created
pub fn can_create_group(tier: Tier, status: AccountStatus, count: i64) -> bool {
    status != AccountStatus::OverLimit && count < group_limit(tier)
}

/// Whether another regular group may be joined. Same rule as creation.
pub fn can_join_group(tier: Tier, status: AccountStatus, count: i64) -> bool {
    can_create_group(tier, status, count)
}

/// Answer to "can this user take on another group?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub can_create_group: bool,
    pub can_join_group: bool,
    pub current_count: i64,
    pub limit: i64,
    pub upgrade_required: bool,
    pub reason: Option<&'static str>,
}

/// Build the eligibility report
pub fn eligibility(tier: Tier, status: AccountStatus, count: i64) -> Eligibility {
    let limit = group_limit(tier);
    let allowed = can_create_group(tier, status, count);
    let reason = if allowed {
        None
    } else if status == AccountStatus::OverLimit {
        Some(REASON_GROUP_SELECTION_REQUIRED)
    } else {
        Some(REASON_AT_GROUP_LIMIT)
    };

    Eligibility {
        can_create_group: allowed,
        can_join_group: can_join_group(tier, status, count),
        current_count: count,
        limit,
        upgrade_required: !allowed && tier == Tier::Free,
        reason,
    }
}

/// The error returned when a create or join is blocked by the limit
pub fn limit_reached(tier: Tier, count: i64) -> CoreError {
    CoreError::GroupLimitReached {
        current_count: count,
        limit: group_limit(tier),
        upgrade_required: tier == Tier::Free,
    }
}

/// Longest export window for a tier, in inclusive days
pub fn export_date_range_limit(tier: Tier) -> i64 {
    tier.export_range_days()
}

/// Successful export range check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportRange {
    pub valid: bool,
    pub max_days_allowed: i64,
    pub requested_days: i64,
}

/// Check an export window against the tier limit. Days are counted
/// inclusively, so `start == end` is one day.
pub fn validate_export_range(tier: Tier, start: NaiveDate, end: NaiveDate) -> CoreResult<ExportRange> {
    if end < start {
        return Err(CoreError::validation("end_date must not be before start_date"));
    }

    let requested_days = (end - start).num_days() + 1;
    let max_days_allowed = export_date_range_limit(tier);
    if requested_days > max_days_allowed {
        return Err(CoreError::ExportRangeExceeded {
            max_days_allowed,
            requested_days,
        });
    }

    Ok(ExportRange {
        valid: true,
        max_days_allowed,
        requested_days,
    })
}

/// Derive the account status from current facts.
///
/// Over the limit wins unless a still-valid kept group exists, then a
/// cancelled-but-unexpired premium subscription, then active.
pub fn resolve_status(
    tier: Tier,
    subscription_cancelled: bool,
    count: i64,
    kept_group_valid: bool,
) -> AccountStatus {
    if is_over_limit(count, group_limit(tier)) && !kept_group_valid {
        AccountStatus::OverLimit
    } else if subscription_cancelled && tier == Tier::Premium {
        AccountStatus::Cancelled
    } else {
        AccountStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_free_user_at_one_group_is_blocked() {
        let e = eligibility(Tier::Free, AccountStatus::Active, 1);
        assert!(!e.can_create_group);
        assert!(!e.can_join_group);
        assert!(e.upgrade_required);
        assert_eq!(e.reason, Some(REASON_AT_GROUP_LIMIT));
    }

    #[test]
    fn test_premium_block_does_not_require_upgrade() {
        let e = eligibility(Tier::Premium, AccountStatus::Active, 10);
        assert!(!e.can_create_group);
        assert!(!e.upgrade_required);
    }

    #[test]
    fn test_over_limit_blocks_even_with_room() {
        let e = eligibility(Tier::Premium, AccountStatus::OverLimit, 0);
        assert!(!e.can_create_group);
        assert_eq!(e.reason, Some(REASON_GROUP_SELECTION_REQUIRED));
    }

    #[test]
    fn test_export_range_is_inclusive() {
        let ok = validate_export_range(Tier::Free, date(2026, 1, 1), date(2026, 1, 30)).unwrap();
        assert_eq!(ok.requested_days, 30);

        let err = validate_export_range(Tier::Free, date(2026, 1, 1), date(2026, 1, 31));
        assert!(matches!(
            err,
            Err(CoreError::ExportRangeExceeded {
                max_days_allowed: 30,
                requested_days: 31
            })
        ));
    }

    #[test]
    fn test_export_range_rejects_reversed_dates() {
        let err = validate_export_range(Tier::Premium, date(2026, 2, 1), date(2026, 1, 1));
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_kept_group_suppresses_over_limit() {
        assert_eq!(
            resolve_status(Tier::Free, false, 3, false),
            AccountStatus::OverLimit
        );
        assert_eq!(resolve_status(Tier::Free, false, 3, true), AccountStatus::Active);
    }

    #[test]
    fn test_cancelled_premium_within_limit() {
        assert_eq!(
            resolve_status(Tier::Premium, true, 4, false),
            AccountStatus::Cancelled
        );
        assert_eq!(
            resolve_status(Tier::Premium, true, 11, false),
            AccountStatus::OverLimit
        );
    }
}
