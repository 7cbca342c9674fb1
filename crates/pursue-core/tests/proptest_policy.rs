//! Property-based tests for the subscription policy engine

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use pursue_core::policy::{
    can_create_group, can_join_group, eligibility, group_limit, is_over_limit, resolve_status,
    validate_export_range,
};
use pursue_core::CoreError;
use pursue_types::{AccountStatus, Tier};

// ============================================================================
// Strategies
// ============================================================================

fn arb_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Free), Just(Tier::Premium)]
}

fn arb_status() -> impl Strategy<Value = AccountStatus> {
    prop_oneof![
        Just(AccountStatus::Active),
        Just(AccountStatus::OverLimit),
        Just(AccountStatus::Cancelled),
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    })
}

// ============================================================================
// Limits
// ============================================================================

#[test]
fn test_fixed_limits() {
    assert_eq!(group_limit(Tier::Free), 1);
    assert_eq!(group_limit(Tier::Premium), 10);
}

proptest! {
    /// Property: creation is allowed exactly below the limit and never
    /// while a downgrade selection is outstanding
    #[test]
    fn prop_can_create_iff_below_limit(
        tier in arb_tier(),
        status in arb_status(),
        count in 0i64..20,
    ) {
        let expected = count < group_limit(tier) && status != AccountStatus::OverLimit;
        prop_assert_eq!(can_create_group(tier, status, count), expected);
        prop_assert_eq!(can_join_group(tier, status, count), expected);
    }

    /// Property: eligibility agrees with the predicates and only asks free
    /// users to upgrade
    #[test]
    fn prop_eligibility_is_consistent(
        tier in arb_tier(),
        status in arb_status(),
        count in 0i64..20,
    ) {
        let e = eligibility(tier, status, count);
        prop_assert_eq!(e.can_create_group, can_create_group(tier, status, count));
        prop_assert_eq!(e.limit, group_limit(tier));
        prop_assert_eq!(e.current_count, count);
        prop_assert_eq!(e.reason.is_some(), !e.can_create_group);
        if e.upgrade_required {
            prop_assert_eq!(tier, Tier::Free);
            prop_assert!(!e.can_create_group);
        }
    }

    /// Property: over_limit is derived exactly from count and kept group
    #[test]
    fn prop_resolve_status_over_limit(
        tier in arb_tier(),
        cancelled in any::<bool>(),
        count in 0i64..20,
        kept in any::<bool>(),
    ) {
        let status = resolve_status(tier, cancelled, count, kept);
        let over = is_over_limit(count, group_limit(tier)) && !kept;
        prop_assert_eq!(status == AccountStatus::OverLimit, over);
        if !over && cancelled && tier == Tier::Premium {
            prop_assert_eq!(status, AccountStatus::Cancelled);
        }
    }
}

// ============================================================================
// Export ranges
// ============================================================================

proptest! {
    /// Property: a range is valid iff its inclusive length fits the tier
    #[test]
    fn prop_export_range_limit(
        tier in arb_tier(),
        start in arb_date(),
        len in 1i64..800,
    ) {
        let end = start + Duration::days(len - 1);
        let max = tier.export_range_days();
        match validate_export_range(tier, start, end) {
            Ok(range) => {
                prop_assert!(len <= max);
                prop_assert_eq!(range.requested_days, len);
            }
            Err(CoreError::ExportRangeExceeded { max_days_allowed, requested_days }) => {
                prop_assert!(len > max);
                prop_assert_eq!(max_days_allowed, max);
                prop_assert_eq!(requested_days, len);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// Property: reversed ranges are validation errors for every tier
    #[test]
    fn prop_reversed_range_rejected(tier in arb_tier(), start in arb_date(), back in 1i64..100) {
        let end = start - Duration::days(back);
        let is_validation = matches!(
            validate_export_range(tier, start, end),
            Err(CoreError::Validation(_))
        );
        prop_assert!(is_validation);
    }
}

#[test]
fn test_export_range_examples() {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    assert!(validate_export_range(Tier::Free, start, start + Duration::days(29)).is_ok());
    assert!(validate_export_range(Tier::Free, start, start + Duration::days(364)).is_err());
    assert!(validate_export_range(Tier::Premium, start, start + Duration::days(364)).is_ok());
}
