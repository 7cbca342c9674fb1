//! Property-based tests for the challenge state machine

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use pursue_core::challenge::{cancel, initial_status, next_state};
use pursue_types::ChallengeStatus;

// ============================================================================
// Strategies
// ============================================================================

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

/// (start, end) with end >= start
fn arb_window() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0i64..100, 0i64..60).prop_map(|(offset, len)| {
        let start = base() + Duration::days(offset);
        (start, start + Duration::days(len))
    })
}

fn arb_status() -> impl Strategy<Value = ChallengeStatus> {
    prop_oneof![
        Just(ChallengeStatus::Upcoming),
        Just(ChallengeStatus::Active),
        Just(ChallengeStatus::Completed),
        Just(ChallengeStatus::Cancelled),
    ]
}

fn rank(status: ChallengeStatus) -> u8 {
    match status {
        ChallengeStatus::Upcoming => 0,
        ChallengeStatus::Active => 1,
        ChallengeStatus::Completed | ChallengeStatus::Cancelled => 2,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Property: replaying the job over increasing days never moves a
    /// challenge backwards
    #[test]
    fn prop_status_only_moves_forward(
        (start, end) in arb_window(),
        days in prop::collection::vec(0i64..200, 1..20),
    ) {
        let mut days = days;
        days.sort_unstable();
        let mut status = initial_status(base(), start);
        for day in days {
            let next = next_state(base() + Duration::days(day), status, start, end);
            prop_assert!(rank(next) >= rank(status));
            status = next;
        }
    }

    /// Property: terminal states are fixed points
    #[test]
    fn prop_terminal_is_fixed(
        (start, end) in arb_window(),
        day in 0i64..200,
        cancelled in any::<bool>(),
    ) {
        let stored = if cancelled { ChallengeStatus::Cancelled } else { ChallengeStatus::Completed };
        prop_assert_eq!(next_state(base() + Duration::days(day), stored, start, end), stored);
    }

    /// Property: applying the transition twice changes nothing
    #[test]
    fn prop_next_state_idempotent(
        (start, end) in arb_window(),
        day in 0i64..200,
        stored in arb_status(),
    ) {
        let today = base() + Duration::days(day);
        let once = next_state(today, stored, start, end);
        prop_assert_eq!(next_state(today, once, start, end), once);
    }

    /// Property: from upcoming, the calendar alone decides the status
    #[test]
    fn prop_upcoming_follows_calendar((start, end) in arb_window(), day in 0i64..200) {
        let today = base() + Duration::days(day);
        let expected = if today > end {
            ChallengeStatus::Completed
        } else if today >= start {
            ChallengeStatus::Active
        } else {
            ChallengeStatus::Upcoming
        };
        prop_assert_eq!(next_state(today, ChallengeStatus::Upcoming, start, end), expected);
    }

    /// Property: cancel succeeds exactly from the open states
    #[test]
    fn prop_cancel_only_when_open(stored in arb_status()) {
        prop_assert_eq!(cancel(stored).is_ok(), !stored.is_terminal());
    }
}
