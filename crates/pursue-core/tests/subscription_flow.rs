//! Subscription sync, limits and the downgrade selection flow

mod common;

use chrono::{Duration, Utc};
use common::{new_group, today, unique, Harness};
use pursue_core::{CoreError, NewChallenge, NewProgress};
use pursue_types::{AccountStatus, Tier, Visibility};

fn progress(goal_id: uuid::Uuid) -> NewProgress {
    NewProgress {
        goal_id,
        value: 1.0,
        entry_date: None,
        note: None,
    }
}

#[tokio::test]
async fn test_free_user_second_group_is_blocked() {
    let h = Harness::new();
    let user = h.user("free").await;
    h.group(user, &unique("first")).await;

    let err = h
        .services
        .groups
        .create_group(user, new_group(&unique("second"), Visibility::Private))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::GroupLimitReached {
            current_count: 1,
            limit: 1,
            upgrade_required: true
        }
    ));
}

#[tokio::test]
async fn test_premium_user_creates_exactly_ten() {
    let h = Harness::new();
    let user = h.premium_user("premium").await;
    for i in 0..10 {
        h.group(user, &unique(&format!("g{i}"))).await;
    }

    let err = h
        .services
        .groups
        .create_group(user, new_group(&unique("eleventh"), Visibility::Public))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::GroupLimitReached {
            current_count: 10,
            limit: 10,
            upgrade_required: false
        }
    ));
}

#[tokio::test]
async fn test_lapsed_premium_goes_over_limit() {
    let h = Harness::new();
    let (user, _) = h.over_limit_user().await;

    let view = h.services.subscriptions.get_subscription(user).await.unwrap();
    assert_eq!(view.tier, Tier::Free);
    assert_eq!(view.status, AccountStatus::OverLimit);
    assert!(view.is_over_limit);
    assert_eq!(view.group_limit, 1);
    assert_eq!(view.current_group_count, 3);

    let eligibility = h.services.subscriptions.eligibility(user).await.unwrap();
    assert!(!eligibility.can_create_group);
    assert_eq!(eligibility.reason, Some("group_selection_required"));
}

#[tokio::test]
async fn test_select_group_keeps_one_and_demotes_rest() {
    let h = Harness::new();
    let (user, [a, b, c]) = h.over_limit_user().await;

    let outcome = h.services.subscriptions.select_group(user, a).await.unwrap();
    assert_eq!(outcome.status, "success");
    assert_eq!(outcome.kept_group.id, a);
    let mut removed: Vec<_> = outcome.removed_groups.iter().map(|g| g.id).collect();
    removed.sort();
    let mut expected = vec![b, c];
    expected.sort();
    assert_eq!(removed, expected);

    let window = outcome.read_only_access_until - Utc::now();
    assert!(window > Duration::days(29) && window <= Duration::days(30));

    let view = h.services.subscriptions.get_subscription(user).await.unwrap();
    assert!(!view.is_over_limit);
    assert_eq!(view.status, AccountStatus::Active);
}

#[tokio::test]
async fn test_second_selection_is_invalid_state() {
    let h = Harness::new();
    let (user, [a, b, _]) = h.over_limit_user().await;

    h.services.subscriptions.select_group(user, a).await.unwrap();
    for target in [a, b] {
        let err = h
            .services
            .subscriptions
            .select_group(user, target)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }
}

#[tokio::test]
async fn test_select_group_rejects_groups_not_held() {
    let h = Harness::new();
    let (user, _) = h.over_limit_user().await;
    let stranger = h.user("stranger").await;
    let foreign = h.group(stranger, &unique("foreign")).await;

    let err = h
        .services
        .subscriptions
        .select_group(user, foreign)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidGroupSelection));

    let view = h.services.subscriptions.get_subscription(user).await.unwrap();
    assert!(view.is_over_limit);
}

#[tokio::test]
async fn test_writes_need_selection_then_respect_read_only() {
    let h = Harness::new();
    let user = h.premium_user("writer").await;
    let a = h.group(user, &unique("A")).await;
    let b = h.group(user, &unique("B")).await;
    let goal_a = h.goal(user, a).await;
    let goal_b = h.goal(user, b).await;
    h.lapse_premium(user).await;

    let err = h
        .services
        .goals
        .log_progress(user, progress(goal_a))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupSelectionRequired));

    h.services.subscriptions.select_group(user, a).await.unwrap();

    h.services
        .goals
        .log_progress(user, progress(goal_a))
        .await
        .unwrap();
    let err = h
        .services
        .goals
        .log_progress(user, progress(goal_b))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupReadOnly));

    // reads still work
    h.services.goals.list_goals(user, b).await.unwrap();
    let groups = h.services.groups.list_my_groups(user).await.unwrap();
    let read_only: Vec<_> = groups
        .iter()
        .filter(|g| g.is_read_only)
        .map(|g| g.group.id)
        .collect();
    assert_eq!(read_only, vec![b]);
}

#[tokio::test]
async fn test_leaving_kept_group_reenters_over_limit() {
    let h = Harness::new();
    let (user, [a, b, c]) = h.over_limit_user().await;
    h.services.subscriptions.select_group(user, a).await.unwrap();

    h.services.groups.leave_group(user, a).await.unwrap();

    let view = h.services.subscriptions.get_subscription(user).await.unwrap();
    assert!(view.is_over_limit);

    let outcome = h.services.subscriptions.select_group(user, b).await.unwrap();
    assert_eq!(outcome.kept_group.id, b);
    let removed: Vec<_> = outcome.removed_groups.iter().map(|g| g.id).collect();
    assert_eq!(removed, vec![c]);
}

#[tokio::test]
async fn test_dropping_to_limit_restores_writes() {
    let h = Harness::new();
    let user = h.premium_user("shrinker").await;
    let a = h.group(user, &unique("A")).await;
    let b = h.group(user, &unique("B")).await;
    let goal_b = h.goal(user, b).await;
    h.lapse_premium(user).await;
    h.services.subscriptions.select_group(user, a).await.unwrap();

    h.services.groups.leave_group(user, a).await.unwrap();

    let view = h.services.subscriptions.get_subscription(user).await.unwrap();
    assert!(!view.is_over_limit);
    h.services
        .goals
        .log_progress(user, progress(goal_b))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upgrade_clears_read_only() {
    let h = Harness::new();
    let user = h.premium_user("returning").await;
    let a = h.group(user, &unique("A")).await;
    let b = h.group(user, &unique("B")).await;
    let goal_b = h.goal(user, b).await;
    h.lapse_premium(user).await;
    h.services.subscriptions.select_group(user, a).await.unwrap();

    let view = h
        .services
        .subscriptions
        .upgrade(user, "pursue_premium_annual", None)
        .await
        .unwrap();
    assert_eq!(view.tier, Tier::Premium);

    h.services
        .goals
        .log_progress(user, progress(goal_b))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_keeps_premium_until_expiry() {
    let h = Harness::new();
    let user = h.premium_user("canceller").await;

    let view = h.services.subscriptions.cancel(user).await.unwrap();
    assert_eq!(view.tier, Tier::Premium);
    assert_eq!(view.status, AccountStatus::Cancelled);
    let details = view.subscription.unwrap();
    assert!(!details.auto_renew);

    // idempotent
    let again = h.services.subscriptions.cancel(user).await.unwrap();
    assert_eq!(again.status, AccountStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_without_subscription() {
    let h = Harness::new();
    let user = h.user("nobody").await;
    let err = h.services.subscriptions.cancel(user).await.unwrap_err();
    assert!(matches!(err, CoreError::SubscriptionNotFound));
}

#[tokio::test]
async fn test_unknown_product_is_rejected() {
    let h = Harness::new();
    let user = h.user("buyer").await;
    let err = h
        .services
        .subscriptions
        .upgrade(user, "pursue_premium_lifetime", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidProduct(_)));
}

#[tokio::test]
async fn test_expiry_job_downgrades_lapsed_users() {
    let h = Harness::new();
    let user = h.premium_user("expiring").await;
    h.group(user, &unique("A")).await;
    h.group(user, &unique("B")).await;

    let report = h
        .services
        .subscriptions
        .run_expiry(Utc::now() + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(report.users_synced, 1);
    assert_eq!(report.now_over_limit, 1);

    let user_row = h.repos.users.find_by_id(user).await.unwrap().unwrap();
    assert_eq!(user_row.current_subscription_tier, "free");
    assert_eq!(user_row.subscription_status, "over_limit");
    assert_eq!(user_row.group_limit, 1);
}

#[tokio::test]
async fn test_unknown_user_sync_fails() {
    let h = Harness::new();
    let err = h
        .services
        .subscriptions
        .sync(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UserNotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selections_have_one_winner() {
    for _ in 0..10 {
        let h = Harness::new();
        let (user, [a, b, _]) = h.over_limit_user().await;

        let first = tokio::spawn({
            let services = h.services.clone();
            async move { services.subscriptions.select_group(user, a).await }
        });
        let second = tokio::spawn({
            let services = h.services.clone();
            async move { services.subscriptions.select_group(user, b).await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, CoreError::InvalidState(_)));
        }

        let view = h.services.subscriptions.get_subscription(user).await.unwrap();
        assert!(!view.is_over_limit);
        let writable = h
            .services
            .groups
            .list_my_groups(user)
            .await
            .unwrap()
            .iter()
            .filter(|g| !g.is_read_only)
            .count();
        assert_eq!(writable, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_respect_free_limit() {
    for _ in 0..10 {
        let h = Harness::new();
        let user = h.user("racer").await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let services = h.services.clone();
                let input = new_group(&unique("race"), Visibility::Public);
                tokio::spawn(async move { services.groups.create_group(user, input).await })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(err, CoreError::GroupLimitReached { limit: 1, .. }));

        let groups = h.services.groups.list_my_groups(user).await.unwrap();
        assert_eq!(groups.len(), 1);
    }
}

#[tokio::test]
async fn test_challenges_stay_writable_while_over_limit() {
    let h = Harness::new();
    let user = h.premium_user("lapsing").await;
    let a = h.group(user, &unique("A")).await;
    let b = h.group(user, &unique("B")).await;
    let goal_b = h.goal(user, b).await;
    h.lapse_premium(user).await;

    let creator = h.premium_user("host").await;
    let challenge = h
        .services
        .challenges
        .create_challenge(
            creator,
            NewChallenge {
                name: None,
                description: None,
                template_id: Some("7-day-hydration".to_string()),
                start_date: today(),
                end_date: None,
            },
        )
        .await
        .unwrap();
    h.services
        .groups
        .join_by_invite_code(user, &challenge.invite_code)
        .await
        .unwrap();
    let challenge_goal = h.services.goals.list_goals(user, challenge.id).await.unwrap()[0].id;

    // no selection made yet
    h.services
        .goals
        .log_progress(user, progress(challenge_goal))
        .await
        .unwrap();

    let outcome = h.services.subscriptions.select_group(user, a).await.unwrap();
    assert!(outcome.removed_groups.iter().all(|g| g.id != challenge.id));

    h.services
        .goals
        .log_progress(user, progress(challenge_goal))
        .await
        .unwrap();
    let err = h
        .services
        .goals
        .log_progress(user, progress(goal_b))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupReadOnly));
}
