//! Group membership ledger

mod common;

use chrono::Duration;
use common::{new_group, today, unique, Harness};
use pursue_core::{CoreError, NewChallenge};
use pursue_db::CreateMembership;
use pursue_types::Visibility;

fn template_challenge(template: &str) -> NewChallenge {
    NewChallenge {
        name: None,
        description: None,
        template_id: Some(template.to_string()),
        start_date: today(),
        end_date: None,
    }
}

#[tokio::test]
async fn test_challenges_do_not_count_toward_limit() {
    let h = Harness::new();
    let user = h.user("free").await;
    h.group(user, &unique("regular")).await;

    // a challenge is still allowed at the limit
    let challenge = h
        .services
        .challenges
        .create_challenge(user, template_challenge("7-day-hydration"))
        .await
        .unwrap();
    assert!(challenge.is_challenge);

    // and so is joining somebody else's
    let host = h.user("host").await;
    let other = h
        .services
        .challenges
        .create_challenge(host, template_challenge("21-day-reading"))
        .await
        .unwrap();
    let joined = h
        .services
        .groups
        .join_by_invite_code(user, &other.invite_code)
        .await
        .unwrap();
    assert_eq!(joined.status, "active");

    assert_eq!(h.services.groups.current_group_count(user).await.unwrap(), 1);

    // a second regular group is not
    let err = h
        .services
        .groups
        .create_group(user, new_group(&unique("second"), Visibility::Public))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupLimitReached { .. }));
}

#[tokio::test]
async fn test_public_join_at_limit_writes_nothing() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let public = h.group(owner, &unique("public")).await;

    let joiner = h.user("joiner").await;
    h.group(joiner, &unique("own")).await;

    let err = h.services.groups.join_group(joiner, public).await.unwrap_err();
    assert!(matches!(err, CoreError::GroupLimitReached { .. }));
    assert!(h
        .repos
        .memberships
        .find(public, joiner)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_public_join_is_idempotent() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let public = h.group(owner, &unique("public")).await;
    let joiner = h.user("joiner").await;

    let first = h.services.groups.join_group(joiner, public).await.unwrap();
    assert_eq!(first.status, "active");
    assert!(!first.already_member);

    let second = h.services.groups.join_group(joiner, public).await.unwrap();
    assert!(second.already_member);
    assert_eq!(h.services.groups.current_group_count(joiner).await.unwrap(), 1);
}

#[tokio::test]
async fn test_private_join_waits_for_approval() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let private = h
        .services
        .groups
        .create_group(owner, new_group(&unique("private"), Visibility::Private))
        .await
        .unwrap();

    let joiner = h.user("joiner").await;
    let pending = h
        .services
        .groups
        .join_by_invite_code(joiner, &private.invite_code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(pending.status, "pending");
    assert_eq!(h.services.groups.current_group_count(joiner).await.unwrap(), 0);

    // pending members cannot read private groups yet
    let err = h
        .services
        .groups
        .get_group(joiner, private.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAMember));

    let approved = h
        .services
        .groups
        .approve_member(owner, private.id, joiner)
        .await
        .unwrap();
    assert_eq!(approved.status, "active");

    let detail = h.services.groups.get_group(joiner, private.id).await.unwrap();
    assert_eq!(detail.member_count, 2);
}

#[tokio::test]
async fn test_approval_rechecks_target_limit() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let private = h
        .services
        .groups
        .create_group(owner, new_group(&unique("private"), Visibility::Private))
        .await
        .unwrap();

    let joiner = h.user("joiner").await;
    h.services
        .groups
        .join_by_invite_code(joiner, &private.invite_code)
        .await
        .unwrap();
    // joiner fills their only slot while the request is pending
    h.group(joiner, &unique("own")).await;

    let err = h
        .services
        .groups
        .approve_member(owner, private.id, joiner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupLimitReached { .. }));
}

#[tokio::test]
async fn test_only_admins_remove_members() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let group = h.group(owner, &unique("club")).await;
    let member = h.user("member").await;
    let other = h.user("other").await;
    h.services.groups.join_group(member, group).await.unwrap();
    h.services.groups.join_group(other, group).await.unwrap();

    let err = h
        .services
        .groups
        .remove_member(member, group, other)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    h.services
        .groups
        .remove_member(owner, group, other)
        .await
        .unwrap();
    assert!(h.repos.memberships.find(group, other).await.unwrap().is_none());

    let err = h
        .services
        .groups
        .remove_member(owner, group, other)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::MemberNotFound));
}

#[tokio::test]
async fn test_creator_cannot_be_removed() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let group = h.group(owner, &unique("club")).await;
    let admin = h.user("admin").await;
    h.repos
        .memberships
        .join_within_limit(
            CreateMembership {
                group_id: group,
                user_id: admin,
                role: "admin".to_string(),
                status: "active".to_string(),
            },
            None,
        )
        .await
        .unwrap();

    let err = h
        .services
        .groups
        .remove_member(admin, group, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));
}

#[tokio::test]
async fn test_reserved_and_duplicate_names() {
    let h = Harness::new();
    let user = h.premium_user("namer").await;

    let err = h
        .services
        .groups
        .create_group(user, new_group("Support", Visibility::Public))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NameNotAvailable));

    let name = unique("Runners");
    h.group(user, &name).await;
    let err = h
        .services
        .groups
        .create_group(user, new_group(&name.to_uppercase(), Visibility::Public))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NameNotAvailable));
}

#[tokio::test]
async fn test_export_range_by_tier() {
    let h = Harness::new();
    let free = h.user("free").await;
    let group = h.group(free, &unique("exports")).await;
    let start = today() - Duration::days(400);

    let ok = h
        .services
        .groups
        .validate_export_range(free, group, start, start + Duration::days(29))
        .await
        .unwrap();
    assert_eq!(ok.requested_days, 30);

    let err = h
        .services
        .groups
        .validate_export_range(free, group, start, start + Duration::days(364))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::ExportRangeExceeded {
            max_days_allowed: 30,
            requested_days: 365
        }
    ));

    h.services
        .subscriptions
        .upgrade(free, "pursue_premium_monthly", None)
        .await
        .unwrap();
    assert!(h
        .services
        .groups
        .validate_export_range(free, group, start, start + Duration::days(364))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_recommendations_are_empty() {
    let h = Harness::new();
    let user = h.user("curious").await;
    assert!(h.services.groups.recommendations(user).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_join_creates_one_membership() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let group = h.group(owner, &unique("popular")).await;
    // premium so the limit check cannot decide the race
    let joiner = h.premium_user("joiner").await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let services = h.services.clone();
            tokio::spawn(async move { services.groups.join_group(joiner, group).await })
        })
        .collect();
    let mut fresh = 0;
    for handle in handles {
        let joined = handle.await.unwrap().unwrap();
        assert_eq!(joined.status, "active");
        if !joined.already_member {
            fresh += 1;
        }
    }
    assert_eq!(fresh, 1);

    let groups = h.services.groups.list_my_groups(joiner).await.unwrap();
    assert_eq!(groups.len(), 1);
}
