//! Shared test harness: services wired to an in-memory store

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use pursue_core::config::PREMIUM_MONTHLY;
use pursue_core::{CoreConfig, NewGoal, NewGroup, Services};
use pursue_db::{CreateSubscription, CreateUser, MemoryStore, Repositories};
use pursue_types::{Cadence, MetricType, Platform, Visibility};
use uuid::Uuid;

pub struct Harness {
    pub services: Services,
    pub repos: Repositories,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_repos(Repositories::in_memory(MemoryStore::new()))
    }

    pub fn with_repos(repos: Repositories) -> Self {
        Self {
            services: Services::new(repos.clone(), CoreConfig::new()),
            repos,
        }
    }

    /// Create a free user
    pub async fn user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.repos
            .users
            .create(CreateUser {
                id,
                display_name: name.to_string(),
            })
            .await
            .unwrap();
        id
    }

    /// Create a user holding a monthly premium subscription
    pub async fn premium_user(&self, name: &str) -> Uuid {
        let id = self.user(name).await;
        self.services
            .subscriptions
            .upgrade(id, PREMIUM_MONTHLY, None)
            .await
            .unwrap();
        id
    }

    /// Replace the user's subscription with one that already expired
    pub async fn lapse_premium(&self, user_id: Uuid) {
        self.repos
            .subscriptions
            .create_replacing(CreateSubscription {
                id: Uuid::new_v4(),
                user_id,
                tier: "premium".to_string(),
                platform: Platform::Simulated.as_str().to_string(),
                product_id: PREMIUM_MONTHLY.to_string(),
                expires_at: Utc::now() - Duration::minutes(1),
            })
            .await
            .unwrap();
    }

    /// Create a public regular group with a unique name
    pub async fn group(&self, owner: Uuid, name: &str) -> Uuid {
        self.services
            .groups
            .create_group(owner, new_group(name, Visibility::Public))
            .await
            .unwrap()
            .id
    }

    /// Premium user with three groups whose subscription then lapsed
    pub async fn over_limit_user(&self) -> (Uuid, [Uuid; 3]) {
        let user = self.premium_user("lapsed").await;
        let a = self.group(user, &unique("A")).await;
        let b = self.group(user, &unique("B")).await;
        let c = self.group(user, &unique("C")).await;
        self.lapse_premium(user).await;
        (user, [a, b, c])
    }

    /// Add a binary daily goal to a group the user manages
    pub async fn goal(&self, user: Uuid, group_id: Uuid) -> Uuid {
        self.services
            .goals
            .create_goal(user, binary_goal(group_id))
            .await
            .unwrap()
            .id
    }
}

pub fn new_group(name: &str, visibility: Visibility) -> NewGroup {
    NewGroup {
        name: name.to_string(),
        description: None,
        visibility,
    }
}

pub fn binary_goal(group_id: Uuid) -> NewGoal {
    NewGoal {
        group_id,
        title: "Stretch".to_string(),
        description: None,
        cadence: Cadence::Daily,
        metric_type: MetricType::Binary,
        target_value: None,
        unit: None,
        active_days: None,
    }
}

/// Group names must be unique among public groups
pub fn unique(prefix: &str) -> String {
    format!("{prefix} {}", &Uuid::new_v4().simple().to_string()[..6])
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
