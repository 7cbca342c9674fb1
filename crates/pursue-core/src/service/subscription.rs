//! Subscription state, upgrades and the downgrade selection flow

use chrono::{DateTime, Utc};
use pursue_db::{
    CreateSubscription, MemberGroupRow, Repositories, ResolveOutcome, SubscriptionRow,
    SubscriptionState,
};
use pursue_types::{AccountStatus, Platform, SubscriptionStatus, Tier};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::policy::{self, Eligibility};

/// A user's subscription-derived state after a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub user_id: Uuid,
    pub tier: Tier,
    pub status: AccountStatus,
    pub group_limit: i64,
    pub current_group_count: i64,
    pub kept_group_id: Option<Uuid>,
}

impl AccountState {
    pub fn is_over_limit(&self) -> bool {
        self.status == AccountStatus::OverLimit
    }

    pub fn can_create_group(&self) -> bool {
        policy::can_create_group(self.tier, self.status, self.current_group_count)
    }

    pub fn can_join_group(&self) -> bool {
        policy::can_join_group(self.tier, self.status, self.current_group_count)
    }

    /// Error for a blocked create or join
    pub fn limit_reached(&self) -> CoreError {
        policy::limit_reached(self.tier, self.current_group_count)
    }
}

/// `GET /users/me/subscription` body
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub tier: Tier,
    pub status: AccountStatus,
    pub group_limit: i64,
    pub current_group_count: i64,
    pub is_over_limit: bool,
    pub can_create_custom_challenge: bool,
    pub export_range_days: i64,
    pub subscription: Option<SubscriptionDetails>,
}

/// The user's current store subscription
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetails {
    pub id: Uuid,
    pub status: String,
    pub platform: String,
    pub product_id: String,
    pub expires_at: DateTime<Utc>,
    pub auto_renew: bool,
}

impl From<SubscriptionRow> for SubscriptionDetails {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            platform: row.platform,
            product_id: row.product_id,
            expires_at: row.expires_at,
            auto_renew: row.auto_renew,
        }
    }
}

/// Group identity in downgrade responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
}

/// Result of a successful downgrade selection
#[derive(Debug, Clone, Serialize)]
pub struct SelectGroupOutcome {
    pub status: &'static str,
    pub kept_group: GroupSummary,
    pub removed_groups: Vec<GroupSummary>,
    pub read_only_access_until: DateTime<Utc>,
}

/// Result of the expiry job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpiryReport {
    pub users_synced: u64,
    pub now_over_limit: u64,
    pub sync_failures: u64,
}

/// Subscription service
#[derive(Clone)]
pub struct SubscriptionService {
    repos: Repositories,
    config: CoreConfig,
}

impl SubscriptionService {
    pub fn new(repos: Repositories, config: CoreConfig) -> Self {
        Self { repos, config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // =========================================================================
    // Lazy sync
    // =========================================================================

    /// Recompute and persist the user's tier, limit and account status
    pub async fn sync(&self, user_id: Uuid) -> CoreResult<AccountState> {
        self.sync_at(user_id, Utc::now()).await
    }

    /// [`Self::sync`] evaluated at `now`.
    ///
    /// The final write is a compare-and-swap against the row that was read;
    /// a concurrent writer (usually a downgrade selection) causes a re-read.
    pub async fn sync_at(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<AccountState> {
        for attempt in 1..=self.config.sync_attempts {
            let user = self
                .repos
                .users
                .find_by_id(user_id)
                .await?
                .ok_or(CoreError::UserNotFound)?;

            let expired = self
                .repos
                .subscriptions
                .expire_lapsed_for_user(user_id, now)
                .await?;
            if expired > 0 {
                info!(user_id = %user_id, expired, "expired lapsed subscriptions");
            }

            let current = self
                .repos
                .subscriptions
                .find_current_by_user_id(user_id)
                .await?
                .filter(|s| s.expires_at > now);
            let tier = match &current {
                Some(sub) => sub
                    .tier
                    .parse::<Tier>()
                    .map_err(|e| CoreError::Internal(e.to_string()))?,
                None => Tier::Free,
            };
            let cancelled = current
                .as_ref()
                .is_some_and(|s| s.status == SubscriptionStatus::Cancelled.as_str());

            let memberships = self.repos.memberships.list_for_user(user_id).await?;
            let count = memberships
                .iter()
                .filter(|m| m.counts_toward_limit())
                .count() as i64;
            let limit = policy::group_limit(tier);
            let kept_group_valid = user.downgrade_kept_group_id.is_some_and(|kept| {
                memberships
                    .iter()
                    .any(|m| m.group.id == kept && m.counts_toward_limit())
            });
            let status = policy::resolve_status(tier, cancelled, count, kept_group_valid);

            let within_limit = !policy::is_over_limit(count, limit);
            if within_limit && memberships.iter().any(|m| m.read_only) {
                let cleared = self.repos.memberships.clear_read_only(user_id).await?;
                debug!(user_id = %user_id, cleared, "restored read-only groups");
            }
            let kept_group_id = if within_limit || !kept_group_valid {
                None
            } else {
                user.downgrade_kept_group_id
            };

            let expected = SubscriptionState::from(&user);
            let next = SubscriptionState {
                tier: tier.as_str().to_string(),
                status: status.as_str().to_string(),
                group_limit: limit,
                kept_group_id,
            };

            let persisted = next == expected
                || self
                    .repos
                    .users
                    .update_subscription_state(user_id, &expected, &next)
                    .await?;

            if persisted {
                if next.status != expected.status {
                    info!(
                        user_id = %user_id,
                        from = %expected.status,
                        to = %status,
                        "account status changed"
                    );
                }
                return Ok(AccountState {
                    user_id,
                    tier,
                    status,
                    group_limit: limit,
                    current_group_count: count,
                    kept_group_id,
                });
            }

            debug!(user_id = %user_id, attempt, "user row changed during sync, retrying");
        }

        warn!(user_id = %user_id, "subscription sync did not settle");
        Err(CoreError::Internal(
            "subscription state changed concurrently".to_string(),
        ))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current tier, status and limits
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_subscription(&self, user_id: Uuid) -> CoreResult<SubscriptionView> {
        let state = self.sync(user_id).await?;
        let current = self
            .repos
            .subscriptions
            .find_current_by_user_id(user_id)
            .await?;

        Ok(SubscriptionView {
            tier: state.tier,
            status: state.status,
            group_limit: state.group_limit,
            current_group_count: state.current_group_count,
            is_over_limit: state.is_over_limit(),
            can_create_custom_challenge: state.tier.can_create_custom_challenge(),
            export_range_days: policy::export_date_range_limit(state.tier),
            subscription: current.map(Into::into),
        })
    }

    /// Whether the user can create or join another group
    pub async fn eligibility(&self, user_id: Uuid) -> CoreResult<Eligibility> {
        let state = self.sync(user_id).await?;
        Ok(policy::eligibility(
            state.tier,
            state.status,
            state.current_group_count,
        ))
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Simulated purchase. Replaces any open subscription.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn upgrade(
        &self,
        user_id: Uuid,
        product_id: &str,
        platform: Option<Platform>,
    ) -> CoreResult<SubscriptionView> {
        let product = self
            .config
            .product(product_id)
            .ok_or_else(|| CoreError::InvalidProduct(product_id.to_string()))?;

        self.repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(CoreError::UserNotFound)?;

        let sub = self
            .repos
            .subscriptions
            .create_replacing(CreateSubscription {
                id: Uuid::new_v4(),
                user_id,
                tier: product.tier.as_str().to_string(),
                platform: platform.unwrap_or(Platform::Simulated).as_str().to_string(),
                product_id: product_id.to_string(),
                expires_at: Utc::now() + product.period,
            })
            .await?;

        info!(subscription_id = %sub.id, product_id, "subscription purchased");
        metrics::counter!("pursue_subscriptions_purchased_total", "product" => product_id.to_string())
            .increment(1);

        self.get_subscription(user_id).await
    }

    /// Turn off auto-renew. Premium continues until expiry. Cancelling an
    /// already cancelled subscription is a no-op.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn cancel(&self, user_id: Uuid) -> CoreResult<SubscriptionView> {
        let current = self
            .repos
            .subscriptions
            .find_current_by_user_id(user_id)
            .await?
            .filter(|s| s.expires_at > Utc::now())
            .ok_or(CoreError::SubscriptionNotFound)?;

        if current.status == SubscriptionStatus::Active.as_str() {
            self.repos.subscriptions.cancel(current.id).await?;
            info!(subscription_id = %current.id, "subscription cancelled");
        }

        self.get_subscription(user_id).await
    }

    // =========================================================================
    // Downgrade resolution
    // =========================================================================

    /// Keep one regular group writable and demote the rest to read-only.
    /// Only valid while the account is over its limit.
    #[instrument(skip_all, fields(user_id = %user_id, keep_group_id = %keep_group_id))]
    pub async fn select_group(
        &self,
        user_id: Uuid,
        keep_group_id: Uuid,
    ) -> CoreResult<SelectGroupOutcome> {
        let state = self.sync(user_id).await?;
        if !state.is_over_limit() {
            return Err(CoreError::InvalidState(format!(
                "account status is {}, not over_limit",
                state.status
            )));
        }

        let now = Utc::now();
        match self
            .repos
            .memberships
            .resolve_over_limit(user_id, keep_group_id, now)
            .await?
        {
            ResolveOutcome::NotOverLimit => Err(CoreError::InvalidState(
                "account is no longer over its group limit".to_string(),
            )),
            ResolveOutcome::InvalidSelection => Err(CoreError::InvalidGroupSelection),
            ResolveOutcome::Resolved { kept, read_only } => {
                info!(demoted = read_only.len(), "downgrade selection resolved");
                metrics::counter!("pursue_downgrades_resolved_total").increment(1);

                Ok(SelectGroupOutcome {
                    status: "success",
                    kept_group: GroupSummary {
                        id: kept.id,
                        name: kept.name,
                    },
                    removed_groups: read_only
                        .into_iter()
                        .map(|g| GroupSummary {
                            id: g.id,
                            name: g.name,
                        })
                        .collect(),
                    read_only_access_until: now + self.config.read_only_access_window,
                })
            }
        }
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Expire every lapsed subscription and resync the affected users
    #[instrument(skip(self))]
    pub async fn run_expiry(&self, now: DateTime<Utc>) -> CoreResult<ExpiryReport> {
        let user_ids = self.repos.subscriptions.expire_lapsed(now).await?;
        let mut report = ExpiryReport::default();

        for user_id in user_ids {
            match self.sync_at(user_id, now).await {
                Ok(state) => {
                    report.users_synced += 1;
                    if state.is_over_limit() {
                        report.now_over_limit += 1;
                    }
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "sync after expiry failed");
                    report.sync_failures += 1;
                }
            }
        }

        info!(
            users_synced = report.users_synced,
            now_over_limit = report.now_over_limit,
            "subscription expiry finished"
        );
        Ok(report)
    }
}

/// Whether a membership row blocks writes for its user
pub(crate) fn is_read_only(membership: &MemberGroupRow) -> bool {
    membership.read_only && membership.counts_toward_limit()
}
