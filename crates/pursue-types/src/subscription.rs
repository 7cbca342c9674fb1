//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SubscriptionId, Tier, UserId};

/// Account-level subscription status stored on the user row.
///
/// This is recomputed from the live group count on every read, so a stored
/// value may lag until the next sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Within limits
    Active,
    /// Regular group count exceeds the tier limit and no group has been kept
    OverLimit,
    /// Premium cancelled; access continues until expiry
    Cancelled,
}

string_enum!(AccountStatus, "account status", {
    Active => "active",
    OverLimit => "over_limit",
    Cancelled => "cancelled",
});

/// Status of a subscription record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and renewing
    Active,
    /// Auto-renew turned off; access continues until `expires_at`
    Cancelled,
    /// Past `expires_at`; no longer grants premium
    Expired,
}

string_enum!(SubscriptionStatus, "subscription status", {
    Active => "active",
    Cancelled => "cancelled",
    Expired => "expired",
});

impl SubscriptionStatus {
    /// Whether a record in this status can still grant its tier
    pub const fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Cancelled)
    }
}

/// Store the purchase came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    GooglePlay,
    AppStore,
    Simulated,
}

string_enum!(Platform, "platform", {
    GooglePlay => "google_play",
    AppStore => "app_store",
    Simulated => "simulated",
});

/// User subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// User who owns the subscription
    pub user_id: UserId,
    /// Purchased tier
    pub tier: Tier,
    /// Subscription status
    pub status: SubscriptionStatus,
    /// Purchase platform
    pub platform: Platform,
    /// Store product identifier
    pub product_id: String,
    /// When premium access ends
    pub expires_at: DateTime<Utc>,
    /// Whether the store will renew it
    pub auto_renew: bool,
    /// When the subscription was created
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription grants its tier at `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status.grants_access() && self.expires_at > now
    }
}
