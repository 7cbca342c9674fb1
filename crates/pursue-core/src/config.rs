//! Core service configuration

use chrono::Duration;
use pursue_types::Tier;
use std::collections::HashMap;

/// Monthly premium product id
pub const PREMIUM_MONTHLY: &str = "pursue_premium_monthly";
/// Annual premium product id
pub const PREMIUM_ANNUAL: &str = "pursue_premium_annual";

/// A purchasable subscription product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub tier: Tier,
    /// How long one purchase grants the tier
    pub period: Duration,
}

/// Tunables shared by the core services
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// How long demoted groups stay readable after a downgrade selection
    pub read_only_access_window: Duration,
    /// Known store products keyed by product id
    pub products: HashMap<String, Product>,
    /// Attempts made by a lazy subscription sync before giving up on a
    /// row that keeps changing underneath it
    pub sync_attempts: u32,
    /// Activity feed page size when the caller does not ask for one
    pub default_activity_limit: i64,
    /// Largest activity feed page
    pub max_activity_limit: i64,
}

impl CoreConfig {
    /// Create a config with the default product catalog
    pub fn new() -> Self {
        Self {
            read_only_access_window: Duration::days(30),
            products: HashMap::new(),
            sync_attempts: 3,
            default_activity_limit: 20,
            max_activity_limit: 100,
        }
        .with_product(PREMIUM_MONTHLY, Tier::Premium, 30)
        .with_product(PREMIUM_ANNUAL, Tier::Premium, 365)
    }

    /// Register a product
    pub fn with_product(mut self, product_id: impl Into<String>, tier: Tier, days: i64) -> Self {
        self.products.insert(
            product_id.into(),
            Product {
                tier,
                period: Duration::days(days),
            },
        );
        self
    }

    /// Set the read-only access window
    pub fn with_read_only_window(mut self, window: Duration) -> Self {
        self.read_only_access_window = window;
        self
    }

    /// Look up a product by id
    pub fn product(&self, product_id: &str) -> Option<Product> {
        self.products.get(product_id).copied()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
