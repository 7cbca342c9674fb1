//! Subscription tier types

use serde::{Deserialize, Serialize};

/// Subscription tier levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier - one regular group, 30-day exports
    Free,
    /// Premium tier - ten regular groups, 365-day exports, custom challenges
    Premium,
}

impl Tier {
    /// Maximum number of active regular (non-challenge) groups
    pub const fn group_limit(&self) -> i64 {
        match self {
            Self::Free => 1,
            Self::Premium => 10,
        }
    }

    /// Longest progress export window, in inclusive days
    pub const fn export_range_days(&self) -> i64 {
        match self {
            Self::Free => 30,
            Self::Premium => 365,
        }
    }

    /// Whether this tier may create challenges without a template
    pub const fn can_create_custom_challenge(&self) -> bool {
        matches!(self, Self::Premium)
    }

    /// Database / wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            _ => Err(TierParseError(s.to_string())),
        }
    }
}

/// Error parsing a tier string
#[derive(Debug, Clone)]
pub struct TierParseError(pub String);

impl std::fmt::Display for TierParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid tier: {}", self.0)
    }
}

impl std::error::Error for TierParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_limits() {
        assert_eq!(Tier::Free.group_limit(), 1);
        assert_eq!(Tier::Premium.group_limit(), 10);
    }

    #[test]
    fn test_export_ranges() {
        assert_eq!(Tier::Free.export_range_days(), 30);
        assert_eq!(Tier::Premium.export_range_days(), 365);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("PREMIUM".parse::<Tier>().unwrap(), Tier::Premium);
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
        assert!("gold".parse::<Tier>().is_err());
    }
}
