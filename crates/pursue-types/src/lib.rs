//! Pursue Types - Shared domain types
//!
//! This crate contains domain types used across Pursue services:
//! - Identifiers for users, groups, goals and subscriptions
//! - Subscription tiers and account status
//! - Group membership roles and challenge lifecycle status
//! - Goal cadence, metric types and active-day sets
//! - Activity feed event kinds

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum whose
/// variants map one-to-one onto lowercase database strings.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Database / wire representation
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::error::ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

pub mod activity;
pub mod challenge;
pub mod error;
pub mod goal;
pub mod group;
pub mod ids;
pub mod subscription;
pub mod tier;

pub use activity::*;
pub use challenge::*;
pub use error::*;
pub use goal::*;
pub use group::*;
pub use ids::*;
pub use subscription::*;
pub use tier::*;
