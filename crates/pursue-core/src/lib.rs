//! Pursue Core - Business logic
//!
//! Group limits by subscription tier, the over-limit downgrade flow, the
//! challenge lifecycle, goals and progress, heat scoring and the activity
//! feed.
//!
//! # Example
//!
//! ```rust,ignore
//! use pursue_core::{CoreConfig, Services};
//! use pursue_db::{MemoryStore, Repositories};
//!
//! let services = Services::new(Repositories::in_memory(MemoryStore::new()), CoreConfig::new());
//!
//! let eligibility = services.subscriptions.eligibility(user_id).await?;
//! if eligibility.can_create_group {
//!     services.groups.create_group(user_id, new_group).await?;
//! }
//! ```

pub mod challenge;
pub mod config;
pub mod error;
pub mod heat;
pub mod policy;
pub mod service;

pub use config::{CoreConfig, Product};
pub use error::{CoreError, CoreResult};
pub use heat::{Heat, HeatTier};
pub use policy::{Eligibility, ExportRange};
pub use service::*;
