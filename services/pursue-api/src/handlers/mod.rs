//! REST API handlers

pub mod activity;
pub mod challenges;
pub mod goals;
pub mod groups;
pub mod health;
pub mod jobs;
pub mod shared;
pub mod subscription;

pub use activity::*;
pub use challenges::*;
pub use goals::*;
pub use groups::*;
pub use health::*;
pub use jobs::*;
pub use subscription::*;
