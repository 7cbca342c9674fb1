//! PostgreSQL repository implementations

mod activity;
mod goal;
mod group;
mod membership;
mod progress;
mod share_card;
mod subscription;
mod user;

pub use activity::PgActivityRepository;
pub use goal::PgGoalRepository;
pub use group::PgGroupRepository;
pub use membership::PgMembershipRepository;
pub use progress::PgProgressRepository;
pub use share_card::PgShareCardRepository;
pub use subscription::PgSubscriptionRepository;
pub use user::PgUserRepository;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repo::HealthCheck;

/// Column list shared by every query returning [`crate::GroupRow`]
pub(crate) const GROUP_COLUMNS: &str = "g.id, g.name, g.description, g.creator_id, g.visibility, \
     g.invite_code, g.is_challenge, g.challenge_start_date, g.challenge_end_date, \
     g.challenge_status, g.challenge_template_id, g.created_at";

/// Column list shared by every query returning [`crate::MembershipRow`]
pub(crate) const MEMBERSHIP_COLUMNS: &str =
    "m.group_id, m.user_id, m.role, m.status, m.read_only, m.read_only_since, m.joined_at";

/// Take the per-user lock that serializes limit checks and downgrade
/// resolution. Must be called inside a transaction.
pub(crate) async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> DbResult<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT subscription_status FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(DbError::NotFound)
}

/// Active memberships in non-challenge groups
pub(crate) async fn count_active_regular(conn: &mut PgConnection, user_id: Uuid) -> DbResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM memberships m
        JOIN groups g ON g.id = m.group_id
        WHERE m.user_id = $1 AND m.status = 'active' AND NOT g.is_challenge
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// PostgreSQL readiness probe
#[derive(Clone)]
pub struct PgHealthCheck {
    pool: PgPool,
}

impl PgHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PgHealthCheck {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
