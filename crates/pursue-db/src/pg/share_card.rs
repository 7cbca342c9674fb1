//! PostgreSQL challenge share card repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::ShareCardRow;
use crate::repo::{CreateShareCard, ShareCardRepository};

/// PostgreSQL share card repository
#[derive(Clone)]
pub struct PgShareCardRepository {
    pool: PgPool,
}

impl PgShareCardRepository {
    /// Create a new share card repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareCardRepository for PgShareCardRepository {
    async fn create_if_absent(&self, card: CreateShareCard) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO challenge_share_cards (id, user_id, group_id, title, subtitle, stat,
                                               quote, background, referral_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, group_id) DO NOTHING
            "#,
        )
        .bind(card.id)
        .bind(card.user_id)
        .bind(card.group_id)
        .bind(&card.title)
        .bind(&card.subtitle)
        .bind(&card.stat)
        .bind(&card.quote)
        .bind(&card.background)
        .bind(&card.referral_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, user_id: Uuid, group_id: Uuid) -> DbResult<Option<ShareCardRow>> {
        let row = sqlx::query_as::<_, ShareCardRow>(
            r#"
            SELECT id, user_id, group_id, title, subtitle, stat, quote, background,
                   referral_token, created_at
            FROM challenge_share_cards
            WHERE user_id = $1 AND group_id = $2
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
