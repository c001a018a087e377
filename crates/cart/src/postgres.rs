use async_trait::async_trait;
use sqlx::PgPool;

use common::Identity;

use crate::{CartError, CartStore, Result, StoredCart};

/// PostgreSQL-backed cart store.
///
/// One JSONB row per identity storage key in the `carts` table. All
/// database failures surface as retryable [`CartError::Persistence`]; the
/// service keeps the visible cart at its last valid state when a save
/// fails.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    /// Creates a new PostgreSQL cart store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn save(&self, identity: &Identity, cart: &StoredCart) -> Result<()> {
        let payload = serde_json::to_value(cart)?;

        sqlx::query(
            r#"
            INSERT INTO carts (identity, payload, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (identity)
            DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()
            "#,
        )
        .bind(identity.storage_key())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| CartError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, identity: &Identity) -> Result<Option<StoredCart>> {
        let payload: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT payload FROM carts WHERE identity = $1")
                .bind(identity.storage_key())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CartError::Persistence(e.to_string()))?;

        payload
            .map(|p| serde_json::from_value(p).map_err(CartError::from))
            .transpose()
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        sqlx::query("DELETE FROM carts WHERE identity = $1")
            .bind(identity.storage_key())
            .execute(&self.pool)
            .await
            .map_err(|e| CartError::Persistence(e.to_string()))?;

        Ok(())
    }
}
