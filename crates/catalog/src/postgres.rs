use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{ItemId, Money};

use crate::{CatalogError, CatalogStore, Item, NewItem, Result};

/// PostgreSQL-backed catalog store.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_item(row: PgRow) -> Result<Item> {
        Ok(Item {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get::<i64, _>("price_cents")?),
            stock_level: row.try_get::<i64, _>("stock_level")? as u32,
            category: row.try_get("category")?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn list(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock_level, category, image_url, created_at
            FROM items
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock_level, category, image_url, created_at
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn create(&self, new: NewItem) -> Result<Item> {
        new.validate()?;
        let item = new.into_item();

        sqlx::query(
            r#"
            INSERT INTO items (id, name, description, price_cents, stock_level, category, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .bind(item.stock_level as i64)
        .bind(&item.category)
        .bind(&item.image_url)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    async fn update(&self, item: Item) -> Result<()> {
        item.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE items
            SET name = $2,
                description = $3,
                price_cents = $4,
                stock_level = $5,
                category = $6,
                image_url = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .bind(item.stock_level as i64)
        .bind(&item.category)
        .bind(&item.image_url)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(item.id));
        }
        Ok(())
    }

    async fn delete(&self, id: ItemId) -> Result<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }

    async fn decrement_stock(&self, id: ItemId, quantity: u32) -> Result<()> {
        // Atomic floor-checked decrement: the WHERE clause makes the
        // check-and-update a single statement, and the affected-row count
        // tells us whether it applied.
        let result = sqlx::query(
            r#"
            UPDATE items
            SET stock_level = stock_level - $2, updated_at = NOW()
            WHERE id = $1 AND stock_level >= $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Distinguish a missing item from an insufficient-stock refusal.
        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock_level FROM items WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match available {
            Some(available) => Err(CatalogError::InsufficientStock {
                item_id: id,
                available: available as u32,
                requested: quantity,
            }),
            None => Err(CatalogError::NotFound(id)),
        }
    }

    async fn restock(&self, id: ItemId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET stock_level = stock_level + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }
}
