use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::LineItem;

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS breakdowns (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                grand_total DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(self.get_pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS breakdown_line_items (
                breakdown_id INTEGER NOT NULL REFERENCES breakdowns(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                description TEXT NOT NULL,
                quantity DOUBLE PRECISION NOT NULL,
                unit_price DOUBLE PRECISION NOT NULL,
                total_price DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (breakdown_id, position)
            )
            "#,
        )
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    /// Persist a finished breakdown and its rows, returning the new breakdown id.
    pub async fn promote(
        &self,
        name: &str,
        line_items: &[LineItem],
        grand_total: f64,
    ) -> Result<i32> {
        // Begin a transaction
        let mut tx = self.pool.begin().await?;

        let breakdown_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO breakdowns (name, grand_total)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(grand_total)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in line_items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO breakdown_line_items
                    (breakdown_id, position, description, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(breakdown_id)
            .bind(position as i32)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .execute(&mut *tx)
            .await?;
        }

        // Commit the transaction
        tx.commit().await?;

        info!(breakdown_id, name, rows = line_items.len(), grand_total, "promoted breakdown");
        Ok(breakdown_id)
    }
}

/// Connect and make sure the promotion tables exist
pub async fn init(database_url: &str) -> Result<Database> {
    let db = Database::connect(database_url).await?;
    db.ensure_schema().await?;
    Ok(db)
}
