use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        // Catalog rows, edited by the operator and re-read on /reload.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog (
                id SERIAL PRIMARY KEY,
                location TEXT,
                genre TEXT,
                author TEXT,
                title TEXT,
                description TEXT,
                price_by_duration JSONB,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Order ledger, keyed by the opaque order id.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_id TEXT PRIMARY KEY,
                chat_id BIGINT NOT NULL,
                title TEXT NOT NULL,
                author TEXT,
                genre TEXT,
                location TEXT,
                duration_days INTEGER NOT NULL,
                price_minor BIGINT NOT NULL,
                name TEXT NOT NULL,
                contact TEXT NOT NULL,
                payment_status TEXT NOT NULL DEFAULT 'pending',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_chat_id ON orders (chat_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_orders_payment_status ON orders (payment_status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_catalog_location ON catalog (location)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
