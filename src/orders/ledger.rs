use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use teloxide::types::ChatId;
use thiserror::Error;

use crate::database::Database;
use crate::models::{Order, PaymentStatus};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger write failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt ledger row for order {0}")]
    CorruptRow(String),
}

/// Order persistence keyed by order id. Upserts are idempotent and never
/// touch `payment_status`; terminal transitions go through
/// `mark_terminal`, a compare-and-set against Pending.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn upsert(&self, order: &Order) -> Result<(), LedgerError>;

    async fn find(&self, order_id: &str) -> Result<Option<Order>, LedgerError>;

    /// Apply Pending -> `status`. Returns the updated order when this call
    /// won the transition, `None` when the order was already terminal.
    async fn mark_terminal(
        &self,
        order_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Order>, LedgerError>;
}

pub struct PgOrderLedger {
    db: Database,
}

impl PgOrderLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn order_from_row(row: &PgRow) -> Result<Order, LedgerError> {
    let order_id: String = row.get("order_id");
    let status_raw: String = row.get("payment_status");
    let status = PaymentStatus::parse(&status_raw)
        .ok_or_else(|| LedgerError::CorruptRow(order_id.clone()))?;
    Ok(Order {
        order_id,
        chat_id: ChatId(row.get::<i64, _>("chat_id")),
        title: row.get("title"),
        author: row.get("author"),
        genre: row.get("genre"),
        location: row.get("location"),
        duration_days: row.get::<i32, _>("duration_days") as u32,
        price_minor: row.get("price_minor"),
        name: row.get("name"),
        contact: row.get("contact"),
        status,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    async fn upsert(&self, order: &Order) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (order_id, chat_id, title, author, genre, location,
                 duration_days, price_minor, name, contact, payment_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (order_id)
            DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                genre = EXCLUDED.genre,
                location = EXCLUDED.location,
                duration_days = EXCLUDED.duration_days,
                price_minor = EXCLUDED.price_minor,
                name = EXCLUDED.name,
                contact = EXCLUDED.contact
            "#,
        )
        .bind(&order.order_id)
        .bind(order.chat_id.0)
        .bind(&order.title)
        .bind(&order.author)
        .bind(&order.genre)
        .bind(&order.location)
        .bind(order.duration_days as i32)
        .bind(order.price_minor)
        .bind(&order.name)
        .bind(&order.contact)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, order_id: &str) -> Result<Option<Order>, LedgerError> {
        let row = sqlx::query("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn mark_terminal(
        &self,
        order_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Order>, LedgerError> {
        let row = sqlx::query(
            r#"
            UPDATE orders SET payment_status = $2
            WHERE order_id = $1 AND payment_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .fetch_optional(&self.db.pool)
        .await?;
        row.as_ref().map(order_from_row).transpose()
    }
}
