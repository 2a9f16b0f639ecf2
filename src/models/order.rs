use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;

/// Payment lifecycle of an order. Transitions only Pending -> Paid and
/// Pending -> Failed; terminal states never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// A booking request plus its payment state, persisted in the ledger and
/// keyed by the globally unique `order_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub chat_id: ChatId,
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub location: Option<String>,
    pub duration_days: u32,
    pub price_minor: i64,
    pub name: String,
    pub contact: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Invoice issued by the payment processor, 1:1 with a pending order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRef {
    pub invoice_id: String,
    pub url: String,
}
