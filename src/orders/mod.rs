pub mod ledger;
pub mod processor;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use teloxide::types::ChatId;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{price_for, BookingIntent, InvoiceRef, Order, PaymentStatus};

pub use ledger::{LedgerError, OrderLedger, PgOrderLedger};
pub use processor::{HttpPaymentProcessor, PaymentProcessor, ProcessorError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("booking is missing a required detail")]
    IncompleteBooking,
    #[error("no price for a {0}-day rental")]
    PriceUnavailable(u32),
    #[error(transparent)]
    Persistence(#[from] LedgerError),
    #[error(transparent)]
    Invoice(#[from] ProcessorError),
}

/// What `reconcile` did with a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Updated(PaymentStatus),
    AlreadyTerminal,
    UnknownOrder,
    IgnoredStatus,
}

/// Delivers the "payment received" message to the originating chat. The
/// webhook path has no live session; the chat id comes from the ledger row.
#[async_trait]
pub trait PaidNotifier: Send + Sync {
    async fn notify_paid(&self, order: &Order);
}

pub struct OrderLifecycle {
    ledger: Arc<dyn OrderLedger>,
    processor: Arc<dyn PaymentProcessor>,
    notifier: Arc<dyn PaidNotifier>,
}

impl OrderLifecycle {
    pub fn new(
        ledger: Arc<dyn OrderLedger>,
        processor: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn PaidNotifier>,
    ) -> Self {
        Self {
            ledger,
            processor,
            notifier,
        }
    }

    /// Persist a fresh Pending order for a completed booking. The upsert
    /// is idempotent on the order id, so a retried call cannot duplicate.
    pub async fn create_order(
        &self,
        chat_id: ChatId,
        intent: &BookingIntent,
    ) -> Result<Order, LifecycleError> {
        if intent.title.is_empty() || intent.name.is_empty() || intent.contact.is_empty() {
            return Err(LifecycleError::IncompleteBooking);
        }
        let price_minor = price_for(&intent.price_table, intent.duration_days)
            .ok_or(LifecycleError::PriceUnavailable(intent.duration_days))?;

        let order = Order {
            order_id: Uuid::new_v4().to_string(),
            chat_id,
            title: intent.title.clone(),
            author: intent.author.clone(),
            genre: intent.genre.clone(),
            location: intent.location.clone(),
            duration_days: intent.duration_days,
            price_minor,
            name: intent.name.clone(),
            contact: intent.contact.clone(),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        self.ledger.upsert(&order).await?;
        log::info!(
            "order {} created: {} / {} days / {} minor units (chat {})",
            order.order_id,
            order.title,
            order.duration_days,
            order.price_minor,
            chat_id
        );
        Ok(order)
    }

    /// Ask the processor for an invoice. On failure the order stays
    /// Pending; a fresh invoice under the same order id is permitted.
    pub async fn request_invoice(&self, order: &Order) -> Result<InvoiceRef, LifecycleError> {
        let description = format!(
            "Оренда «{}» на {} дн.",
            order.title, order.duration_days
        );
        let invoice = self
            .processor
            .create_invoice(order.price_minor, &description, &order.order_id)
            .await?;
        log::info!("invoice {} issued for order {}", invoice.invoice_id, order.order_id);
        Ok(invoice)
    }

    pub async fn find_order(&self, order_id: &str) -> Result<Option<Order>, LifecycleError> {
        Ok(self.ledger.find(order_id).await?)
    }

    /// Webhook entry point. Safe under at-least-once delivery: duplicate
    /// or out-of-order deliveries for a terminal order are no-ops, and an
    /// unknown order id is logged and accepted so the sender does not
    /// retry forever.
    pub async fn reconcile(
        &self,
        order_id: &str,
        external_status: &str,
    ) -> Result<ReconcileOutcome, LifecycleError> {
        let Some(status) = map_external_status(external_status) else {
            log::warn!(
                "webhook for order {} carries unmapped status {:?}, ignoring",
                order_id,
                external_status
            );
            return Ok(ReconcileOutcome::IgnoredStatus);
        };

        let Some(existing) = self.ledger.find(order_id).await? else {
            log::warn!("webhook for unknown order {}, ignoring", order_id);
            return Ok(ReconcileOutcome::UnknownOrder);
        };
        if existing.status.is_terminal() {
            log::debug!(
                "order {} already {}, duplicate webhook ignored",
                order_id,
                existing.status.as_str()
            );
            return Ok(ReconcileOutcome::AlreadyTerminal);
        }

        // Compare-and-set against Pending resolves races between
        // concurrent deliveries: only one caller sees the updated row.
        match self.ledger.mark_terminal(order_id, status).await? {
            Some(order) => {
                log::info!("order {} -> {}", order_id, status.as_str());
                if status == PaymentStatus::Paid {
                    self.notifier.notify_paid(&order).await;
                }
                Ok(ReconcileOutcome::Updated(status))
            }
            None => Ok(ReconcileOutcome::AlreadyTerminal),
        }
    }
}

/// Map the processor's vocabulary onto the ledger's terminal states.
fn map_external_status(raw: &str) -> Option<PaymentStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "paid" | "success" | "succeeded" | "completed" => Some(PaymentStatus::Paid),
        "failed" | "failure" | "expired" | "cancelled" | "canceled" | "rejected" => {
            Some(PaymentStatus::Failed)
        }
        _ => None,
    }
}
