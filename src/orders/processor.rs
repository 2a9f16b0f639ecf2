use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::InvoiceRef;

const RETRIES: u32 = 1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("платіжний сервіс недоступний: {0}")]
    Transport(String),
    #[error("платіжний сервіс відповів помилкою: {0}")]
    Rejected(String),
}

/// External payment capability. The correlation id is the order id; the
/// processor echoes it back through the webhook.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_invoice(
        &self,
        amount_minor: i64,
        description: &str,
        correlation_id: &str,
    ) -> Result<InvoiceRef, ProcessorError>;
}

#[derive(Serialize)]
struct CreateInvoiceRequest<'a> {
    amount: i64,
    description: &'a str,
    correlation_id: &'a str,
}

#[derive(Deserialize)]
struct CreateInvoiceResponse {
    invoice_id: String,
    url: String,
}

/// HTTP implementation against the processor's REST API, with the same
/// retry middleware setup the rest of the codebase uses for outbound HTTP.
pub struct HttpPaymentProcessor {
    client: ClientWithMiddleware,
    base_url: String,
    api_token: String,
}

impl HttpPaymentProcessor {
    pub fn new(base_url: String, api_token: String) -> Result<Self, ProcessorError> {
        let inner = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRIES);
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn create_invoice(
        &self,
        amount_minor: i64,
        description: &str,
        correlation_id: &str,
    ) -> Result<InvoiceRef, ProcessorError> {
        let request = CreateInvoiceRequest {
            amount: amount_minor,
            description,
            correlation_id,
        };

        let response = self
            .client
            .post(format!("{}/invoices", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessorError::Rejected(format!("{status}: {body}")));
        }

        let parsed: CreateInvoiceResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::Rejected(e.to_string()))?;
        Ok(InvoiceRef {
            invoice_id: parsed.invoice_id,
            url: parsed.url,
        })
    }
}
