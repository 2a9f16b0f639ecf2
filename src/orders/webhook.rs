use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::OrderLifecycle;

const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Clone)]
pub struct WebhookState {
    lifecycle: Arc<OrderLifecycle>,
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(alias = "order_id")]
    correlation_id: String,
    status: String,
}

pub fn router(lifecycle: Arc<OrderLifecycle>, secret: Option<String>) -> Router {
    Router::new()
        .route("/payments/webhook", post(handle_payment_webhook))
        .with_state(WebhookState { lifecycle, secret })
}

pub async fn serve(bind: SocketAddr, router: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("payment webhook listening on {bind}");
    axum::serve(listener, router).await?;
    Ok(())
}

/// Asynchronous entry point from the payment processor. Uncorrelated with
/// any live session: the order and destination chat are resolved purely
/// from the persisted order id.
async fn handle_payment_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(signature) = headers.get(SIGNATURE_HEADER) {
        let Some(secret) = state.secret.as_deref() else {
            log::error!("security: signed webhook received but no WEBHOOK_SECRET configured");
            return StatusCode::UNAUTHORIZED;
        };
        let valid = signature
            .to_str()
            .ok()
            .map(|sig| verify_signature(secret, &body, sig))
            .unwrap_or(false);
        if !valid {
            log::error!("security: webhook signature verification failed");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("malformed webhook payload: {e}");
            return StatusCode::BAD_REQUEST;
        }
    };

    match state
        .lifecycle
        .reconcile(&payload.correlation_id, &payload.status)
        .await
    {
        // Unknown order ids are accepted too: a 4xx/5xx here would only
        // cause sender-side retry storms.
        Ok(_) => StatusCode::OK,
        Err(e) => {
            log::error!("webhook reconcile failed for {}: {e}", payload.correlation_id);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// HMAC-SHA256 over the raw payload, hex-encoded signature.
fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::tests::{CountingNotifier, FlakyProcessor, MemLedger};
    use crate::orders::OrderLedger;
    use crate::models::{BookingIntent, PaymentStatus};
    use axum::http::HeaderValue;
    use std::sync::atomic::AtomicUsize;
    use teloxide::types::ChatId;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn test_state(secret: Option<&str>) -> (WebhookState, Arc<MemLedger>) {
        let ledger = Arc::new(MemLedger::new());
        let lifecycle = Arc::new(OrderLifecycle::new(
            ledger.clone(),
            Arc::new(FlakyProcessor {
                fail: false,
                issued: AtomicUsize::new(0),
            }),
            Arc::new(CountingNotifier {
                paid: AtomicUsize::new(0),
            }),
        ));
        (
            WebhookState {
                lifecycle,
                secret: secret.map(String::from),
            },
            ledger,
        )
    }

    async fn seed_order(state: &WebhookState) -> String {
        let intent = BookingIntent {
            title: "Дюна".to_string(),
            author: None,
            genre: None,
            location: None,
            duration_days: 7,
            price_table: [(7, 70)].into_iter().collect(),
            name: "Олена".to_string(),
            contact: "+380501234567".to_string(),
        };
        state
            .lifecycle
            .create_order(ChatId(7), &intent)
            .await
            .unwrap()
            .order_id
    }

    #[test]
    fn signature_roundtrip_verifies() {
        let body = br#"{"correlation_id":"abc","status":"PAID"}"#;
        let sig = sign("topsecret", body);
        assert!(verify_signature("topsecret", body, &sig));
        assert!(!verify_signature("wrong", body, &sig));
        assert!(!verify_signature("topsecret", b"tampered", &sig));
        assert!(!verify_signature("topsecret", body, "not-hex"));
    }

    #[tokio::test]
    async fn valid_signed_webhook_flips_the_order() {
        let (state, ledger) = test_state(Some("s3cret"));
        let order_id = seed_order(&state).await;
        let body = format!(r#"{{"correlation_id":"{order_id}","status":"PAID"}}"#);
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&sign("s3cret", body.as_bytes())).unwrap(),
        );

        let code = handle_payment_webhook(
            State(state),
            headers,
            Bytes::from(body.into_bytes()),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(
            ledger.find(&order_id).await.unwrap().unwrap().status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected_outright() {
        let (state, ledger) = test_state(Some("s3cret"));
        let order_id = seed_order(&state).await;
        let body = format!(r#"{{"correlation_id":"{order_id}","status":"PAID"}}"#);
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("deadbeef"));

        let code = handle_payment_webhook(
            State(state),
            headers,
            Bytes::from(body.into_bytes()),
        )
        .await;
        assert_eq!(code, StatusCode::UNAUTHORIZED);
        assert_eq!(
            ledger.find(&order_id).await.unwrap().unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn unknown_order_still_returns_ok() {
        let (state, _) = test_state(None);
        let body = br#"{"order_id":"nope","status":"PAID"}"#.to_vec();
        let code =
            handle_payment_webhook(State(state), HeaderMap::new(), Bytes::from(body)).await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_bad_request() {
        let (state, _) = test_state(None);
        let code = handle_payment_webhook(
            State(state),
            HeaderMap::new(),
            Bytes::from_static(b"{not json"),
        )
        .await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }
}
