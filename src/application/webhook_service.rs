//! Applies payment-provider events to orders.
//!
//! Events are authenticated with the `Stripe-Signature` scheme: an HMAC-SHA256
//! over `"{timestamp}.{raw body}"`, hex encoded, with the timestamp bounded by
//! a tolerance window. Delivery is at-least-once and unordered, so every
//! event goes through the same idempotent `update_status` as checkout.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus, StatusChange, StatusEvidence, TransitionSource};
use crate::domain::ports::{Notifier, OrderRepository};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{0}")]
    Signature(String),
    #[error("{0}")]
    Payload(String),
    #[error(transparent)]
    Store(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied { order_id: Uuid, status: OrderStatus },
    Duplicate { order_id: Uuid, status: OrderStatus },
    /// Contradicts the stored status; logged, not applied.
    Rejected { order_id: Uuid },
    UnknownOrder,
    Ignored,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    latest_charge: Option<String>,
    last_payment_error: Option<PaymentErrorObject>,
}

#[derive(Debug, Deserialize)]
struct PaymentErrorObject {
    code: Option<String>,
    message: Option<String>,
}

/// Builds a `Stripe-Signature` header value for `payload`.
pub fn signature_header(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, WebhookError> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_payload_mac(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::Signature(format!("unusable webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        WebhookError::Signature("Unable to extract timestamp from signature header".to_string())
    })?;
    if signatures.is_empty() {
        return Err(WebhookError::Signature(
            "No v1 signature found in signature header".to_string(),
        ));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::Signature(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    let mac = signed_payload_mac(secret, timestamp, payload)?;
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(WebhookError::Signature(
            "No signatures found matching the expected signature for payload".to_string(),
        ))
    }
}

pub struct WebhookService {
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
    secret: Option<String>,
    tolerance_secs: i64,
}

impl WebhookService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        notifier: Arc<dyn Notifier>,
        secret: Option<String>,
    ) -> Self {
        Self {
            orders,
            notifier,
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Verifies and applies one delivery. Blocking: call from a blocking
    /// context.
    pub fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            WebhookError::Signature("webhook secret is not configured".to_string())
        })?;
        let signature = signature.ok_or_else(|| {
            WebhookError::Signature("missing Stripe-Signature header".to_string())
        })?;
        verify_signature(
            secret,
            signature,
            payload,
            chrono::Utc::now().timestamp(),
            self.tolerance_secs,
        )?;

        let event: Event = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::Payload(format!("invalid event payload: {}", e)))?;

        let target = match event.kind.as_str() {
            PAYMENT_SUCCEEDED => OrderStatus::Paid,
            PAYMENT_FAILED => OrderStatus::Failed,
            other => {
                log::info!("Ignoring webhook event {} of type {}", event.id, other);
                return Ok(WebhookOutcome::Ignored);
            }
        };
        let intent: IntentObject = serde_json::from_value(event.data.object)
            .map_err(|e| WebhookError::Payload(format!("invalid payment intent: {}", e)))?;

        let Some(order) = self.resolve_order(&intent)? else {
            log::warn!(
                "Webhook event {} for intent {} matches no stored order; acknowledging without reconciliation",
                event.id,
                intent.id
            );
            return Ok(WebhookOutcome::UnknownOrder);
        };

        let mut evidence = StatusEvidence::new(TransitionSource::Webhook).with_intent(&intent.id);
        if let Some(charge) = intent.latest_charge {
            evidence = evidence.with_provider_payment(charge);
        }
        if target == OrderStatus::Failed {
            let reason = intent
                .last_payment_error
                .and_then(|e| e.message.or(e.code))
                .unwrap_or_else(|| "payment failed".to_string());
            evidence = evidence.with_failure(reason);
        }

        match self.orders.update_status(order.order_id, target, evidence) {
            Ok(StatusChange::Applied(order)) => {
                log::info!(
                    "Webhook event {} moved order {} to {}",
                    event.id,
                    order.order_id,
                    order.status
                );
                if order.status == OrderStatus::Paid {
                    if let Err(e) = self.notifier.order_confirmed(&order, &order.customer.email) {
                        log::warn!("Confirmation for order {} not sent: {}", order.order_id, e);
                    }
                }
                Ok(WebhookOutcome::Applied {
                    order_id: order.order_id,
                    status: order.status,
                })
            }
            Ok(StatusChange::Unchanged(order)) => {
                log::info!(
                    "Webhook event {} is a duplicate for order {} ({})",
                    event.id,
                    order.order_id,
                    order.status
                );
                Ok(WebhookOutcome::Duplicate {
                    order_id: order.order_id,
                    status: order.status,
                })
            }
            Err(DomainError::InvalidTransition { order_id, from, to }) => {
                log::error!(
                    "Webhook event {} ({}) contradicts order {}: {} -> {} refused; needs reconciliation",
                    event.id,
                    event.kind,
                    order_id,
                    from,
                    to
                );
                Ok(WebhookOutcome::Rejected { order_id })
            }
            Err(DomainError::NotFound) => Ok(WebhookOutcome::UnknownOrder),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_order(&self, intent: &IntentObject) -> Result<Option<Order>, DomainError> {
        if let Some(order_id) = intent
            .metadata
            .get("order_id")
            .and_then(|id| Uuid::parse_str(id).ok())
        {
            if let Some(order) = self.orders.find_by_id(order_id)? {
                return Ok(Some(order));
            }
        }
        self.orders.find_by_payment_intent(&intent.id)
    }
}
