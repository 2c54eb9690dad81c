use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Currencies whose smallest unit is the major unit itself.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Amount {amount} is below the minimum of {minimum}")]
    AmountTooSmall { amount: String, minimum: String },
    #[error("Payment provider error: {0}")]
    Provider(String),
}

/// Provider-side handle returned by `create_intent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IntentHandle {
    pub intent_id: String,
    pub client_secret: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Opaque payment credentials collected by the client, e.g. a card token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentDetails {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    pub success: bool,
    pub provider_payment_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl PaymentResult {
    pub fn succeeded(provider_payment_id: impl Into<String>) -> Self {
        Self {
            success: true,
            provider_payment_id: Some(provider_payment_id.into()),
            failure_reason: None,
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_payment_id: None,
            failure_reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// `amount` is in major units; the adapter converts it to minor units.
    async fn create_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<IntentHandle, PaymentError>;

    async fn confirm(
        &self,
        intent: &IntentHandle,
        details: &PaymentDetails,
    ) -> Result<PaymentResult, PaymentError>;
}

pub fn currency_exponent(currency: &str) -> i64 {
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_lowercase().as_str()) {
        0
    } else {
        2
    }
}

/// Converts a major-unit amount into the provider's integer minor units,
/// rounding half-up, after checking it against `minimum` (major units).
pub fn to_minor_units(
    amount: &BigDecimal,
    currency: &str,
    minimum: &BigDecimal,
) -> Result<i64, PaymentError> {
    if amount < minimum {
        return Err(PaymentError::AmountTooSmall {
            amount: amount.to_string(),
            minimum: minimum.to_string(),
        });
    }
    let exponent = currency_exponent(currency);
    let scaled = amount.with_scale_round(exponent, RoundingMode::HalfUp);
    let (digits, _) = scaled.into_bigint_and_exponent();
    digits
        .to_i64()
        .ok_or_else(|| PaymentError::Provider(format!("amount {} is out of range", amount)))
}
