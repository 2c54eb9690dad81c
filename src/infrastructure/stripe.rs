use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::domain::payment::{
    to_minor_units, IntentHandle, PaymentDetails, PaymentError, PaymentGateway, PaymentResult,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub timeout: Duration,
    pub minimum_amount: BigDecimal,
}

/// Stripe PaymentIntent, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    status: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    latest_charge: Option<String>,
    last_payment_error: Option<StripeErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeErrorBody {
    fn describe(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "payment declined".to_string())
    }
}

pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Provider(format!("http client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::Response, PaymentError> {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.config.secret_key)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("Stripe request failed: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<IntentHandle, PaymentError> {
        let currency = currency.to_lowercase();
        let amount_minor = to_minor_units(amount, &currency, &self.config.minimum_amount)?;

        let mut params = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            // Confirmation happens server-side without a return URL.
            (
                "automatic_payment_methods[allow_redirects]".to_string(),
                "never".to_string(),
            ),
        ];
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value));
        }

        let response = self.post_form("/v1/payment_intents", &params).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Stripe rejected intent creation ({}): {}", status, body);
            return Err(PaymentError::Provider(format!(
                "Stripe returned {} creating the payment intent",
                status
            )));
        }

        let intent: PaymentIntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("unreadable Stripe response: {}", e)))?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::Provider(format!("intent {} has no client secret", intent.id))
        })?;

        log::info!("Stripe payment intent {} created", intent.id);
        Ok(IntentHandle {
            intent_id: intent.id,
            client_secret,
            amount_minor: intent.amount,
            currency: intent.currency,
        })
    }

    async fn confirm(
        &self,
        intent: &IntentHandle,
        details: &PaymentDetails,
    ) -> Result<PaymentResult, PaymentError> {
        let path = format!("/v1/payment_intents/{}/confirm", intent.intent_id);
        let params = [("payment_method".to_string(), details.token.clone())];

        let response = self.post_form(&path, &params).await?;
        let status = response.status();

        if status.is_server_error() {
            return Err(PaymentError::Provider(format!(
                "Stripe returned {} confirming {}",
                status, intent.intent_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<StripeErrorEnvelope>(&body).ok();
            let is_card_error = error
                .as_ref()
                .and_then(|e| e.error.kind.as_deref())
                .map_or(false, |kind| kind == "card_error");
            if status == reqwest::StatusCode::PAYMENT_REQUIRED || is_card_error {
                let reason = error
                    .map(|e| e.error.describe())
                    .unwrap_or_else(|| "payment declined".to_string());
                return Ok(PaymentResult::declined(reason));
            }
            log::warn!("Stripe rejected confirmation ({}): {}", status, body);
            return Err(PaymentError::Provider(format!(
                "Stripe returned {} confirming {}",
                status, intent.intent_id
            )));
        }

        let confirmed: PaymentIntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("unreadable Stripe response: {}", e)))?;

        match confirmed.status.as_str() {
            "succeeded" => Ok(PaymentResult::succeeded(
                confirmed.latest_charge.unwrap_or(confirmed.id),
            )),
            "requires_payment_method" => Ok(PaymentResult::declined(
                confirmed
                    .last_payment_error
                    .map(|e| e.describe())
                    .unwrap_or_else(|| "payment declined".to_string()),
            )),
            other => Err(PaymentError::Provider(format!(
                "intent {} is '{}' after confirmation",
                confirmed.id, other
            ))),
        }
    }
}
