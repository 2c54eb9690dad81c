use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::payment::{
    to_minor_units, IntentHandle, PaymentDetails, PaymentError, PaymentGateway, PaymentResult,
};

pub const DECLINE_TOKEN_PREFIX: &str = "tok_chargeDeclined";
pub const UNAVAILABLE_TOKEN: &str = "tok_unavailable";

/// In-process stand-in for the payment provider, used when no Stripe key is
/// configured. Outcomes are chosen by the card token.
pub struct SandboxGateway {
    minimum_amount: BigDecimal,
}

impl SandboxGateway {
    pub fn new(minimum_amount: BigDecimal) -> Self {
        Self { minimum_amount }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn create_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        _metadata: BTreeMap<String, String>,
    ) -> Result<IntentHandle, PaymentError> {
        let currency = currency.to_lowercase();
        let amount_minor = to_minor_units(amount, &currency, &self.minimum_amount)?;
        let intent_id = format!("pi_sandbox_{}", Uuid::new_v4().simple());
        Ok(IntentHandle {
            client_secret: format!("{}_secret_{}", intent_id, Uuid::new_v4().simple()),
            intent_id,
            amount_minor,
            currency,
        })
    }

    async fn confirm(
        &self,
        intent: &IntentHandle,
        details: &PaymentDetails,
    ) -> Result<PaymentResult, PaymentError> {
        if details.token.starts_with(DECLINE_TOKEN_PREFIX) {
            return Ok(PaymentResult::declined("Your card was declined."));
        }
        if details.token == UNAVAILABLE_TOKEN {
            return Err(PaymentError::Provider(
                "sandbox provider unavailable".to_string(),
            ));
        }
        Ok(PaymentResult::succeeded(format!(
            "ch_sandbox_{}",
            intent.intent_id.trim_start_matches("pi_sandbox_")
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn gateway() -> SandboxGateway {
        SandboxGateway::new(BigDecimal::from_str("0.50").unwrap())
    }

    async fn intent() -> IntentHandle {
        gateway()
            .create_intent(&BigDecimal::from_str("38.38").unwrap(), "EUR", BTreeMap::new())
            .await
            .unwrap()
    }

    fn token(t: &str) -> PaymentDetails {
        PaymentDetails {
            token: t.to_string(),
        }
    }

    #[tokio::test]
    async fn intents_are_unique_and_in_minor_units() {
        let a = intent().await;
        let b = intent().await;
        assert_ne!(a.intent_id, b.intent_id);
        assert!(a.intent_id.starts_with("pi_sandbox_"));
        assert_eq!(a.amount_minor, 3838);
        assert_eq!(a.currency, "eur");
    }

    #[tokio::test]
    async fn outcome_follows_token() {
        let intent = intent().await;
        let g = gateway();
        assert!(g.confirm(&intent, &token("tok_visa")).await.unwrap().success);
        assert!(!g
            .confirm(&intent, &token("tok_chargeDeclinedInsufficientFunds"))
            .await
            .unwrap()
            .success);
        assert!(matches!(
            g.confirm(&intent, &token(UNAVAILABLE_TOKEN)).await,
            Err(PaymentError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn minimum_amount_enforced() {
        let err = gateway()
            .create_intent(&BigDecimal::from_str("0.10").unwrap(), "eur", BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::AmountTooSmall { .. }));
    }
}
