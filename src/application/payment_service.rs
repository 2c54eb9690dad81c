use std::collections::BTreeMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::payment::{IntentHandle, PaymentError, PaymentGateway};

/// Intent created by the relay, tagged with a freshly minted order id.
#[derive(Debug, Clone)]
pub struct RelayedIntent {
    pub order_id: Uuid,
    pub intent: IntentHandle,
}

/// Thin relay for clients that confirm payment on their side with the
/// provider's client secret.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    default_currency: String,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, default_currency: impl Into<String>) -> Self {
        Self {
            gateway,
            default_currency: default_currency.into(),
        }
    }

    pub async fn create_intent(
        &self,
        amount: &BigDecimal,
        currency: Option<&str>,
        customer_email: Option<&str>,
    ) -> Result<RelayedIntent, PaymentError> {
        let order_id = Uuid::new_v4();
        let currency = currency
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default_currency)
            .to_lowercase();

        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), order_id.to_string());
        metadata.insert(
            "customer_email".to_string(),
            customer_email.unwrap_or_default().to_string(),
        );

        let intent = self.gateway.create_intent(amount, &currency, metadata).await?;
        log::info!(
            "Relayed {} intent {} for order {}",
            self.gateway.name(),
            intent.intent_id,
            order_id
        );
        Ok(RelayedIntent { order_id, intent })
    }
}
