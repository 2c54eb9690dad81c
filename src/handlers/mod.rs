pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payments;
pub mod products;
pub mod sales;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::application::catalog_service::ProductQuantity;

/// Storefront clients send ids and prices either as JSON numbers or as
/// strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Scalar::deserialize(deserializer)?.into_string();
    BigDecimal::from_str(raw.trim())
        .map_err(|e| de::Error::custom(format!("invalid decimal '{}': {}", raw, e)))
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Scalar::deserialize(deserializer)?.into_string())
}

/// A cart line as sent by clients. Accepts the storefront's `id` spelling;
/// any name or price sent along is ignored in favour of the catalog.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    #[schema(value_type = String)]
    pub product_id: String,
    pub quantity: i32,
}

impl From<CartItemRequest> for ProductQuantity {
    fn from(r: CartItemRequest) -> Self {
        ProductQuantity {
            product_id: r.product_id,
            quantity: r.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
