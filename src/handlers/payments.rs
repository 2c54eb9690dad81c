use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{decimal, ErrorResponse};
use crate::errors::AppError;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentIntentRequest {
    /// Amount in major units, e.g. 38.38
    #[serde(deserialize_with = "decimal")]
    #[schema(value_type = String)]
    pub amount: BigDecimal,
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /api/create-payment-intent
#[utoipa::path(
    post,
    path = "/api/create-payment-intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = CreatePaymentIntentResponse),
        (status = 400, description = "Amount below the minimum", body = ErrorResponse),
        (status = 502, description = "Payment provider error", body = ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn create_payment_intent(
    state: web::Data<AppState>,
    body: web::Json<CreatePaymentIntentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let email = body.customer_details.and_then(|c| c.email);

    let relayed = state
        .payments
        .create_intent(&body.amount, body.currency.as_deref(), email.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(CreatePaymentIntentResponse {
        client_secret: relayed.intent.client_secret,
        order_id: relayed.order_id,
    }))
}

/// POST /api/stripe-webhook
///
/// The raw body is needed for signature verification, so it is taken as
/// bytes rather than JSON.
#[utoipa::path(
    post,
    path = "/api/stripe-webhook",
    request_body(content = String, content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<timestamp>,v1=<hex hmac>"),
    ),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Webhook Error: <detail>", body = String),
    ),
    tag = "payments"
)]
pub async fn stripe_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let webhooks = state.webhooks.clone();
    let outcome = web::block(move || webhooks.handle(&body, signature.as_deref())).await??;
    log::debug!("Webhook processed: {:?}", outcome);

    Ok(HttpResponse::Ok().json(WebhookAck { received: true }))
}
