use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use super::orders::OrderEnvelope;
use super::ErrorResponse;
use crate::application::checkout_service::CheckoutRequest;
use crate::domain::order::Customer;
use crate::domain::payment::PaymentDetails;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutBody {
    pub customer: Customer,
    pub payment_method: String,
    pub payment: PaymentDetails,
}

/// POST /api/checkout/{session}
///
/// Turns the session's cart into a paid order. A decline answers 402 and
/// keeps the cart; a provider outage answers 503 and the same request can be
/// retried without creating a second order.
#[utoipa::path(
    post,
    path = "/api/checkout/{session}",
    params(("session" = String, Path, description = "Session id")),
    request_body = CheckoutBody,
    responses(
        (status = 200, description = "Order paid", body = OrderEnvelope),
        (status = 400, description = "Invalid cart or customer data", body = ErrorResponse),
        (status = 402, description = "Payment declined"),
        (status = 503, description = "Payment provider unavailable, retry"),
    ),
    tag = "checkout"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CheckoutBody>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let body = body.into_inner();

    let order = state
        .checkout
        .checkout(
            &session,
            CheckoutRequest {
                customer: body.customer,
                payment_method: body.payment_method,
                payment: body.payment,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(OrderEnvelope {
        success: true,
        order,
    }))
}
