use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CartItemRequest, ErrorResponse};
use crate::application::order_service::NewOrder;
use crate::domain::order::{Customer, Order};
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer: Option<Customer>,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderEnvelope {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmationEmailRequest {
    #[serde(alias = "orderId")]
    pub order_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationEmailResponse {
    pub success: bool,
    pub message: String,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/orders
///
/// Prices and records a pending order. The order row, its lines and an
/// `OrderCreated` outbox event are written in one transaction.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderEnvelope),
        (status = 400, description = "Incomplete order data", body = ErrorResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let customer = body
        .customer
        .ok_or_else(|| AppError::BadRequest("Incomplete order data: missing customer".to_string()))?;
    let input = NewOrder {
        customer,
        items: body.items.into_iter().map(Into::into).collect(),
        payment_method: body.payment_method,
    };

    let orders = state.orders.clone();
    let order = web::block(move || orders.create_order(input)).await??;

    Ok(HttpResponse::Created().json(OrderEnvelope {
        success: true,
        order,
    }))
}

/// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let orders = state.orders.clone();
    let order = web::block(move || orders.get_order(order_id)).await??;

    match order {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(AppError::NotFound),
    }
}

/// GET /api/orders
///
/// Returns a paginated list of orders, newest first.
#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let orders = state.orders.clone();
    let result = web::block(move || orders.list_orders(page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items,
        total: result.total,
        page,
        limit,
    }))
}

/// POST /api/orders/{id}/fulfill
#[utoipa::path(
    post,
    path = "/api/orders/{id}/fulfill",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order fulfilled", body = Order),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order is not paid", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn fulfill_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let orders = state.orders.clone();
    let order = web::block(move || orders.fulfill(order_id)).await??;

    Ok(HttpResponse::Ok().json(order))
}

/// POST /api/send-confirmation-email
#[utoipa::path(
    post,
    path = "/api/send-confirmation-email",
    request_body = ConfirmationEmailRequest,
    responses(
        (status = 200, description = "Confirmation sent", body = ConfirmationEmailResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn send_confirmation_email(
    state: web::Data<AppState>,
    body: web::Json<ConfirmationEmailRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let orders = state.orders.clone();
    web::block(move || orders.send_confirmation(body.order_id, &body.email)).await??;

    Ok(HttpResponse::Ok().json(ConfirmationEmailResponse {
        success: true,
        message: "Email sent".to_string(),
    }))
}
