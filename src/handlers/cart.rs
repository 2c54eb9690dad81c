use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{CartItemRequest, ErrorResponse};
use crate::domain::cart::Cart;
use crate::domain::pricing::Totals;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub country: String,
}

/// GET /api/cart/{session}
#[utoipa::path(
    get,
    path = "/api/cart/{session}",
    params(("session" = String, Path, description = "Session id")),
    responses((status = 200, description = "Current cart (empty if unknown)", body = Cart)),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let carts = state.carts.clone();
    let cart = web::block(move || carts.get(&session)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

/// POST /api/cart/{session}/items
///
/// Adds a catalog product, merging quantities when it is already in the cart.
#[utoipa::path(
    post,
    path = "/api/cart/{session}/items",
    params(("session" = String, Path, description = "Session id")),
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = Cart),
        (status = 400, description = "Unknown product or invalid quantity", body = ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let item = body.into_inner();
    let carts = state.carts.clone();
    let cart =
        web::block(move || carts.add_item(&session, &item.product_id, item.quantity)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

/// PUT /api/cart/{session}/items/{product_id}
///
/// A quantity of zero removes the line.
#[utoipa::path(
    put,
    path = "/api/cart/{session}/items/{product_id}",
    params(
        ("session" = String, Path, description = "Session id"),
        ("product_id" = String, Path, description = "Product id"),
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = Cart),
        (status = 400, description = "Negative quantity", body = ErrorResponse),
        (status = 404, description = "Product not in cart", body = ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let (session, product_id) = path.into_inner();
    let quantity = body.quantity;
    let carts = state.carts.clone();
    let cart =
        web::block(move || carts.update_quantity(&session, &product_id, quantity)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

/// DELETE /api/cart/{session}/items/{product_id}
#[utoipa::path(
    delete,
    path = "/api/cart/{session}/items/{product_id}",
    params(
        ("session" = String, Path, description = "Session id"),
        ("product_id" = String, Path, description = "Product id"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = Cart),
        (status = 404, description = "Product not in cart", body = ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (session, product_id) = path.into_inner();
    let carts = state.carts.clone();
    let cart = web::block(move || carts.remove_item(&session, &product_id)).await??;
    Ok(HttpResponse::Ok().json(cart))
}

/// DELETE /api/cart/{session}
#[utoipa::path(
    delete,
    path = "/api/cart/{session}",
    params(("session" = String, Path, description = "Session id")),
    responses((status = 204, description = "Cart cleared")),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let carts = state.carts.clone();
    web::block(move || carts.clear(&session)).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/cart/{session}/quote?country=FR
#[utoipa::path(
    get,
    path = "/api/cart/{session}/quote",
    params(
        ("session" = String, Path, description = "Session id"),
        ("country" = String, Query, description = "Destination country (ISO alpha-2)"),
    ),
    responses(
        (status = 200, description = "Price breakdown", body = Totals),
        (status = 400, description = "Empty or invalid cart", body = ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn quote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<QuoteParams>,
) -> Result<HttpResponse, AppError> {
    let session = path.into_inner();
    let country = query.into_inner().country;
    let carts = state.carts.clone();
    let totals = web::block(move || carts.quote(&session, &country)).await??;
    Ok(HttpResponse::Ok().json(totals))
}
