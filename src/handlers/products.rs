use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{decimal, string_or_number, ErrorResponse};
use crate::application::catalog_service::NewProduct;
use crate::domain::product::{Product, ProductDetails};
use crate::errors::AppError;
use crate::AppState;

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    string_or_number(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub category: String,
    /// Decimal price, e.g. "25.99" or 25.99
    #[serde(deserialize_with = "decimal")]
    #[schema(value_type = String)]
    pub price: BigDecimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl From<ProductRequest> for ProductDetails {
    fn from(r: ProductRequest) -> Self {
        ProductDetails {
            name: r.name,
            category: r.category,
            price: r.price,
            description: r.description,
            icon: r.icon,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    /// Generated when omitted
    #[serde(default, alias = "id", deserialize_with = "optional_id")]
    #[schema(value_type = Option<String>)]
    pub product_id: Option<String>,
    #[serde(flatten)]
    pub product: ProductRequest,
}

/// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    responses((status = 200, description = "All catalog products", body = [Product])),
    tag = "products"
)]
pub async fn list_products(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let catalog = state.catalog.clone();
    let products = web::block(move || catalog.list()).await??;
    Ok(HttpResponse::Ok().json(products))
}

/// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let catalog = state.catalog.clone();
    match web::block(move || catalog.get(&product_id)).await?? {
        Some(product) => Ok(HttpResponse::Ok().json(product)),
        None => Err(AppError::NotFound),
    }
}

/// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid product", body = ErrorResponse),
        (status = 409, description = "Product id already taken", body = ErrorResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let input = NewProduct {
        product_id: body.product_id,
        details: body.product.into(),
    };
    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.create(input)).await??;
    Ok(HttpResponse::Created().json(product))
}

/// PUT /api/products/{id}
///
/// Replaces every editable field. Existing orders keep the price they were
/// placed at.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid product", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "products"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let details = body.into_inner().into();
    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.update(&product_id, details)).await??;
    Ok(HttpResponse::Ok().json(product))
}

/// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "products"
)]
pub async fn delete_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let catalog = state.catalog.clone();
    web::block(move || catalog.delete(&product_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
