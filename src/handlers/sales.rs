use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::application::sales_service::SalesSummary;
use crate::domain::order::SalesRecord;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SalesParams {
    /// YYYY-MM-DD
    pub date: Option<NaiveDate>,
}

/// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    params(("date" = Option<String>, Query, description = "Only sales of this day (YYYY-MM-DD)")),
    responses((status = 200, description = "Sales, newest first", body = [SalesRecord])),
    tag = "sales"
)]
pub async fn list_sales(
    state: web::Data<AppState>,
    query: web::Query<SalesParams>,
) -> Result<HttpResponse, AppError> {
    let date = query.into_inner().date;
    let sales = state.sales.clone();
    let records = web::block(move || sales.list_sales(date)).await??;
    Ok(HttpResponse::Ok().json(records))
}

/// GET /api/sales/summary
#[utoipa::path(
    get,
    path = "/api/sales/summary",
    responses((status = 200, description = "Dashboard figures", body = SalesSummary)),
    tag = "sales"
)]
pub async fn sales_summary(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let today = Utc::now().date_naive();
    let sales = state.sales.clone();
    let summary = web::block(move || sales.summary(today)).await??;
    Ok(HttpResponse::Ok().json(summary))
}
