use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::errors::DomainError;
use crate::domain::order::SalesRecord;
use crate::domain::ports::{OrderRepository, ProductRepository};
use crate::domain::pricing::MONEY_SCALE;
use crate::domain::product::Product;

const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProductSales {
    pub product_name: String,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategorySales {
    pub category: String,
    pub units: i64,
}

/// Dashboard figures over the whole sales ledger.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalesSummary {
    /// Units sold
    pub total_sales: i64,
    #[schema(value_type = String)]
    pub total_revenue: BigDecimal,
    pub today_sales: i64,
    pub best_product: Option<String>,
    pub top_products: Vec<ProductSales>,
    /// Units per catalog category. Sales of products no longer in the
    /// catalog are not counted here.
    pub category_sales: Vec<CategorySales>,
}

pub struct SalesService {
    repo: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
}

impl SalesService {
    pub fn new(repo: Arc<dyn OrderRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { repo, products }
    }

    pub fn list_sales(&self, date: Option<NaiveDate>) -> Result<Vec<SalesRecord>, DomainError> {
        self.repo.sales(date)
    }

    pub fn summary(&self, today: NaiveDate) -> Result<SalesSummary, DomainError> {
        Ok(summarize(&self.repo.sales(None)?, &self.products.list()?, today))
    }
}

pub fn summarize(sales: &[SalesRecord], catalog: &[Product], today: NaiveDate) -> SalesSummary {
    let total_revenue = sales
        .iter()
        .fold(BigDecimal::zero(), |acc, s| acc + &s.price)
        .with_scale(MONEY_SCALE);
    let today_sales = sales.iter().filter(|s| s.sale_date == today).count() as i64;

    let mut counts: HashMap<&str, i64> = HashMap::new();
    for sale in sales {
        *counts.entry(sale.product_name.as_str()).or_default() += 1;
    }
    let mut top_products: Vec<ProductSales> = counts
        .into_iter()
        .map(|(name, units)| ProductSales {
            product_name: name.to_string(),
            units,
        })
        .collect();
    // Ties break alphabetically so the ranking is stable.
    top_products.sort_by(|a, b| {
        b.units
            .cmp(&a.units)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    top_products.truncate(TOP_PRODUCTS);

    let category_of: HashMap<&str, &str> = catalog
        .iter()
        .map(|p| (p.product_id.as_str(), p.category.as_str()))
        .collect();
    let mut by_category: HashMap<&str, i64> =
        category_of.values().map(|c| (*c, 0)).collect();
    for sale in sales {
        if let Some(category) = category_of.get(sale.product_id.as_str()) {
            *by_category.entry(*category).or_default() += 1;
        }
    }
    let mut category_sales: Vec<CategorySales> = by_category
        .into_iter()
        .map(|(category, units)| CategorySales {
            category: category.to_string(),
            units,
        })
        .collect();
    category_sales.sort_by(|a, b| {
        b.units
            .cmp(&a.units)
            .then_with(|| a.category.cmp(&b.category))
    });

    SalesSummary {
        total_sales: sales.len() as i64,
        total_revenue,
        today_sales,
        best_product: top_products.first().map(|p| p.product_name.clone()),
        top_products,
        category_sales,
    }
}
