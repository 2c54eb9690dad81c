use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::CartItem;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{Product, ProductDetails};

const MAX_PRODUCT_ID_LEN: usize = 64;

/// A requested line before catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuantity {
    pub product_id: String,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Generated when absent.
    pub product_id: Option<String>,
    pub details: ProductDetails,
}

/// Product catalog administration.
pub struct CatalogService {
    repo: Arc<dyn ProductRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<Product>, DomainError> {
        self.repo.list()
    }

    pub fn get(&self, product_id: &str) -> Result<Option<Product>, DomainError> {
        self.repo.get(product_id)
    }

    pub fn create(&self, input: NewProduct) -> Result<Product, DomainError> {
        let product_id = match input.product_id {
            Some(id) => checked_id(&id)?,
            None => Uuid::new_v4().simple().to_string(),
        };
        let product = Product::new(product_id, input.details.validated()?, Utc::now());
        let product = self.repo.create(&product)?;
        log::info!("Product {} created at {}", product.product_id, product.price);
        Ok(product)
    }

    pub fn update(&self, product_id: &str, details: ProductDetails) -> Result<Product, DomainError> {
        let details = details.validated()?;
        let mut product = self.repo.get(product_id)?.ok_or(DomainError::NotFound)?;
        product.apply(details, Utc::now());
        let product = self.repo.update(&product)?;
        log::info!("Product {} updated", product.product_id);
        Ok(product)
    }

    /// Past orders and sales keep their own copy of name and price.
    pub fn delete(&self, product_id: &str) -> Result<(), DomainError> {
        self.repo.delete(product_id)?;
        log::info!("Product {} deleted", product_id);
        Ok(())
    }
}

fn checked_id(id: &str) -> Result<String, DomainError> {
    let id = id.trim();
    if id.is_empty() || id.len() > MAX_PRODUCT_ID_LEN {
        return Err(DomainError::InvalidInput(format!(
            "product id must be 1 to {} characters",
            MAX_PRODUCT_ID_LEN
        )));
    }
    Ok(id.to_string())
}

/// A cart line for `quantity` units of a catalog product.
pub fn catalog_line(
    products: &dyn ProductRepository,
    product_id: &str,
    quantity: i32,
) -> Result<CartItem, DomainError> {
    products
        .get(product_id)?
        .map(|p| p.line(quantity))
        .ok_or_else(|| DomainError::InvalidCart(format!("unknown product '{}'", product_id)))
}

/// Replaces each line's name and unit price with the current catalog entry.
pub fn reprice(
    products: &dyn ProductRepository,
    items: &[CartItem],
) -> Result<Vec<CartItem>, DomainError> {
    items
        .iter()
        .map(|i| catalog_line(products, &i.product_id, i.quantity))
        .collect()
}
