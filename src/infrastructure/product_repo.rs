use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::Product;
use crate::schema::products;

use super::models::ProductRow;

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductRepository for DieselProductRepository {
    fn list(&self) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<ProductRow> = products::table
            .order(products::id.asc())
            .select(ProductRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn get(&self, product_id: &str) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<ProductRow> = products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Product::from))
    }

    fn create(&self, product: &Product) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row: ProductRow = diesel::insert_into(products::table)
            .values(&ProductRow::from(product))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    DomainError::DuplicateProduct(product.product_id.clone())
                }
                other => other.into(),
            })?;

        Ok(row.into())
    }

    fn update(&self, product: &Product) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<ProductRow> = diesel::update(products::table.find(&product.product_id))
            .set(&ProductRow::from(product))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        row.map(Product::from).ok_or(DomainError::NotFound)
    }

    fn delete(&self, product_id: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(products::table.find(product_id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}
