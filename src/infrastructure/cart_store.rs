use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::db::DbPool;
use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartStore;
use crate::schema::carts;

use super::models::CartRow;
use super::order_repo::now;

/// Carts are stored whole as JSONB, keyed by session id.
pub struct DieselCartStore {
    pool: DbPool,
}

impl DieselCartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartStore for DieselCartStore {
    fn get(&self, session_id: &str) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<CartRow> = carts::table
            .find(session_id)
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?;

        match row {
            Some(row) => serde_json::from_value(row.contents)
                .map_err(|e| DomainError::Internal(format!("corrupt cart '{}': {}", session_id, e))),
            None => Ok(Cart::new(session_id)),
        }
    }

    fn set(&self, cart: &Cart) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let row = CartRow {
            session_id: cart.session_id.clone(),
            contents: serde_json::to_value(cart).map_err(|e| DomainError::Internal(e.to_string()))?,
            updated_at: now(),
        };
        diesel::insert_into(carts::table)
            .values(&row)
            .on_conflict(carts::session_id)
            .do_update()
            .set((
                carts::contents.eq(excluded(carts::contents)),
                carts::updated_at.eq(excluded(carts::updated_at)),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn clear(&self, session_id: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(carts::table.find(session_id)).execute(&mut conn)?;
        Ok(())
    }
}
