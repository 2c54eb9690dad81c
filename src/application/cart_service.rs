use std::sync::Arc;

use super::catalog_service::{catalog_line, reprice};
use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartStore, ProductRepository};
use crate::domain::pricing::{compute_totals, PricingConfig, Totals};

/// Session cart operations. Each call is a read-modify-write against the
/// injected store. Names and prices come from the catalog.
pub struct CartService {
    store: Arc<dyn CartStore>,
    products: Arc<dyn ProductRepository>,
    pricing: Arc<PricingConfig>,
}

impl CartService {
    pub fn new(
        store: Arc<dyn CartStore>,
        products: Arc<dyn ProductRepository>,
        pricing: Arc<PricingConfig>,
    ) -> Self {
        Self {
            store,
            products,
            pricing,
        }
    }

    pub fn get(&self, session_id: &str) -> Result<Cart, DomainError> {
        self.store.get(session_id)
    }

    pub fn add_item(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        let item = catalog_line(self.products.as_ref(), product_id, quantity)?;
        self.modify(session_id, |cart| cart.add_item(item))
    }

    pub fn update_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        self.modify(session_id, |cart| cart.update_quantity(product_id, quantity))
    }

    pub fn remove_item(&self, session_id: &str, product_id: &str) -> Result<Cart, DomainError> {
        self.modify(session_id, |cart| cart.remove_item(product_id))
    }

    pub fn clear(&self, session_id: &str) -> Result<(), DomainError> {
        self.store.clear(session_id)
    }

    /// Price preview for the current cart contents at today's catalog prices.
    pub fn quote(&self, session_id: &str, country: &str) -> Result<Totals, DomainError> {
        let cart = self.store.get(session_id)?;
        let items = reprice(self.products.as_ref(), &cart.items)?;
        compute_totals(&items, country, &self.pricing)
    }

    fn modify<F>(&self, session_id: &str, f: F) -> Result<Cart, DomainError>
    where
        F: FnOnce(&mut Cart) -> Result<(), DomainError>,
    {
        let mut cart = self.store.get(session_id)?;
        f(&mut cart)?;
        self.store.set(&cart)?;
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::infrastructure::memory::{InMemoryCartStore, InMemoryProductRepository};

    fn service() -> (CartService, Arc<InMemoryProductRepository>) {
        let products = Arc::new(InMemoryProductRepository::seeded());
        let service = CartService::new(
            Arc::new(InMemoryCartStore::new()),
            products.clone(),
            Arc::new(PricingConfig::default()),
        );
        (service, products)
    }

    #[test]
    fn quantity_change_moves_order_over_free_shipping() {
        let (carts, _) = service();
        carts.add_item("s", "7", 1).unwrap();
        let before = carts.quote("s", "FR").unwrap();
        assert_eq!(before.shipping, BigDecimal::from_str("5.99").unwrap());

        carts.update_quantity("s", "7", 2).unwrap();
        let after = carts.quote("s", "FR").unwrap();
        assert_eq!(after.shipping, BigDecimal::from_str("0.00").unwrap());
        assert_eq!(after.total, BigDecimal::from_str("67.18").unwrap());
    }

    #[test]
    fn add_item_takes_name_and_price_from_the_catalog() {
        let (carts, _) = service();
        let cart = carts.add_item("s", "5", 2).unwrap();
        assert_eq!(cart.items[0].name, "Boussole Aviation");
        assert_eq!(cart.items[0].unit_price, BigDecimal::from_str("35.99").unwrap());
        assert_eq!(cart.items[0].quantity, 2);
    }

    #[test]
    fn unknown_product_or_bad_quantity_leaves_cart_untouched() {
        let (carts, _) = service();
        carts.add_item("s", "1", 1).unwrap();
        assert!(matches!(
            carts.add_item("s", "99", 1),
            Err(DomainError::InvalidCart(_))
        ));
        assert!(carts.add_item("s", "2", 0).is_err());
        assert_eq!(carts.get("s").unwrap().items.len(), 1);
    }

    #[test]
    fn quote_follows_catalog_price_changes() {
        let (carts, products) = service();
        carts.add_item("s", "6", 1).unwrap();

        let mut keyring = products.get("6").unwrap().unwrap();
        keyring.price = BigDecimal::from_str("10.00").unwrap();
        products.update(&keyring).unwrap();
        let quote = carts.quote("s", "FR").unwrap();
        assert_eq!(quote.subtotal, BigDecimal::from_str("10.00").unwrap());

        products.delete("6").unwrap();
        assert!(matches!(
            carts.quote("s", "FR"),
            Err(DomainError::InvalidCart(_))
        ));
    }

    #[test]
    fn quote_of_empty_cart_is_invalid() {
        let (carts, _) = service();
        assert!(matches!(
            carts.quote("nobody", "FR"),
            Err(DomainError::InvalidCart(_))
        ));
    }

    #[test]
    fn remove_and_clear() {
        let (carts, _) = service();
        carts.add_item("s", "1", 1).unwrap();
        carts.add_item("s", "2", 1).unwrap();

        let cart = carts.remove_item("s", "1").unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, "2");

        carts.clear("s").unwrap();
        assert!(carts.get("s").unwrap().is_empty());
    }
}
