use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::CartItem;
use super::payment::IntentHandle;
use super::pricing::validate_item;

/// A checkout attempt that has an order (and possibly an intent) but ended
/// without a definitive answer from the payment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PendingCheckout {
    pub order_id: Uuid,
    pub intent: Option<IntentHandle>,
}

/// Per-session cart. Persisted through a `CartStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub session_id: String,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub pending_checkout: Option<PendingCheckout>,
}

impl Cart {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            items: Vec::new(),
            pending_checkout: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Adds a line, merging it into an existing line for the same product.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), DomainError> {
        validate_item(&item)?;
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                DomainError::InvalidCart(format!("quantity overflow for '{}'", item.product_id))
            })?;
            existing.unit_price = item.unit_price;
            existing.name = item.name;
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i32) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::InvalidCart(format!(
                "quantity must not be negative, got {}",
                quantity
            )));
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(DomainError::NotFound)?;
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else {
            item.quantity = quantity;
        }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), DomainError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.pending_checkout = None;
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;

    fn item(id: &str, price: &str, quantity: i32) -> CartItem {
        CartItem {
            product_id: id.to_string(),
            name: format!("Model {}", id),
            unit_price: BigDecimal::from_str(price).expect("valid decimal"),
            quantity,
        }
    }

    #[test]
    fn add_merges_same_product() {
        let mut cart = Cart::new("s1");
        cart.add_item(item("A320", "25.99", 2)).unwrap();
        cart.add_item(item("A320", "25.99", 1)).unwrap();
        cart.add_item(item("B747", "40.00", 1)).unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn add_rejects_invalid_lines() {
        let mut cart = Cart::new("s1");
        assert!(cart.add_item(item("A320", "25.99", 0)).is_err());
        assert!(cart.add_item(item("A320", "-1", 1)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::new("s1");
        cart.add_item(item("A320", "25.99", 2)).unwrap();
        cart.update_quantity("A320", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn update_unknown_product_is_not_found() {
        let mut cart = Cart::new("s1");
        assert!(matches!(
            cart.update_quantity("nope", 2),
            Err(DomainError::NotFound)
        ));
        assert!(matches!(cart.remove_item("nope"), Err(DomainError::NotFound)));
    }

    #[test]
    fn clear_forgets_pending_checkout() {
        let mut cart = Cart::new("s1");
        cart.add_item(item("A320", "25.99", 1)).unwrap();
        cart.pending_checkout = Some(PendingCheckout {
            order_id: Uuid::new_v4(),
            intent: None,
        });
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.pending_checkout.is_none());
    }
}
