use thiserror::Error;
use uuid::Uuid;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid cart: {0}")]
    InvalidCart(String),
    #[error("Order {0} already exists")]
    DuplicateOrder(Uuid),
    #[error("Product {0} already exists")]
    DuplicateProduct(String),
    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}
