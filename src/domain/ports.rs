use chrono::NaiveDate;
use uuid::Uuid;

use super::cart::Cart;
use super::errors::DomainError;
use super::order::{ListResult, Order, OrderDraft, OrderStatus, SalesRecord, StatusChange, StatusEvidence};
use super::product::Product;

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, draft: OrderDraft) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn attach_intent(&self, id: Uuid, intent_id: &str) -> Result<Order, DomainError>;
    /// Moves an order through its state machine. All writers of a given
    /// order are serialized here; sales rows are written in the same critical
    /// section as the `pending -> paid` transition.
    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        evidence: StatusEvidence,
    ) -> Result<StatusChange, DomainError>;
    fn sales(&self, date: Option<NaiveDate>) -> Result<Vec<SalesRecord>, DomainError>;
    fn sales_for_order(&self, id: Uuid) -> Result<Vec<SalesRecord>, DomainError>;
}

/// Product catalog persistence.
pub trait ProductRepository: Send + Sync + 'static {
    fn list(&self) -> Result<Vec<Product>, DomainError>;
    fn get(&self, product_id: &str) -> Result<Option<Product>, DomainError>;
    /// Fails with `DuplicateProduct` when the id is taken.
    fn create(&self, product: &Product) -> Result<Product, DomainError>;
    fn update(&self, product: &Product) -> Result<Product, DomainError>;
    fn delete(&self, product_id: &str) -> Result<(), DomainError>;
}

/// Per-session cart persistence.
pub trait CartStore: Send + Sync + 'static {
    /// Returns an empty cart for unknown sessions.
    fn get(&self, session_id: &str) -> Result<Cart, DomainError>;
    fn set(&self, cart: &Cart) -> Result<(), DomainError>;
    fn clear(&self, session_id: &str) -> Result<(), DomainError>;
}

pub trait Notifier: Send + Sync + 'static {
    fn order_confirmed(&self, order: &Order, email: &str) -> Result<(), DomainError>;
}
