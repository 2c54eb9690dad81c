use std::sync::Arc;

use uuid::Uuid;

use super::catalog_service::{catalog_line, ProductQuantity};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    is_valid_email, Customer, ListResult, Order, OrderDraft, OrderStatus,
    StatusEvidence, TransitionSource,
};
use crate::domain::ports::{Notifier, OrderRepository, ProductRepository};
use crate::domain::pricing::{compute_totals, PricingConfig};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: Customer,
    /// Names and prices come from the catalog.
    pub items: Vec<ProductQuantity>,
    pub payment_method: String,
}

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    notifier: Arc<dyn Notifier>,
    pricing: Arc<PricingConfig>,
    currency: String,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        notifier: Arc<dyn Notifier>,
        pricing: Arc<PricingConfig>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            products,
            notifier,
            pricing,
            currency: currency.into(),
        }
    }

    /// Prices and stores a pending order without taking payment.
    pub fn create_order(&self, input: NewOrder) -> Result<Order, DomainError> {
        if input.items.is_empty() {
            return Err(DomainError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }
        if input.payment_method.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "missing required fields: payment_method".to_string(),
            ));
        }
        let customer = input.customer.validated()?;
        let items = input
            .items
            .iter()
            .map(|i| catalog_line(self.products.as_ref(), &i.product_id, i.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        let totals = compute_totals(&items, &customer.country, &self.pricing)?;

        let order = self.repo.create(OrderDraft {
            order_id: None,
            customer,
            items,
            totals,
            currency: self.currency.clone(),
            payment_method: input.payment_method.trim().to_string(),
        })?;
        log::info!("Order {} created ({} {})", order.order_id, order.total, order.currency);
        Ok(order)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.repo.list(page, limit)
    }

    pub fn fulfill(&self, id: Uuid) -> Result<Order, DomainError> {
        let change = self.repo.update_status(
            id,
            OrderStatus::Fulfilled,
            StatusEvidence::new(TransitionSource::Admin),
        )?;
        if change.was_applied() {
            log::info!("Order {} fulfilled", id);
        }
        Ok(change.into_order())
    }

    pub fn send_confirmation(&self, id: Uuid, email: &str) -> Result<Order, DomainError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(DomainError::InvalidInput(format!(
                "invalid email address '{}'",
                email
            )));
        }
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        self.notifier.order_confirmed(&order, email)?;
        Ok(order)
    }
}
