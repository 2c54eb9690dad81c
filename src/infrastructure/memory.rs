//! Process-local stores, used when no `DATABASE_URL` is configured and by the
//! API tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, ListResult, Order, OrderDraft, OrderStatus, SalesRecord, StatusChange,
    StatusEvidence,
};
use crate::domain::ports::{CartStore, OrderRepository, ProductRepository};
use crate::domain::product::{default_catalog, Product};

use super::order_repo::now;
use super::outbox::{self, OutboxMessage};

fn poisoned<T>(_: PoisonError<T>) -> DomainError {
    DomainError::Internal("in-memory store lock poisoned".to_string())
}

/// Orders live behind their own mutex so that status changes on one order
/// are serialized without blocking readers of the others.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Arc<Mutex<Order>>>>,
    sales: Mutex<Vec<SalesRecord>>,
    outbox: Mutex<Vec<OutboxMessage>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written so far, oldest first.
    pub fn outbox(&self) -> Result<Vec<OutboxMessage>, DomainError> {
        Ok(self.outbox.lock().map_err(poisoned)?.clone())
    }

    fn entry(&self, id: Uuid) -> Result<Option<Arc<Mutex<Order>>>, DomainError> {
        Ok(self.orders.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn snapshot(&self) -> Result<Vec<Order>, DomainError> {
        let entries: Vec<Arc<Mutex<Order>>> =
            self.orders.read().map_err(poisoned)?.values().cloned().collect();
        entries
            .iter()
            .map(|e| e.lock().map(|o| o.clone()).map_err(poisoned))
            .collect()
    }

    fn publish(&self, message: OutboxMessage) -> Result<(), DomainError> {
        self.outbox.lock().map_err(poisoned)?.push(message);
        Ok(())
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        let order = Order::from_draft(draft, now());
        {
            let mut orders = self.orders.write().map_err(poisoned)?;
            if orders.contains_key(&order.order_id) {
                return Err(DomainError::DuplicateOrder(order.order_id));
            }
            orders.insert(order.order_id, Arc::new(Mutex::new(order.clone())));
        }
        self.publish(outbox::order_created(&order))?;
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        match self.entry(id)? {
            Some(entry) => Ok(Some(entry.lock().map_err(poisoned)?.clone())),
            None => Ok(None),
        }
    }

    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .find(|o| o.payment_intent_id.as_deref() == Some(intent_id)))
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut all = self.snapshot()?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = all.len() as i64;
        let Some(offset) = page_offset(page, limit) else {
            return Ok(ListResult {
                items: Vec::new(),
                total,
            });
        };
        let items = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit.max(0) as usize)
            .collect();
        Ok(ListResult { items, total })
    }

    fn attach_intent(&self, id: Uuid, intent_id: &str) -> Result<Order, DomainError> {
        let entry = self.entry(id)?.ok_or(DomainError::NotFound)?;
        let mut order = entry.lock().map_err(poisoned)?;
        if order.status == OrderStatus::Pending {
            order.payment_intent_id = Some(intent_id.to_string());
        }
        Ok(order.clone())
    }

    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        evidence: StatusEvidence,
    ) -> Result<StatusChange, DomainError> {
        let entry = self.entry(id)?.ok_or(DomainError::NotFound)?;
        let mut order = entry.lock().map_err(poisoned)?;

        let mut next = order.clone();
        if !next.transition(status, &evidence, now())? {
            return Ok(StatusChange::Unchanged(next));
        }

        // Still holding the order's lock: no other writer can observe `paid`
        // before its sales rows exist.
        if next.status == OrderStatus::Paid {
            self.sales
                .lock()
                .map_err(poisoned)?
                .extend(next.sales_records());
        }
        self.publish(outbox::status_changed(&next, &evidence))?;
        *order = next.clone();
        Ok(StatusChange::Applied(next))
    }

    fn sales(&self, date: Option<NaiveDate>) -> Result<Vec<SalesRecord>, DomainError> {
        let mut records: Vec<SalesRecord> = self
            .sales
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|s| date.map_or(true, |d| s.sale_date == d))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.paid_at
                .cmp(&a.paid_at)
                .then(a.order_id.cmp(&b.order_id))
                .then(a.line_position.cmp(&b.line_position))
                .then(a.unit_index.cmp(&b.unit_index))
        });
        Ok(records)
    }

    fn sales_for_order(&self, id: Uuid) -> Result<Vec<SalesRecord>, DomainError> {
        Ok(self
            .sales
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|s| s.order_id == id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<String, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for InMemoryCartStore {
    fn get(&self, session_id: &str) -> Result<Cart, DomainError> {
        Ok(self
            .carts
            .lock()
            .map_err(poisoned)?
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| Cart::new(session_id)))
    }

    fn set(&self, cart: &Cart) -> Result<(), DomainError> {
        self.carts
            .lock()
            .map_err(poisoned)?
            .insert(cart.session_id.clone(), cart.clone());
        Ok(())
    }

    fn clear(&self, session_id: &str) -> Result<(), DomainError> {
        self.carts.lock().map_err(poisoned)?.remove(session_id);
        Ok(())
    }
}

/// Products keyed by id, listed in id order.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(
                products
                    .into_iter()
                    .map(|p| (p.product_id.clone(), p))
                    .collect(),
            ),
        }
    }

    /// Seeded with the storefront's opening catalog.
    pub fn seeded() -> Self {
        Self::with_products(default_catalog(now()))
    }
}

impl ProductRepository for InMemoryProductRepository {
    fn list(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.products.read().map_err(poisoned)?.values().cloned().collect())
    }

    fn get(&self, product_id: &str) -> Result<Option<Product>, DomainError> {
        Ok(self.products.read().map_err(poisoned)?.get(product_id).cloned())
    }

    fn create(&self, product: &Product) -> Result<Product, DomainError> {
        let mut products = self.products.write().map_err(poisoned)?;
        if products.contains_key(&product.product_id) {
            return Err(DomainError::DuplicateProduct(product.product_id.clone()));
        }
        products.insert(product.product_id.clone(), product.clone());
        Ok(product.clone())
    }

    fn update(&self, product: &Product) -> Result<Product, DomainError> {
        let mut products = self.products.write().map_err(poisoned)?;
        let slot = products
            .get_mut(&product.product_id)
            .ok_or(DomainError::NotFound)?;
        *slot = product.clone();
        Ok(product.clone())
    }

    fn delete(&self, product_id: &str) -> Result<(), DomainError> {
        self.products
            .write()
            .map_err(poisoned)?
            .remove(product_id)
            .map(|_| ())
            .ok_or(DomainError::NotFound)
    }
}
