use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::pricing::Totals;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A product line as it sits in a cart, and as it is snapshotted into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    /// Decimal price as a string, e.g. "25.99"
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub address: String,
    /// ISO-3166 alpha-2 country code
    pub country: String,
}

impl Customer {
    /// Checks required fields and the email format, and normalises the
    /// country code to upper case.
    pub fn validated(self) -> Result<Self, DomainError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.country.trim().is_empty() {
            missing.push("country");
        }
        if !missing.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let email = self.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(DomainError::InvalidInput(format!(
                "invalid email address '{}'",
                email
            )));
        }

        let country = self.country.trim().to_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::InvalidInput(format!(
                "country must be a two-letter code, got '{}'",
                country
            )));
        }

        Ok(Self {
            name: self.name.trim().to_string(),
            email,
            address: self.address.trim().to_string(),
            country,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Fulfilled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Fulfilled => "fulfilled",
        }
    }

    /// Whether `next` is already behind this status: the same status, or
    /// `paid` for an order that has since been fulfilled.
    pub fn has_reached(&self, next: OrderStatus) -> bool {
        *self == next || (*self == OrderStatus::Fulfilled && next == OrderStatus::Paid)
    }

    /// Whether `self -> next` is an edge of the order state machine.
    /// Staying in the same status is handled separately as a no-op.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Paid, OrderStatus::Fulfilled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            other => Err(DomainError::Internal(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

/// Everything needed to persist a new order. The store assigns `order_id`
/// when it is absent.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_id: Option<Uuid>,
    pub customer: Customer,
    pub items: Vec<CartItem>,
    pub totals: Totals,
    pub currency: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub customer: Customer,
    pub items: Vec<CartItem>,
    #[schema(value_type = String)]
    pub subtotal: BigDecimal,
    #[schema(value_type = String)]
    pub shipping_cost: BigDecimal,
    #[schema(value_type = String)]
    pub tax: BigDecimal,
    #[schema(value_type = String)]
    pub total: BigDecimal,
    pub currency: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn from_draft(draft: OrderDraft, now: DateTime<Utc>) -> Self {
        Self {
            order_id: draft.order_id.unwrap_or_else(Uuid::new_v4),
            created_at: now,
            customer: draft.customer,
            items: draft.items,
            subtotal: draft.totals.subtotal,
            shipping_cost: draft.totals.shipping,
            tax: draft.totals.tax,
            total: draft.totals.total,
            currency: draft.currency,
            payment_method: draft.payment_method,
            status: OrderStatus::Pending,
            payment_intent_id: None,
            paid_at: None,
        }
    }

    /// Applies `next` to the order in place.
    ///
    /// Returns `Ok(false)` when the order has already reached `next`
    /// (idempotent re-delivery) and `Ok(true)` when the status actually changed.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        evidence: &StatusEvidence,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        if self.status.has_reached(next) {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                order_id: self.order_id,
                from: self.status,
                to: next,
            });
        }

        if next == OrderStatus::Paid {
            self.paid_at = Some(now);
        }
        if let Some(intent_id) = &evidence.payment_intent_id {
            self.payment_intent_id = Some(intent_id.clone());
        }
        self.status = next;
        Ok(true)
    }

    /// Expands a paid order into one sales row per unit sold.
    pub fn sales_records(&self) -> Vec<SalesRecord> {
        let paid_at = self.paid_at.unwrap_or(self.created_at);
        self.items
            .iter()
            .enumerate()
            .flat_map(|(position, item)| {
                (0..item.quantity).map(move |unit| SalesRecord {
                    id: Uuid::new_v4(),
                    order_id: self.order_id,
                    product_id: item.product_id.clone(),
                    product_name: item.name.clone(),
                    price: item.unit_price.clone(),
                    sale_date: paid_at.date_naive(),
                    paid_at,
                    customer_email: self.customer.email.clone(),
                    payment_method: self.payment_method.clone(),
                    line_position: position as i32,
                    unit_index: unit,
                })
            })
            .collect()
    }
}

/// Who asked for a status change, and what proof they brought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionSource {
    Checkout,
    Webhook,
    Admin,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEvidence {
    pub source: TransitionSource,
    pub payment_intent_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl StatusEvidence {
    pub fn new(source: TransitionSource) -> Self {
        Self {
            source,
            payment_intent_id: None,
            provider_payment_id: None,
            failure_reason: None,
        }
    }

    pub fn with_intent(mut self, intent_id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(intent_id.into());
        self
    }

    pub fn with_provider_payment(mut self, payment_id: impl Into<String>) -> Self {
        self.provider_payment_id = Some(payment_id.into());
        self
    }

    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

/// Result of `update_status`: whether this call moved the order.
#[derive(Debug, Clone)]
pub enum StatusChange {
    Applied(Order),
    Unchanged(Order),
}

impl StatusChange {
    pub fn order(&self) -> &Order {
        match self {
            StatusChange::Applied(o) | StatusChange::Unchanged(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            StatusChange::Applied(o) | StatusChange::Unchanged(o) => o,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, StatusChange::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub product_name: String,
    #[schema(value_type = String)]
    pub price: BigDecimal,
    pub sale_date: NaiveDate,
    pub paid_at: DateTime<Utc>,
    pub customer_email: String,
    pub payment_method: String,
    pub line_position: i32,
    pub unit_index: i32,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Row offset of a 1-based page, or `None` when it does not fit in an `i64`
/// (such a page is necessarily past the end).
pub fn page_offset(page: i64, limit: i64) -> Option<i64> {
    page.max(1).checked_sub(1)?.checked_mul(limit.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            address: "12 rue de la Paix, Paris".to_string(),
            country: "fr".to_string(),
        }
    }

    fn item(id: &str, price: &str, quantity: i32) -> CartItem {
        CartItem {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            unit_price: BigDecimal::from_str(price).expect("valid decimal"),
            quantity,
        }
    }

    fn pending_order(items: Vec<CartItem>) -> Order {
        let totals = Totals {
            subtotal: BigDecimal::from(0),
            shipping: BigDecimal::from(0),
            tax: BigDecimal::from(0),
            total: BigDecimal::from(0),
        };
        Order::from_draft(
            OrderDraft {
                order_id: None,
                customer: customer(),
                items,
                totals,
                currency: "eur".to_string(),
                payment_method: "card".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn customer_validation_normalises_country() {
        let c = customer().validated().expect("valid customer");
        assert_eq!(c.country, "FR");
    }

    #[test]
    fn customer_validation_lists_missing_fields() {
        let c = Customer {
            name: " ".to_string(),
            address: String::new(),
            ..customer()
        };
        let err = c.validated().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(ref m) if m.contains("name") && m.contains("address")));
    }

    #[test]
    fn customer_validation_rejects_bad_email() {
        for email in ["ada", "ada@example", "ada @example.com", "@example.com"] {
            let c = Customer {
                email: email.to_string(),
                ..customer()
            };
            assert!(c.validated().is_err(), "{} should be rejected", email);
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Failed,
            OrderStatus::Fulfilled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn pending_to_paid_sets_paid_at_and_intent() {
        let mut order = pending_order(vec![item("1", "10.00", 1)]);
        let evidence = StatusEvidence::new(TransitionSource::Webhook).with_intent("pi_123");
        let changed = order
            .transition(OrderStatus::Paid, &evidence, Utc::now())
            .expect("pending -> paid is allowed");
        assert!(changed);
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.paid_at.is_some());
        assert_eq!(order.payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn same_terminal_status_is_a_no_op() {
        let mut order = pending_order(vec![item("1", "10.00", 1)]);
        let evidence = StatusEvidence::new(TransitionSource::Checkout);
        order.transition(OrderStatus::Failed, &evidence, Utc::now()).unwrap();
        let changed = order
            .transition(OrderStatus::Failed, &evidence, Utc::now())
            .expect("re-delivery is not an error");
        assert!(!changed);
    }

    #[test]
    fn terminal_to_other_terminal_is_rejected() {
        let mut order = pending_order(vec![item("1", "10.00", 1)]);
        let evidence = StatusEvidence::new(TransitionSource::Checkout);
        order.transition(OrderStatus::Paid, &evidence, Utc::now()).unwrap();

        let err = order
            .transition(OrderStatus::Failed, &evidence, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Failed,
                ..
            }
        ));
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[test]
    fn fulfilled_only_from_paid() {
        let mut order = pending_order(vec![item("1", "10.00", 1)]);
        let evidence = StatusEvidence::new(TransitionSource::Admin);
        assert!(order
            .transition(OrderStatus::Fulfilled, &evidence, Utc::now())
            .is_err());
        order.transition(OrderStatus::Paid, &evidence, Utc::now()).unwrap();
        assert!(order
            .transition(OrderStatus::Fulfilled, &evidence, Utc::now())
            .unwrap());
    }

    #[test]
    fn page_offset_saturates_to_none() {
        assert_eq!(page_offset(1, 20), Some(0));
        assert_eq!(page_offset(3, 20), Some(40));
        assert_eq!(page_offset(0, 20), Some(0));
        assert_eq!(page_offset(i64::MAX, 100), None);
    }

    #[test]
    fn paid_after_fulfilment_is_a_no_op() {
        let mut order = pending_order(vec![item("1", "10.00", 1)]);
        let evidence = StatusEvidence::new(TransitionSource::Webhook).with_intent("pi_1");
        order.transition(OrderStatus::Paid, &evidence, Utc::now()).unwrap();
        let paid_at = order.paid_at;
        order
            .transition(OrderStatus::Fulfilled, &StatusEvidence::new(TransitionSource::Admin), Utc::now())
            .unwrap();

        let changed = order
            .transition(OrderStatus::Paid, &evidence, Utc::now())
            .expect("late paid event is not an error");
        assert!(!changed);
        assert_eq!(order.status, OrderStatus::Fulfilled);
        assert_eq!(order.paid_at, paid_at);

        assert!(order
            .transition(OrderStatus::Failed, &evidence, Utc::now())
            .is_err());
    }

    #[test]
    fn sales_records_expand_quantities() {
        let mut order = pending_order(vec![item("1", "25.99", 2), item("2", "4.50", 1)]);
        order
            .transition(
                OrderStatus::Paid,
                &StatusEvidence::new(TransitionSource::Checkout),
                Utc::now(),
            )
            .unwrap();

        let sales = order.sales_records();
        assert_eq!(sales.len(), 3);
        assert_eq!(sales[0].product_id, "1");
        assert_eq!((sales[0].line_position, sales[0].unit_index), (0, 0));
        assert_eq!((sales[1].line_position, sales[1].unit_index), (0, 1));
        assert_eq!((sales[2].line_position, sales[2].unit_index), (1, 0));
        assert!(sales.iter().all(|s| s.order_id == order.order_id));
        assert!(sales.iter().all(|s| s.customer_email == "ada@example.com"));
    }
}
