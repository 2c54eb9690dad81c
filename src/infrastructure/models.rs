use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CartItem, Customer, Order, SalesRecord};
use crate::domain::product::Product;
use crate::schema::{carts, commerce_order_outbox, order_lines, orders, products, sales_records};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_address: String,
    pub customer_country: String,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_order(self, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
        let mut lines = lines;
        lines.sort_by_key(|l| l.position);
        Ok(Order {
            order_id: self.id,
            created_at: self.created_at,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                address: self.customer_address,
                country: self.customer_country,
            },
            items: lines
                .into_iter()
                .map(|l| CartItem {
                    product_id: l.product_id,
                    name: l.name,
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect(),
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total: self.total,
            currency: self.currency,
            payment_method: self.payment_method,
            status: self.status.parse()?,
            payment_intent_id: self.payment_intent_id,
            paid_at: self.paid_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_address: String,
    pub customer_country: String,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for NewOrderRow {
    fn from(o: &Order) -> Self {
        Self {
            id: o.order_id,
            customer_name: o.customer.name.clone(),
            customer_email: o.customer.email.clone(),
            customer_address: o.customer.address.clone(),
            customer_country: o.customer.country.clone(),
            subtotal: o.subtotal.clone(),
            shipping_cost: o.shipping_cost.clone(),
            tax: o.tax.clone(),
            total: o.total.clone(),
            currency: o.currency.clone(),
            payment_method: o.payment_method.clone(),
            status: o.status.as_str().to_string(),
            created_at: o.created_at,
            updated_at: o.created_at,
        }
    }
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: String,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: String,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = sales_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SalesRecordRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub product_name: String,
    pub price: BigDecimal,
    pub sale_date: NaiveDate,
    pub paid_at: DateTime<Utc>,
    pub customer_email: String,
    pub payment_method: String,
    pub line_position: i32,
    pub unit_index: i32,
}

impl From<SalesRecord> for SalesRecordRow {
    fn from(s: SalesRecord) -> Self {
        Self {
            id: s.id,
            order_id: s.order_id,
            product_id: s.product_id,
            product_name: s.product_name,
            price: s.price,
            sale_date: s.sale_date,
            paid_at: s.paid_at,
            customer_email: s.customer_email,
            payment_method: s.payment_method,
            line_position: s.line_position,
            unit_index: s.unit_index,
        }
    }
}

impl From<SalesRecordRow> for SalesRecord {
    fn from(r: SalesRecordRow) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            product_name: r.product_name,
            price: r.price,
            sale_date: r.sale_date,
            paid_at: r.paid_at,
            customer_email: r.customer_email,
            payment_method: r.payment_method,
            line_position: r.line_position,
            unit_index: r.unit_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = commerce_order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = commerce_order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub session_id: String,
    pub contents: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = products)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductRow {
    fn from(p: &Product) -> Self {
        Self {
            id: p.product_id.clone(),
            name: p.name.clone(),
            category: p.category.clone(),
            price: p.price.clone(),
            description: p.description.clone(),
            icon: p.icon.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            product_id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            description: row.description,
            icon: row.icon,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
