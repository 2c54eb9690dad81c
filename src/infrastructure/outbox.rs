use serde_json::{json, Value};

use crate::domain::order::{Order, OrderStatus, StatusEvidence};

/// Debezium's EventRouter SMT derives the Kafka topic from `aggregate_type`.
pub const AGGREGATE_TYPE: &str = "Order";

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub aggregate_id: String,
    pub event_type: &'static str,
    pub payload: Value,
}

fn line_payloads(order: &Order) -> Vec<Value> {
    order
        .items
        .iter()
        .map(|l| {
            json!({
                "product_id": l.product_id,
                "name": l.name,
                "quantity": l.quantity,
                "unit_price": l.unit_price.to_string()
            })
        })
        .collect()
}

pub fn order_created(order: &Order) -> OutboxMessage {
    OutboxMessage {
        aggregate_id: order.order_id.to_string(),
        event_type: "OrderCreated",
        payload: json!({
            "order_id": order.order_id,
            "customer_email": order.customer.email,
            "status": order.status,
            "total": order.total.to_string(),
            "currency": order.currency,
            "lines": line_payloads(order)
        }),
    }
}

pub fn status_changed(order: &Order, evidence: &StatusEvidence) -> OutboxMessage {
    let event_type = match order.status {
        OrderStatus::Pending => "OrderPending",
        OrderStatus::Paid => "OrderPaid",
        OrderStatus::Failed => "OrderFailed",
        OrderStatus::Fulfilled => "OrderFulfilled",
    };
    OutboxMessage {
        aggregate_id: order.order_id.to_string(),
        event_type,
        payload: json!({
            "order_id": order.order_id,
            "status": order.status,
            "total": order.total.to_string(),
            "currency": order.currency,
            "payment_intent_id": order.payment_intent_id,
            "paid_at": order.paid_at,
            "evidence": evidence
        }),
    }
}
