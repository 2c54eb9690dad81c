use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, ListResult, Order, OrderDraft, OrderStatus, SalesRecord, StatusChange,
    StatusEvidence,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{commerce_order_outbox, order_lines, orders, sales_records};

use super::models::{
    NewOrderLineRow, NewOrderRow, NewOutboxEventRow, OrderLineRow, OrderRow, SalesRecordRow,
};
use super::outbox::{self, OutboxMessage, AGGREGATE_TYPE};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// PostgreSQL keeps microseconds; truncating up front keeps returned orders
/// identical to what a later read yields.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn insert_outbox(conn: &mut PgConnection, message: OutboxMessage) -> Result<(), DomainError> {
    diesel::insert_into(commerce_order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: AGGREGATE_TYPE.to_string(),
            aggregate_id: message.aggregate_id,
            event_type: message.event_type.to_string(),
            payload: message.payload,
        })
        .execute(conn)?;
    Ok(())
}

fn load_order(
    conn: &mut PgConnection,
    id: Uuid,
    lock: bool,
) -> Result<Option<Order>, DomainError> {
    let query = orders::table
        .filter(orders::id.eq(id))
        .select(OrderRow::as_select());
    let row: Option<OrderRow> = if lock {
        query.for_update().first(conn).optional()?
    } else {
        query.first(conn).optional()?
    };

    let Some(row) = row else {
        return Ok(None);
    };

    let lines: Vec<OrderLineRow> = order_lines::table
        .filter(order_lines::order_id.eq(row.id))
        .select(OrderLineRow::as_select())
        .load(conn)?;

    row.into_order(lines).map(Some)
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let order = Order::from_draft(draft, now());

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            diesel::insert_into(orders::table)
                .values(&NewOrderRow::from(&order))
                .execute(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        DomainError::DuplicateOrder(order.order_id)
                    }
                    other => other.into(),
                })?;

            // 2. Insert the item snapshot
            let new_lines: Vec<NewOrderLineRow> = order
                .items
                .iter()
                .enumerate()
                .map(|(position, l)| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id: order.order_id,
                    position: position as i32,
                    product_id: l.product_id.clone(),
                    name: l.name.clone(),
                    unit_price: l.unit_price.clone(),
                    quantity: l.quantity,
                })
                .collect();
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .execute(conn)?;

            // 3. Outbox event in the same transaction.
            insert_outbox(conn, outbox::order_created(&order))
        })?;

        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, id, false)
    }

    fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let id = orders::table
            .filter(orders::payment_intent_id.eq(intent_id))
            .select(orders::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        match id {
            Some(id) => load_order(&mut conn, id, false),
            None => Ok(None),
        }
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(offset) = page_offset(page, limit) else {
            let total: i64 = orders::table.count().get_result(&mut conn)?;
            return Ok(ListResult {
                items: Vec::new(),
                total,
            });
        };
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows: Vec<OrderRow> = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let lines: Vec<OrderLineRow> = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .load(conn)?;

            let items = lines
                .grouped_by(&rows)
                .into_iter()
                .zip(rows)
                .map(|(lines, row)| row.into_order(lines))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn attach_intent(&self, id: Uuid, intent_id: &str) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut order = load_order(conn, id, true)?.ok_or(DomainError::NotFound)?;
            if order.status != OrderStatus::Pending {
                return Ok(order);
            }

            diesel::update(orders::table.filter(orders::id.eq(id)))
                .set((
                    orders::payment_intent_id.eq(intent_id),
                    orders::updated_at.eq(now()),
                ))
                .execute(conn)?;
            order.payment_intent_id = Some(intent_id.to_string());
            Ok(order)
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        evidence: StatusEvidence,
    ) -> Result<StatusChange, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // The row lock serializes every writer of this order until commit.
            let mut order = load_order(conn, id, true)?.ok_or(DomainError::NotFound)?;
            let at = now();
            if !order.transition(status, &evidence, at)? {
                return Ok(StatusChange::Unchanged(order));
            }

            diesel::update(orders::table.filter(orders::id.eq(id)))
                .set((
                    orders::status.eq(order.status.as_str()),
                    orders::payment_intent_id.eq(&order.payment_intent_id),
                    orders::paid_at.eq(order.paid_at),
                    orders::updated_at.eq(at),
                ))
                .execute(conn)?;

            if order.status == OrderStatus::Paid {
                let rows: Vec<SalesRecordRow> = order
                    .sales_records()
                    .into_iter()
                    .map(SalesRecordRow::from)
                    .collect();
                diesel::insert_into(sales_records::table)
                    .values(&rows)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
            }

            insert_outbox(conn, outbox::status_changed(&order, &evidence))?;
            Ok(StatusChange::Applied(order))
        })
    }

    fn sales(&self, date: Option<NaiveDate>) -> Result<Vec<SalesRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = sales_records::table
            .select(SalesRecordRow::as_select())
            .into_boxed();
        if let Some(date) = date {
            query = query.filter(sales_records::sale_date.eq(date));
        }

        let rows: Vec<SalesRecordRow> = query
            .order((
                sales_records::paid_at.desc(),
                sales_records::order_id,
                sales_records::line_position,
                sales_records::unit_index,
            ))
            .load(&mut conn)?;
        Ok(rows.into_iter().map(SalesRecord::from).collect())
    }

    fn sales_for_order(&self, id: Uuid) -> Result<Vec<SalesRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<SalesRecordRow> = sales_records::table
            .filter(sales_records::order_id.eq(id))
            .select(SalesRecordRow::as_select())
            .order((sales_records::line_position, sales_records::unit_index))
            .load(&mut conn)?;
        Ok(rows.into_iter().map(SalesRecord::from).collect())
    }
}
