use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderEvent, OrderItem, OrderStatus};
use crate::domain::ports::{ListResult, OrderRepository};
use crate::schema::{commerce_order_outbox, order_items, orders};

use super::models::{
    NewOrderItemRow, NewOrderRow, NewOutboxEventRow, OrderChangeset, OrderItemRow, OrderRow,
};

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

// ── Repository ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn insert(&self, order: &Order, items: &[OrderItem]) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&NewOrderRow::from_domain(order))
                .execute(conn)?;

            let item_rows: Vec<NewOrderItemRow> =
                items.iter().map(NewOrderItemRow::from_domain).collect();
            diesel::insert_into(order_items::table)
                .values(&item_rows)
                .execute(conn)?;

            insert_outbox_event(conn, order, &OrderEvent::Created)
        })
    }

    fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(OrderRow::into_domain).transpose()
    }

    fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = orders::table
            .filter(orders::gateway_order_id.eq(gateway_order_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(OrderRow::into_domain).transpose()
    }

    fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .order(order_items::created_at.asc())
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(OrderItemRow::into_domain).collect()
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: rows
                    .into_iter()
                    .map(OrderRow::into_domain)
                    .collect::<Result<Vec<_>, _>>()?,
                total,
            })
        })
    }

    fn apply_transition(
        &self,
        expected: OrderStatus,
        order: &Order,
        event: &OrderEvent,
    ) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // The status filter is the optimistic guard: a concurrent
            // transition that already moved the order makes this a zero-row
            // update and nothing (outbox included) is written.
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(order.id))
                    .filter(orders::status.eq(expected.as_str())),
            )
            .set(&OrderChangeset::from_domain(order))
            .execute(conn)?;

            if updated == 0 {
                return Ok(false);
            }

            insert_outbox_event(conn, order, event)?;
            Ok(true)
        })
    }

    fn attach_chat(&self, order_id: Uuid, chat_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(orders::table.filter(orders::id.eq(order_id)))
            .set(orders::chat_id.eq(chat_id))
            .execute(&mut conn)?;
        Ok(())
    }
}

/// Outbox row in the same transaction as the state change; Debezium's
/// EventRouter SMT derives the topic from `aggregate_type`.
fn insert_outbox_event(
    conn: &mut PgConnection,
    order: &Order,
    event: &OrderEvent,
) -> Result<(), DomainError> {
    let payload = json!({
        "order_id": order.id,
        "user_id": order.user_id,
        "status": order.status.as_str(),
        "is_course_purchase": order.is_course_purchase,
        "total_amount": order.total_amount.to_string(),
        "gateway_order_id": order.gateway_order_id,
        "gateway_payment_id": order.gateway_payment_id,
    });

    diesel::insert_into(commerce_order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order.id.to_string(),
            event_type: event.event_type().to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}
