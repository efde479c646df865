use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CatalogRef, Order, OrderItem, OrderStatus};
use crate::schema::{
    chat_participants, chats, commerce_order_outbox, course_access_grants, notifications,
    order_items, orders,
};

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub is_course_purchase: bool,
    pub customization_required: bool,
    pub original_price: BigDecimal,
    pub customization_price: Option<BigDecimal>,
    pub shipping_fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_method: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub chat_enabled: bool,
    pub chat_id: Option<Uuid>,
    pub course_access_expiry: Option<DateTime<Utc>>,
    pub delivery_reminder_sent: bool,
    pub admin_notes: Option<String>,
    pub delivery_info: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_domain(self) -> Result<Order, DomainError> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            status: OrderStatus::parse(&self.status)?,
            is_course_purchase: self.is_course_purchase,
            customization_required: self.customization_required,
            original_price: self.original_price,
            customization_price: self.customization_price,
            shipping_fee: self.shipping_fee,
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            chat_enabled: self.chat_enabled,
            chat_id: self.chat_id,
            course_access_expiry: self.course_access_expiry,
            delivery_reminder_sent: self.delivery_reminder_sent,
            admin_notes: self.admin_notes,
            delivery_info: self.delivery_info,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub is_course_purchase: bool,
    pub customization_required: bool,
    pub original_price: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_method: Option<String>,
    pub delivery_info: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewOrderRow {
    pub fn from_domain(order: &Order) -> Self {
        NewOrderRow {
            id: order.id,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            is_course_purchase: order.is_course_purchase,
            customization_required: order.customization_required,
            original_price: order.original_price.clone(),
            shipping_fee: order.shipping_fee.clone(),
            total_amount: order.total_amount.clone(),
            payment_method: order.payment_method.clone(),
            delivery_info: order.delivery_info.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Full write of every transition-mutable column. `None` really means NULL
/// here: the row must mirror the aggregate exactly after each transition.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
#[diesel(treat_none_as_null = true)]
pub struct OrderChangeset {
    pub status: String,
    pub customization_price: Option<BigDecimal>,
    pub total_amount: BigDecimal,
    pub payment_method: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub chat_enabled: bool,
    pub chat_id: Option<Uuid>,
    pub course_access_expiry: Option<DateTime<Utc>>,
    pub delivery_reminder_sent: bool,
    pub admin_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl OrderChangeset {
    pub fn from_domain(order: &Order) -> Self {
        OrderChangeset {
            status: order.status.as_str().to_string(),
            customization_price: order.customization_price.clone(),
            total_amount: order.total_amount.clone(),
            payment_method: order.payment_method.clone(),
            gateway_order_id: order.gateway_order_id.clone(),
            gateway_payment_id: order.gateway_payment_id.clone(),
            chat_enabled: order.chat_enabled,
            chat_id: order.chat_id,
            course_access_expiry: order.course_access_expiry,
            delivery_reminder_sent: order.delivery_reminder_sent,
            admin_notes: order.admin_notes.clone(),
            updated_at: order.updated_at,
        }
    }
}

// ── Order items ──────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_type: String,
    pub product_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl OrderItemRow {
    pub fn into_domain(self) -> Result<OrderItem, DomainError> {
        let catalog_ref = match (self.item_type.as_str(), self.product_id, self.course_id) {
            ("product", Some(id), None) => CatalogRef::Product(id),
            ("course", None, Some(id)) => CatalogRef::Course(id),
            _ => {
                return Err(DomainError::Internal(format!(
                    "order item {} has an inconsistent catalog reference",
                    self.id
                )))
            }
        };
        Ok(OrderItem {
            id: self.id,
            order_id: self.order_id,
            catalog_ref,
            quantity: self.quantity,
            unit_price: self.unit_price,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_type: String,
    pub product_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl NewOrderItemRow {
    pub fn from_domain(item: &OrderItem) -> Self {
        let (item_type, product_id, course_id) = match item.catalog_ref {
            CatalogRef::Product(id) => ("product", Some(id), None),
            CatalogRef::Course(id) => ("course", None, Some(id)),
        };
        NewOrderItemRow {
            id: item.id,
            order_id: item.order_id,
            item_type: item_type.to_string(),
            product_id,
            course_id,
            quantity: item.quantity,
            unit_price: item.unit_price.clone(),
        }
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Insertable)]
#[diesel(table_name = commerce_order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

// ── Access grants ────────────────────────────────────────────────────────────

#[derive(Debug, Insertable)]
#[diesel(table_name = course_access_grants)]
pub struct NewAccessGrantRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub access_expiry: DateTime<Utc>,
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
}

// ── Chats ────────────────────────────────────────────────────────────────────

#[derive(Debug, Insertable)]
#[diesel(table_name = chats)]
pub struct NewChatRow {
    pub id: Uuid,
    pub order_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_participants)]
pub struct NewChatParticipantRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
}
