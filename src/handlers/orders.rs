use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::engine::NewOrderLine;
use crate::domain::order::{CatalogRef, Order, OrderItem, OrderStatus};
use crate::errors::AppError;
use crate::AppEngine;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    /// "product" or "course"
    pub item_type: String,
    pub catalog_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub items: Vec<CreateOrderItemRequest>,
    #[serde(default)]
    pub customization_required: bool,
    pub payment_method: Option<String>,
    pub delivery_info: Option<Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub admin_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomizationPriceRequest {
    /// Decimal price as a string to avoid floating-point issues, e.g. "250.00"
    pub price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceFulfillmentRequest {
    /// Target fulfillment status, e.g. "in_progress" or "ready_for_delivery"
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub item_type: String,
    pub catalog_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub is_course_purchase: bool,
    pub customization_required: bool,
    pub original_price: String,
    pub customization_price: Option<String>,
    pub shipping_fee: String,
    pub total_amount: String,
    pub payment_method: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub chat_enabled: bool,
    pub chat_id: Option<Uuid>,
    pub course_access_expiry: Option<String>,
    pub delivery_reminder_sent: bool,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn from_domain(order: Order, items: Vec<OrderItem>) -> Self {
        OrderResponse {
            id: order.id,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            is_course_purchase: order.is_course_purchase,
            customization_required: order.customization_required,
            original_price: order.original_price.to_string(),
            customization_price: order.customization_price.map(|p| p.to_string()),
            shipping_fee: order.shipping_fee.to_string(),
            total_amount: order.total_amount.to_string(),
            payment_method: order.payment_method,
            gateway_order_id: order.gateway_order_id,
            gateway_payment_id: order.gateway_payment_id,
            chat_enabled: order.chat_enabled,
            chat_id: order.chat_id,
            course_access_expiry: order.course_access_expiry.map(|t| t.to_rfc3339()),
            delivery_reminder_sent: order.delivery_reminder_sent,
            admin_notes: order.admin_notes,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            items: items
                .into_iter()
                .map(|item| {
                    let (item_type, catalog_id) = match item.catalog_ref {
                        CatalogRef::Product(id) => ("product", id),
                        CatalogRef::Course(id) => ("course", id),
                    };
                    OrderItemResponse {
                        id: item.id,
                        item_type: item_type.to_string(),
                        catalog_id,
                        quantity: item.quantity,
                        unit_price: item.unit_price.to_string(),
                    }
                })
                .collect(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn parse_lines(items: Vec<CreateOrderItemRequest>) -> Result<Vec<NewOrderLine>, AppError> {
    items
        .into_iter()
        .map(|item| {
            let catalog_ref = match item.item_type.as_str() {
                "product" => CatalogRef::Product(item.catalog_id),
                "course" => CatalogRef::Course(item.catalog_id),
                other => {
                    return Err(AppError::PreconditionFailed(format!(
                        "unknown item type '{other}'"
                    )))
                }
            };
            Ok(NewOrderLine {
                catalog_ref,
                quantity: item.quantity,
            })
        })
        .collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checkout: snapshots catalog prices, computes the totals and creates the
/// order in `pending_approval`.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 422, description = "Invalid order contents"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    engine: web::Data<AppEngine>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let lines = parse_lines(body.items)?;

    let order = web::block(move || {
        engine.create_order(
            body.user_id,
            lines,
            body.customization_required,
            body.payment_method,
            body.delivery_info,
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from_domain(order, vec![])))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let (order, items) = web::block(move || engine.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, items)))
}

/// GET /orders
///
/// Paginated list of orders (without their line items).
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    engine: web::Data<AppEngine>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || engine.list_orders(page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result
            .items
            .into_iter()
            .map(|order| OrderResponse::from_domain(order, vec![]))
            .collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// POST /orders/{id}/approve
#[utoipa::path(
    post,
    path = "/orders/{id}/approve",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Order approved", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Not approvable in its current status"),
    ),
    tag = "orders"
)]
pub async fn approve_order(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let order = web::block(move || engine.approve(order_id, body.admin_id, body.notes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, vec![])))
}

/// POST /orders/{id}/reject
#[utoipa::path(
    post,
    path = "/orders/{id}/reject",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Order rejected", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Not rejectable in its current status"),
    ),
    tag = "orders"
)]
pub async fn reject_order(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let order = web::block(move || engine.reject(order_id, body.admin_id, body.notes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, vec![])))
}

/// POST /orders/{id}/customization-price
///
/// Sets the negotiated customization price and moves the order to
/// `payment_pending`.
#[utoipa::path(
    post,
    path = "/orders/{id}/customization-price",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = CustomizationPriceRequest,
    responses(
        (status = 200, description = "Price set, payment requested", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting a customization quote"),
        (status = 422, description = "Invalid price"),
    ),
    tag = "orders"
)]
pub async fn set_customization_price(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    body: web::Json<CustomizationPriceRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let price = BigDecimal::from_str(&body.price)
        .map_err(|e| AppError::PreconditionFailed(format!("invalid price '{}': {e}", body.price)))?;
    let order = web::block(move || engine.request_customization_payment(order_id, price))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, vec![])))
}

/// POST /orders/{id}/fulfillment
///
/// Admin moves a paid physical order between fulfillment stages.
#[utoipa::path(
    post,
    path = "/orders/{id}/fulfillment",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = AdvanceFulfillmentRequest,
    responses(
        (status = 200, description = "Order moved", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not in fulfillment"),
        (status = 422, description = "Invalid target status"),
    ),
    tag = "orders"
)]
pub async fn advance_fulfillment(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    body: web::Json<AdvanceFulfillmentRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let to = OrderStatus::parse(&body.status)
        .map_err(|_| AppError::PreconditionFailed(format!("unknown status '{}'", body.status)))?;
    let order = web::block(move || engine.advance_fulfillment(order_id, to))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, vec![])))
}

/// POST /orders/{id}/delivery-reminder
///
/// One-shot reminder for orders sitting in `ready_for_delivery`.
#[utoipa::path(
    post,
    path = "/orders/{id}/delivery-reminder",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Reminder sent", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not ready for delivery"),
        (status = 422, description = "Reminder already sent"),
    ),
    tag = "orders"
)]
pub async fn send_delivery_reminder(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let order = web::block(move || engine.send_delivery_reminder(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, vec![])))
}
