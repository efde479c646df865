use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::AppEngine;

use super::orders::OrderResponse;

// ── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSessionResponse {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub client_token: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/{id}/payment
///
/// Opens a gateway payment session for the order's current total and returns
/// the credentials the client needs to complete it.
#[utoipa::path(
    post,
    path = "/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Payment session created", body = PaymentSessionResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order cannot take a payment in its current status"),
        (status = 503, description = "Payment gateway unavailable"),
    ),
    tag = "payments"
)]
pub async fn initiate_payment(
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let session = web::block(move || engine.initiate_payment(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(PaymentSessionResponse {
        order_id: session.order.id,
        gateway_order_id: session.gateway_order_id,
        client_token: session.client_token,
        amount_minor_units: session.amount_minor_units,
        currency: session.currency,
        status: session.order.status.as_str().to_string(),
    }))
}

/// POST /payments/confirm
///
/// Signature-verified payment confirmation from the gateway checkout. The
/// only path that settles an order from a payment event; redelivery of an
/// identical confirmation returns the already-settled order.
#[utoipa::path(
    post,
    path = "/payments/confirm",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment applied", body = OrderResponse),
        (status = 400, description = "Payment verification failed"),
        (status = 404, description = "No order for this gateway order id"),
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    engine: web::Data<AppEngine>,
    body: web::Json<ConfirmPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order = web::block(move || {
        engine.confirm_payment(&body.gateway_order_id, body.payment_id, &body.signature)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from_domain(order, vec![])))
}
