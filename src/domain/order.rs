use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use super::access;
use super::errors::DomainError;

// ── Status ───────────────────────────────────────────────────────────────────

/// Lifecycle status of an order.
///
/// The only legal moves are the edges checked by the transition methods on
/// [`Order`]; nothing else in the crate writes `Order::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    PendingApproval,
    Approved,
    CustomizationPending,
    PaymentPending,
    OrderReceived,
    InProgress,
    ReadyForDelivery,
    Delivered,
    Completed,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingApproval => "pending_approval",
            OrderStatus::Approved => "approved",
            OrderStatus::CustomizationPending => "customization_pending",
            OrderStatus::PaymentPending => "payment_pending",
            OrderStatus::OrderReceived => "order_received",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::ReadyForDelivery => "ready_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending_approval" => Ok(OrderStatus::PendingApproval),
            "approved" => Ok(OrderStatus::Approved),
            "customization_pending" => Ok(OrderStatus::CustomizationPending),
            "payment_pending" => Ok(OrderStatus::PaymentPending),
            "order_received" => Ok(OrderStatus::OrderReceived),
            "in_progress" => Ok(OrderStatus::InProgress),
            "ready_for_delivery" => Ok(OrderStatus::ReadyForDelivery),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(DomainError::Internal(format!(
                "unknown order status '{other}' in storage"
            ))),
        }
    }

    /// Money has been confirmed for this order (or it is past that point).
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OrderStatus::OrderReceived
                | OrderStatus::InProgress
                | OrderStatus::ReadyForDelivery
                | OrderStatus::Delivered
                | OrderStatus::Completed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Rejected)
    }

    /// Physical fulfillment stages an admin may move an order between.
    pub fn is_fulfillment_stage(&self) -> bool {
        matches!(
            self,
            OrderStatus::OrderReceived
                | OrderStatus::InProgress
                | OrderStatus::ReadyForDelivery
                | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Line items ───────────────────────────────────────────────────────────────

/// Exactly one catalog entity per line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRef {
    Product(Uuid),
    Course(Uuid),
}

impl CatalogRef {
    pub fn is_course(&self) -> bool {
        matches!(self, CatalogRef::Course(_))
    }
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub catalog_ref: CatalogRef,
    pub quantity: i32,
    /// Snapshotted at creation time; catalog price changes never touch it.
    pub unit_price: BigDecimal,
}

// ── Events ───────────────────────────────────────────────────────────────────

/// What happened to an order in a committed transition.
///
/// Written to the outbox in the same transaction as the status change and
/// handed to the side-effect orchestrator afterwards.
#[derive(Debug, Clone)]
pub enum OrderEvent {
    Created,
    Approved { admin_id: Uuid },
    Rejected { admin_id: Uuid },
    CustomizationPriceSet,
    PaymentInitiated,
    PaymentConfirmed,
    FulfillmentAdvanced { to: OrderStatus },
    DeliveryReminderSent,
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created => "OrderCreated",
            OrderEvent::Approved { .. } => "OrderApproved",
            OrderEvent::Rejected { .. } => "OrderRejected",
            OrderEvent::CustomizationPriceSet => "CustomizationPriceSet",
            OrderEvent::PaymentInitiated => "PaymentInitiated",
            OrderEvent::PaymentConfirmed => "PaymentConfirmed",
            OrderEvent::FulfillmentAdvanced { .. } => "FulfillmentAdvanced",
            OrderEvent::DeliveryReminderSent => "DeliveryReminderSent",
        }
    }
}

// ── Aggregate ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    /// Fixed at creation; selects the digital short-circuit sub-table.
    pub is_course_purchase: bool,
    /// Fixed at creation; physical orders only.
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

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        user_id: Uuid,
        is_course_purchase: bool,
        customization_required: bool,
        original_price: BigDecimal,
        shipping_fee: BigDecimal,
        payment_method: Option<String>,
        delivery_info: Option<Value>,
    ) -> Self {
        let now = Utc::now();
        let total_amount = &original_price + &shipping_fee;
        Order {
            id: Uuid::new_v4(),
            user_id,
            status: OrderStatus::PendingApproval,
            is_course_purchase,
            customization_required,
            original_price,
            customization_price: None,
            shipping_fee,
            total_amount,
            payment_method,
            gateway_order_id: None,
            gateway_payment_id: None,
            chat_enabled: false,
            chat_id: None,
            course_access_expiry: None,
            delivery_reminder_sent: false,
            admin_notes: None,
            delivery_info,
            created_at: now,
            updated_at: now,
        }
    }

    /// Admin approval from `pending_approval`.
    ///
    /// Three outcomes: a course order whose payment the gateway has already
    /// confirmed completes on the spot (access is granted by the caller
    /// before anything else observes `completed`); a physical order that
    /// requires customization enters the negotiation state and opens a chat;
    /// everything else becomes `approved` and waits for payment.
    pub fn approve(&mut self, admin_id: Uuid, notes: Option<String>) -> Result<OrderEvent, DomainError> {
        if self.status != OrderStatus::PendingApproval {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "approve",
            });
        }
        if let Some(notes) = notes {
            self.admin_notes = Some(notes);
        }
        if self.is_course_purchase && self.gateway_payment_id.is_some() {
            self.status = OrderStatus::Completed;
            self.course_access_expiry = Some(access::expiry_from(Utc::now()));
        } else if self.customization_required {
            self.status = OrderStatus::CustomizationPending;
            self.chat_enabled = true;
        } else {
            self.status = OrderStatus::Approved;
        }
        self.touch();
        Ok(OrderEvent::Approved { admin_id })
    }

    /// Admin rejection. Never allowed once money is confirmed.
    pub fn reject(&mut self, admin_id: Uuid, notes: Option<String>) -> Result<OrderEvent, DomainError> {
        match self.status {
            OrderStatus::PendingApproval
            | OrderStatus::Approved
            | OrderStatus::CustomizationPending
            | OrderStatus::PaymentPending => {}
            from => {
                return Err(DomainError::InvalidTransition {
                    from,
                    action: "reject",
                })
            }
        }
        if let Some(notes) = notes {
            self.admin_notes = Some(notes);
        }
        self.status = OrderStatus::Rejected;
        self.chat_enabled = false;
        self.touch();
        Ok(OrderEvent::Rejected { admin_id })
    }

    /// Admin sets the negotiated customization price and requests payment.
    ///
    /// Recomputes `total_amount = original_price + customization_price +
    /// shipping_fee`.
    pub fn set_customization_price(&mut self, price: BigDecimal) -> Result<OrderEvent, DomainError> {
        if self.status != OrderStatus::CustomizationPending {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "request-payment",
            });
        }
        if price < BigDecimal::from(0) {
            return Err(DomainError::PreconditionFailed(
                "customization price must be non-negative".to_string(),
            ));
        }
        self.total_amount = &self.original_price + &price + &self.shipping_fee;
        self.customization_price = Some(price);
        self.status = OrderStatus::PaymentPending;
        self.touch();
        Ok(OrderEvent::CustomizationPriceSet)
    }

    /// Record a freshly created gateway payment order.
    ///
    /// Legal from the three states a payment may be initiated in. From
    /// `approved` this is the `approved → payment_pending` edge; in the other
    /// two states only the gateway correlation id is stamped.
    pub fn note_payment_initiated(&mut self, gateway_order_id: String) -> Result<OrderEvent, DomainError> {
        match self.status {
            OrderStatus::Approved => self.status = OrderStatus::PaymentPending,
            OrderStatus::PendingApproval | OrderStatus::PaymentPending => {}
            from => {
                return Err(DomainError::InvalidTransition {
                    from,
                    action: "initiate-payment",
                })
            }
        }
        self.gateway_order_id = Some(gateway_order_id);
        self.touch();
        Ok(OrderEvent::PaymentInitiated)
    }

    /// Apply a signature-verified payment confirmation.
    ///
    /// Course orders complete immediately (digital delivery is the access
    /// grant); physical orders enter `order_received`. The caller must have
    /// verified the gateway signature first — this is the only path that
    /// settles an order from a payment event.
    pub fn confirm_payment(&mut self, payment_id: String) -> Result<OrderEvent, DomainError> {
        match self.status {
            OrderStatus::PendingApproval | OrderStatus::Approved | OrderStatus::PaymentPending => {}
            from => {
                return Err(DomainError::InvalidTransition {
                    from,
                    action: "confirm-payment",
                })
            }
        }
        self.gateway_payment_id = Some(payment_id);
        if self.is_course_purchase {
            self.status = OrderStatus::Completed;
            self.course_access_expiry = Some(access::expiry_from(Utc::now()));
        } else {
            self.status = OrderStatus::OrderReceived;
        }
        self.touch();
        Ok(OrderEvent::PaymentConfirmed)
    }

    /// Admin moves a paid physical order between fulfillment stages.
    ///
    /// Free-form within `order_received … completed`: re-entering
    /// `ready_for_delivery` re-arms the one-shot delivery reminder, and
    /// reaching `delivered` or `completed` closes the customization chat.
    pub fn advance_fulfillment(&mut self, to: OrderStatus) -> Result<OrderEvent, DomainError> {
        if !self.status.is_fulfillment_stage() {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "advance-fulfillment",
            });
        }
        let target_ok = matches!(
            to,
            OrderStatus::InProgress
                | OrderStatus::ReadyForDelivery
                | OrderStatus::Delivered
                | OrderStatus::Completed
        );
        if !target_ok || to == self.status {
            return Err(DomainError::PreconditionFailed(format!(
                "'{to}' is not a valid fulfillment move from '{}'",
                self.status
            )));
        }
        self.status = to;
        if to == OrderStatus::ReadyForDelivery {
            self.delivery_reminder_sent = false;
        }
        if matches!(to, OrderStatus::Delivered | OrderStatus::Completed) {
            self.chat_enabled = false;
        }
        self.touch();
        Ok(OrderEvent::FulfillmentAdvanced { to })
    }

    /// One-shot delivery reminder, re-armed on each entry to
    /// `ready_for_delivery`.
    pub fn mark_delivery_reminder_sent(&mut self) -> Result<OrderEvent, DomainError> {
        if self.status != OrderStatus::ReadyForDelivery {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "delivery-reminder",
            });
        }
        if self.delivery_reminder_sent {
            return Err(DomainError::PreconditionFailed(
                "delivery reminder was already sent".to_string(),
            ));
        }
        self.delivery_reminder_sent = true;
        self.touch();
        Ok(OrderEvent::DeliveryReminderSent)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn physical_order(customization: bool) -> Order {
        Order::create(
            Uuid::new_v4(),
            false,
            customization,
            BigDecimal::from_str("1200").unwrap(),
            BigDecimal::from(0),
            None,
            None,
        )
    }

    fn course_order() -> Order {
        Order::create(
            Uuid::new_v4(),
            true,
            false,
            BigDecimal::from_str("499").unwrap(),
            BigDecimal::from(0),
            None,
            None,
        )
    }

    #[test]
    fn approve_standard_physical_order() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert!(!order.chat_enabled);
    }

    #[test]
    fn approve_customized_order_enters_negotiation_with_chat() {
        let mut order = physical_order(true);
        order.approve(Uuid::new_v4(), Some("please confirm engraving".into())).unwrap();
        assert_eq!(order.status, OrderStatus::CustomizationPending);
        assert!(order.chat_enabled);
        assert_eq!(order.admin_notes.as_deref(), Some("please confirm engraving"));
    }

    #[test]
    fn approve_paid_course_order_completes() {
        let mut order = course_order();
        order.gateway_payment_id = Some("pay_123".into());
        order.approve(Uuid::new_v4(), None).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.course_access_expiry.is_some());
    }

    #[test]
    fn approve_unpaid_course_order_waits_for_payment() {
        let mut order = course_order();
        order.approve(Uuid::new_v4(), None).unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert!(order.course_access_expiry.is_none());
    }

    #[test]
    fn approve_twice_is_invalid() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        let err = order.approve(Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn customization_price_recomputes_total() {
        let mut order = physical_order(true);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.set_customization_price(BigDecimal::from(500)).unwrap();
        assert_eq!(order.status, OrderStatus::PaymentPending);
        assert_eq!(order.total_amount, BigDecimal::from(1700));
    }

    #[test]
    fn negative_customization_price_fails_precondition() {
        let mut order = physical_order(true);
        order.approve(Uuid::new_v4(), None).unwrap();
        let err = order.set_customization_price(BigDecimal::from(-1)).unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
        assert_eq!(order.status, OrderStatus::CustomizationPending);
        assert!(order.customization_price.is_none());
    }

    #[test]
    fn customization_price_outside_negotiation_is_invalid() {
        let mut order = physical_order(false);
        let err = order.set_customization_price(BigDecimal::from(10)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn initiate_moves_approved_order_to_payment_pending() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_1".into()).unwrap();
        assert_eq!(order.status, OrderStatus::PaymentPending);
        assert_eq!(order.gateway_order_id.as_deref(), Some("gw_1"));
    }

    #[test]
    fn initiate_before_approval_stamps_without_status_change() {
        let mut order = course_order();
        order.note_payment_initiated("gw_2".into()).unwrap();
        assert_eq!(order.status, OrderStatus::PendingApproval);
        assert_eq!(order.gateway_order_id.as_deref(), Some("gw_2"));
    }

    #[test]
    fn initiate_on_settled_order_is_invalid() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_3".into()).unwrap();
        order.confirm_payment("pay_3".into()).unwrap();
        let err = order.note_payment_initiated("gw_3b".into()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn confirmed_payment_settles_physical_order() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_4".into()).unwrap();
        order.confirm_payment("pay_4".into()).unwrap();
        assert_eq!(order.status, OrderStatus::OrderReceived);
        assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_4"));
    }

    #[test]
    fn confirmed_payment_completes_course_order() {
        let mut order = course_order();
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_5".into()).unwrap();
        order.confirm_payment("pay_5".into()).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        let expiry = order.course_access_expiry.expect("expiry must be set");
        assert!(expiry > Utc::now() + chrono::Duration::days(364));
    }

    #[test]
    fn reject_is_blocked_once_money_is_confirmed() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_6".into()).unwrap();
        order.confirm_payment("pay_6".into()).unwrap();
        let err = order.reject(Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::OrderReceived);
    }

    #[test]
    fn reject_during_negotiation_closes_chat() {
        let mut order = physical_order(true);
        order.approve(Uuid::new_v4(), None).unwrap();
        assert!(order.chat_enabled);
        order.reject(Uuid::new_v4(), Some("cannot source material".into())).unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(!order.chat_enabled);
    }

    #[test]
    fn fulfillment_walks_the_linear_sequence() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_7".into()).unwrap();
        order.confirm_payment("pay_7".into()).unwrap();
        for to in [
            OrderStatus::InProgress,
            OrderStatus::ReadyForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
        ] {
            order.advance_fulfillment(to).unwrap();
            assert_eq!(order.status, to);
        }
    }

    #[test]
    fn fulfillment_before_payment_is_invalid() {
        let mut order = physical_order(false);
        let err = order.advance_fulfillment(OrderStatus::InProgress).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn delivered_disables_chat() {
        let mut order = physical_order(true);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.set_customization_price(BigDecimal::from(100)).unwrap();
        order.confirm_payment("pay_8".into()).unwrap();
        order.advance_fulfillment(OrderStatus::Delivered).unwrap();
        assert!(!order.chat_enabled);
    }

    #[test]
    fn reentering_ready_for_delivery_rearms_reminder() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_9".into()).unwrap();
        order.confirm_payment("pay_9".into()).unwrap();
        order.advance_fulfillment(OrderStatus::ReadyForDelivery).unwrap();
        order.mark_delivery_reminder_sent().unwrap();
        assert!(order.delivery_reminder_sent);

        // Back to the workshop and out again: the reminder re-arms.
        order.advance_fulfillment(OrderStatus::InProgress).unwrap();
        order.advance_fulfillment(OrderStatus::ReadyForDelivery).unwrap();
        assert!(!order.delivery_reminder_sent);
        order.mark_delivery_reminder_sent().unwrap();
    }

    #[test]
    fn second_delivery_reminder_fails_precondition() {
        let mut order = physical_order(false);
        order.approve(Uuid::new_v4(), None).unwrap();
        order.note_payment_initiated("gw_10".into()).unwrap();
        order.confirm_payment("pay_10".into()).unwrap();
        order.advance_fulfillment(OrderStatus::ReadyForDelivery).unwrap();
        order.mark_delivery_reminder_sent().unwrap();
        let err = order.mark_delivery_reminder_sent().unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
    }

    #[test]
    fn status_round_trips_through_storage_representation() {
        for status in [
            OrderStatus::PendingApproval,
            OrderStatus::Approved,
            OrderStatus::CustomizationPending,
            OrderStatus::PaymentPending,
            OrderStatus::OrderReceived,
            OrderStatus::InProgress,
            OrderStatus::ReadyForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Rejected,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("shipped").is_err());
    }
}
