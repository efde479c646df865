use bigdecimal::BigDecimal;
use serde_json::Value;
use uuid::Uuid;

use super::access::AccessGrant;
use super::errors::DomainError;
use super::order::{Order, OrderEvent, OrderItem, OrderStatus};

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Persist a new order with its line items (and its creation event)
    /// atomically.
    fn insert(&self, order: &Order, items: &[OrderItem]) -> Result<(), DomainError>;

    fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError>;

    /// Join key for inbound gateway confirmations.
    fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, DomainError>;

    fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError>;

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;

    /// Write the mutated aggregate guarded by `expected` — the status the
    /// transition was computed from. Returns `false` when the guard misses,
    /// i.e. a concurrent transition won the race; nothing is written then.
    fn apply_transition(
        &self,
        expected: OrderStatus,
        order: &Order,
        event: &OrderEvent,
    ) -> Result<bool, DomainError>;

    /// Best-effort backfill of the chat id after the channel is provisioned.
    fn attach_chat(&self, order_id: Uuid, chat_id: Uuid) -> Result<(), DomainError>;
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
}

#[derive(Debug, Clone)]
pub struct CourseSnapshot {
    pub id: Uuid,
    pub title: String,
    pub price: BigDecimal,
}

pub trait Catalog: Send + Sync + 'static {
    fn product(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError>;
    fn course(&self, id: Uuid) -> Result<Option<CourseSnapshot>, DomainError>;
    fn decrement_stock(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;
}

// ── Users & access grants ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

pub trait UserStore: Send + Sync + 'static {
    fn find_user(&self, id: Uuid) -> Result<Option<UserRef>, DomainError>;

    /// Insert the grant, or renew the existing `(user, course)` row in place.
    fn upsert_access_grant(&self, grant: &AccessGrant) -> Result<(), DomainError>;

    fn increment_enrollment(&self, course_id: Uuid) -> Result<(), DomainError>;
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum NotificationKind {
    OrderPlaced,
    OrderApproved,
    OrderRejected,
    PaymentRequested,
    PaymentReceived,
    DeliveryUpdate,
    DeliveryReminder,
    CourseAccess,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderPlaced => "order_placed",
            NotificationKind::OrderApproved => "order_approved",
            NotificationKind::OrderRejected => "order_rejected",
            NotificationKind::PaymentRequested => "payment_requested",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::DeliveryUpdate => "delivery_update",
            NotificationKind::DeliveryReminder => "delivery_reminder",
            NotificationKind::CourseAccess => "course_access",
        }
    }
}

pub trait NotificationSink: Send + Sync + 'static {
    fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<(), DomainError>;

    /// Broadcast to every user holding `role`, however many there are.
    fn notify_role(
        &self,
        role: UserRole,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<(), DomainError>;
}

// ── Email ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum EmailTemplate {
    OrderPlaced,
    OrderApproved,
    OrderRejected,
    CustomizationQuote,
    PaymentConfirmation,
    DeliveryUpdate,
    DeliveryReminder,
    CourseAccess,
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::OrderPlaced => "order_placed",
            EmailTemplate::OrderApproved => "order_approved",
            EmailTemplate::OrderRejected => "order_rejected",
            EmailTemplate::CustomizationQuote => "customization_quote",
            EmailTemplate::PaymentConfirmation => "payment_confirmation",
            EmailTemplate::DeliveryUpdate => "delivery_update",
            EmailTemplate::DeliveryReminder => "delivery_reminder",
            EmailTemplate::CourseAccess => "course_access",
        }
    }
}

pub trait EmailSink: Send + Sync + 'static {
    /// Rendering and delivery live behind this port; `context` is the order
    /// snapshot the template is filled from.
    fn send(&self, template: EmailTemplate, recipient: &str, context: &Value) -> Result<(), DomainError>;
}

// ── Chat provisioning ────────────────────────────────────────────────────────

pub trait ChatProvisioner: Send + Sync + 'static {
    fn create_chat(&self, order_id: Uuid, participants: &[Uuid]) -> Result<Uuid, DomainError>;
    fn deactivate_chat(&self, chat_id: Uuid) -> Result<(), DomainError>;
}

// ── Payment gateway ──────────────────────────────────────────────────────────

/// What the client needs to complete a payment against the gateway.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub gateway_order_id: String,
    pub client_token: String,
}

pub trait PaymentGatewayClient: Send + Sync + 'static {
    fn create_payment_order(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewaySession, DomainError>;
}

// ── Side-effect handoff ──────────────────────────────────────────────────────

/// A committed transition plus everything the orchestrator needs to act on it.
#[derive(Debug, Clone)]
pub struct EffectTask {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub event: OrderEvent,
}

/// Seam between the engine and effect execution. Production wiring queues
/// tasks onto a worker thread; tests run the orchestrator inline.
pub trait EffectDispatcher: Send + Sync + 'static {
    fn dispatch(&self, task: EffectTask);
}
