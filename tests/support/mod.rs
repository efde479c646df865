//! In-memory implementations of the engine's ports, plus a wired-up test
//! engine. Effects run inline (the orchestrator itself is the dispatcher) so
//! tests can assert on them synchronously.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use serde_json::Value;
use uuid::Uuid;

use fulfillment_service::application::effects::SideEffectOrchestrator;
use fulfillment_service::application::engine::StateTransitionEngine;
use fulfillment_service::application::payment::PaymentGatewayAdapter;
use fulfillment_service::domain::access::AccessGrant;
use fulfillment_service::domain::errors::DomainError;
use fulfillment_service::domain::order::{Order, OrderEvent, OrderItem, OrderStatus};
use fulfillment_service::domain::ports::{
    Catalog, ChatProvisioner, CourseSnapshot, EmailSink, EmailTemplate, GatewaySession,
    ListResult, NotificationKind, NotificationSink, OrderRepository, PaymentGatewayClient,
    ProductSnapshot, UserRef, UserRole, UserStore,
};

pub const GATEWAY_SECRET: &str = "test-secret";

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct OrdersInner {
    orders: HashMap<Uuid, Order>,
    items: HashMap<Uuid, Vec<OrderItem>>,
    event_log: Vec<String>,
}

#[derive(Clone, Default)]
pub struct InMemoryOrders {
    inner: Arc<Mutex<OrdersInner>>,
}

impl InMemoryOrders {
    pub fn event_log(&self) -> Vec<String> {
        self.inner.lock().unwrap().event_log.clone()
    }
}

impl OrderRepository for InMemoryOrders {
    fn insert(&self, order: &Order, items: &[OrderItem]) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.orders.insert(order.id, order.clone());
        inner.items.insert(order.id, items.to_vec());
        inner.event_log.push("OrderCreated".to_string());
        Ok(())
    }

    fn find(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.inner.lock().unwrap().orders.get(&id).cloned())
    }

    fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .values()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut items: Vec<Order> = inner.orders.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = items.len() as i64;
        let offset = ((page - 1) * limit).max(0) as usize;
        let items = items.into_iter().skip(offset).take(limit as usize).collect();
        Ok(ListResult { items, total })
    }

    fn apply_transition(
        &self,
        expected: OrderStatus,
        order: &Order,
        event: &OrderEvent,
    ) -> Result<bool, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(current) = inner.orders.get(&order.id) else {
            return Ok(false);
        };
        if current.status != expected {
            return Ok(false);
        }
        inner.orders.insert(order.id, order.clone());
        inner.event_log.push(event.event_type().to_string());
        Ok(true)
    }

    fn attach_chat(&self, order_id: Uuid, chat_id: Uuid) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.chat_id = Some(chat_id);
        }
        Ok(())
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CatalogInner {
    products: HashMap<Uuid, ProductSnapshot>,
    courses: HashMap<Uuid, CourseSnapshot>,
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<Mutex<CatalogInner>>,
}

impl InMemoryCatalog {
    pub fn add_product(&self, name: &str, price: BigDecimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().products.insert(
            id,
            ProductSnapshot {
                id,
                name: name.to_string(),
                price,
                stock,
            },
        );
        id
    }

    pub fn add_course(&self, title: &str, price: BigDecimal) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().courses.insert(
            id,
            CourseSnapshot {
                id,
                title: title.to_string(),
                price,
            },
        );
        id
    }

    pub fn stock(&self, product_id: Uuid) -> i32 {
        self.inner.lock().unwrap().products[&product_id].stock
    }

    pub fn set_price(&self, product_id: Uuid, price: BigDecimal) {
        self.inner
            .lock()
            .unwrap()
            .products
            .get_mut(&product_id)
            .expect("unknown product")
            .price = price;
    }
}

impl Catalog for InMemoryCatalog {
    fn product(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        Ok(self.inner.lock().unwrap().products.get(&id).cloned())
    }

    fn course(&self, id: Uuid) -> Result<Option<CourseSnapshot>, DomainError> {
        Ok(self.inner.lock().unwrap().courses.get(&id).cloned())
    }

    fn decrement_stock(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or_else(|| DomainError::Internal(format!("unknown product {product_id}")))?;
        if product.stock < quantity {
            return Err(DomainError::Internal(format!(
                "insufficient stock for product {product_id}"
            )));
        }
        product.stock -= quantity;
        Ok(())
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct UsersInner {
    users: HashMap<Uuid, UserRef>,
    grants: Vec<AccessGrant>,
    enrollments: HashMap<Uuid, i32>,
}

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    inner: Arc<Mutex<UsersInner>>,
}

impl InMemoryUsers {
    pub fn add_user(&self, name: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().users.insert(
            id,
            UserRef {
                id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        id
    }

    pub fn grants_for(&self, user_id: Uuid) -> Vec<AccessGrant> {
        self.inner
            .lock()
            .unwrap()
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn enrollment(&self, course_id: Uuid) -> i32 {
        *self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .get(&course_id)
            .unwrap_or(&0)
    }
}

impl UserStore for InMemoryUsers {
    fn find_user(&self, id: Uuid) -> Result<Option<UserRef>, DomainError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    fn upsert_access_grant(&self, grant: &AccessGrant) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .grants
            .iter_mut()
            .find(|g| g.user_id == grant.user_id && g.course_id == grant.course_id)
        {
            existing.purchase_date = grant.purchase_date;
            existing.access_expiry = grant.access_expiry;
        } else {
            inner.grants.push(grant.clone());
        }
        Ok(())
    }

    fn increment_enrollment(&self, course_id: Uuid) -> Result<(), DomainError> {
        *self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .entry(course_id)
            .or_insert(0) += 1;
        Ok(())
    }
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingNotifications {
    direct: Arc<Mutex<Vec<(Uuid, String)>>>,
    broadcasts: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifications {
    pub fn direct(&self) -> Vec<(Uuid, String)> {
        self.direct.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<(String, String)> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingNotifications {
    fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        _title: &str,
        _message: &str,
        _related_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        self.direct
            .lock()
            .unwrap()
            .push((user_id, kind.as_str().to_string()));
        Ok(())
    }

    fn notify_role(
        &self,
        role: UserRole,
        kind: NotificationKind,
        _title: &str,
        _message: &str,
        _related_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        self.broadcasts
            .lock()
            .unwrap()
            .push((role.as_str().to_string(), kind.as_str().to_string()));
        Ok(())
    }
}

// ── Email ────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingEmail {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingEmail {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_templates(&self, template: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == template)
            .count()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl EmailSink for RecordingEmail {
    fn send(&self, template: EmailTemplate, recipient: &str, _context: &Value) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("email relay down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((template.name().to_string(), recipient.to_string()));
        Ok(())
    }
}

// ── Chat ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatedChat {
    pub chat_id: Uuid,
    pub order_id: Uuid,
    pub participants: Vec<Uuid>,
}

#[derive(Clone, Default)]
pub struct RecordingChat {
    created: Arc<Mutex<Vec<CreatedChat>>>,
    deactivated: Arc<Mutex<Vec<Uuid>>>,
}

impl RecordingChat {
    pub fn created(&self) -> Vec<CreatedChat> {
        self.created.lock().unwrap().clone()
    }

    pub fn deactivated(&self) -> Vec<Uuid> {
        self.deactivated.lock().unwrap().clone()
    }
}

impl ChatProvisioner for RecordingChat {
    fn create_chat(&self, order_id: Uuid, participants: &[Uuid]) -> Result<Uuid, DomainError> {
        let chat_id = Uuid::new_v4();
        self.created.lock().unwrap().push(CreatedChat {
            chat_id,
            order_id,
            participants: participants.to_vec(),
        });
        Ok(chat_id)
    }

    fn deactivate_chat(&self, chat_id: Uuid) -> Result<(), DomainError> {
        self.deactivated.lock().unwrap().push(chat_id);
        Ok(())
    }
}

// ── Gateway ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct FakeGateway {
    counter: Arc<AtomicU64>,
    created: Arc<Mutex<Vec<(i64, String)>>>,
}

impl FakeGateway {
    pub fn created(&self) -> Vec<(i64, String)> {
        self.created.lock().unwrap().clone()
    }
}

impl PaymentGatewayClient for FakeGateway {
    fn create_payment_order(
        &self,
        amount_minor_units: i64,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewaySession, DomainError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.created
            .lock()
            .unwrap()
            .push((amount_minor_units, currency.to_string()));
        Ok(GatewaySession {
            gateway_order_id: format!("gw_order_{n}"),
            client_token: "key_test".to_string(),
        })
    }
}

// ── Wired-up test engine ─────────────────────────────────────────────────────

pub type TestOrchestrator = SideEffectOrchestrator<
    InMemoryOrders,
    InMemoryCatalog,
    InMemoryUsers,
    RecordingNotifications,
    RecordingEmail,
    RecordingChat,
>;

pub type TestEngine = StateTransitionEngine<
    InMemoryOrders,
    InMemoryCatalog,
    InMemoryUsers,
    FakeGateway,
    TestOrchestrator,
>;

pub struct TestContext {
    pub engine: TestEngine,
    pub orders: InMemoryOrders,
    pub catalog: InMemoryCatalog,
    pub users: InMemoryUsers,
    pub notifications: RecordingNotifications,
    pub email: RecordingEmail,
    pub chat: RecordingChat,
    pub gateway: FakeGateway,
}

impl TestContext {
    pub fn new() -> Self {
        let orders = InMemoryOrders::default();
        let catalog = InMemoryCatalog::default();
        let users = InMemoryUsers::default();
        let notifications = RecordingNotifications::default();
        let email = RecordingEmail::default();
        let chat = RecordingChat::default();
        let gateway = FakeGateway::default();

        let orchestrator = SideEffectOrchestrator::new(
            orders.clone(),
            catalog.clone(),
            users.clone(),
            notifications.clone(),
            email.clone(),
            chat.clone(),
        );
        let payments = PaymentGatewayAdapter::new(gateway.clone(), GATEWAY_SECRET, "INR");
        let engine = StateTransitionEngine::new(
            orders.clone(),
            catalog.clone(),
            users.clone(),
            payments,
            orchestrator,
            BigDecimal::from(0),
        );

        TestContext {
            engine,
            orders,
            catalog,
            users,
            notifications,
            email,
            chat,
            gateway,
        }
    }
}
