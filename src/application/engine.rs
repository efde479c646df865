use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CatalogRef, Order, OrderEvent, OrderItem, OrderStatus};
use crate::domain::ports::{
    Catalog, EffectDispatcher, EffectTask, ListResult, OrderRepository, PaymentGatewayClient,
    UserStore,
};

use super::access::AccessProvisioningService;
use super::payment::{self, PaymentGatewayAdapter};

/// One requested line of a new order.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub catalog_ref: CatalogRef,
    pub quantity: i32,
}

/// Everything the client needs to complete a freshly initiated payment.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub order: Order,
    pub gateway_order_id: String,
    pub client_token: String,
    pub amount_minor_units: i64,
    pub currency: String,
}

/// Owns every write to an order's status.
///
/// Each operation loads the aggregate, applies the pure transition rules,
/// persists the result guarded by the status it was computed from, runs the
/// access grant where the transition calls for it, and hands the committed
/// change to the side-effect dispatcher. Errors leave the order untouched.
#[derive(Clone)]
pub struct StateTransitionEngine<R, C, S, G, D> {
    repo: R,
    catalog: C,
    users: S,
    payments: PaymentGatewayAdapter<G>,
    access: AccessProvisioningService<S>,
    effects: D,
    shipping_fee: BigDecimal,
}

impl<R, C, S, G, D> StateTransitionEngine<R, C, S, G, D>
where
    R: OrderRepository,
    C: Catalog,
    S: UserStore + Clone,
    G: PaymentGatewayClient,
    D: EffectDispatcher,
{
    pub fn new(
        repo: R,
        catalog: C,
        users: S,
        payments: PaymentGatewayAdapter<G>,
        effects: D,
        shipping_fee: BigDecimal,
    ) -> Self {
        let access = AccessProvisioningService::new(users.clone());
        StateTransitionEngine {
            repo,
            catalog,
            users,
            payments,
            access,
            effects,
            shipping_fee,
        }
    }

    // ── Checkout ─────────────────────────────────────────────────────────────

    /// Create an order in `pending_approval`, snapshotting catalog prices so
    /// later catalog changes never touch it.
    pub fn create_order(
        &self,
        user_id: Uuid,
        lines: Vec<NewOrderLine>,
        customization_required: bool,
        payment_method: Option<String>,
        delivery_info: Option<serde_json::Value>,
    ) -> Result<Order, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::PreconditionFailed(
                "an order needs at least one line item".to_string(),
            ));
        }
        if self.users.find_user(user_id)?.is_none() {
            return Err(DomainError::PreconditionFailed(format!(
                "unknown user {user_id}"
            )));
        }

        let mut original_price = BigDecimal::from(0);
        let mut priced_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            if line.quantity < 1 {
                return Err(DomainError::PreconditionFailed(
                    "line quantity must be at least 1".to_string(),
                ));
            }
            let unit_price = match line.catalog_ref {
                CatalogRef::Product(id) => {
                    let product = self.catalog.product(id)?.ok_or_else(|| {
                        DomainError::PreconditionFailed(format!("unknown product {id}"))
                    })?;
                    if product.stock < line.quantity {
                        return Err(DomainError::PreconditionFailed(format!(
                            "product '{}' has only {} in stock",
                            product.name, product.stock
                        )));
                    }
                    product.price
                }
                CatalogRef::Course(id) => self
                    .catalog
                    .course(id)?
                    .ok_or_else(|| {
                        DomainError::PreconditionFailed(format!("unknown course {id}"))
                    })?
                    .price,
            };
            original_price += &unit_price * BigDecimal::from(line.quantity);
            priced_lines.push((line.catalog_ref, line.quantity, unit_price));
        }

        let is_course_purchase = lines[0].catalog_ref.is_course();
        if lines.iter().any(|l| l.catalog_ref.is_course() != is_course_purchase) {
            return Err(DomainError::PreconditionFailed(
                "an order cannot mix products and courses".to_string(),
            ));
        }
        if customization_required && is_course_purchase {
            return Err(DomainError::PreconditionFailed(
                "customization applies to physical orders only".to_string(),
            ));
        }

        let shipping_fee = if is_course_purchase {
            BigDecimal::from(0)
        } else {
            self.shipping_fee.clone()
        };
        let order = Order::create(
            user_id,
            is_course_purchase,
            customization_required,
            original_price,
            shipping_fee,
            payment_method,
            delivery_info,
        );
        let items: Vec<OrderItem> = priced_lines
            .into_iter()
            .map(|(catalog_ref, quantity, unit_price)| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                catalog_ref,
                quantity,
                unit_price,
            })
            .collect();

        self.repo.insert(&order, &items)?;
        self.effects.dispatch(EffectTask {
            order: order.clone(),
            items,
            event: OrderEvent::Created,
        });
        Ok(order)
    }

    // ── Admin review ─────────────────────────────────────────────────────────

    pub fn approve(
        &self,
        order_id: Uuid,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> Result<Order, DomainError> {
        let (order, event) = self.transition(order_id, |o| o.approve(admin_id, notes))?;
        let items = self.repo.items(order_id)?;
        if order.status == OrderStatus::Completed {
            // Already-paid course order: approval is its terminal success.
            self.access.provision(&order, &items)?;
        }
        self.dispatch(order.clone(), items, event);
        Ok(order)
    }

    pub fn reject(
        &self,
        order_id: Uuid,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> Result<Order, DomainError> {
        let (order, event) = self.transition(order_id, |o| o.reject(admin_id, notes))?;
        let items = self.repo.items(order_id)?;
        self.dispatch(order.clone(), items, event);
        Ok(order)
    }

    pub fn request_customization_payment(
        &self,
        order_id: Uuid,
        price: BigDecimal,
    ) -> Result<Order, DomainError> {
        let (order, event) = self.transition(order_id, |o| o.set_customization_price(price))?;
        let items = self.repo.items(order_id)?;
        self.dispatch(order.clone(), items, event);
        Ok(order)
    }

    pub fn advance_fulfillment(
        &self,
        order_id: Uuid,
        to: OrderStatus,
    ) -> Result<Order, DomainError> {
        let (order, event) = self.transition(order_id, |o| o.advance_fulfillment(to))?;
        let items = self.repo.items(order_id)?;
        self.dispatch(order.clone(), items, event);
        Ok(order)
    }

    pub fn send_delivery_reminder(&self, order_id: Uuid) -> Result<Order, DomainError> {
        let (order, event) = self.transition(order_id, |o| o.mark_delivery_reminder_sent())?;
        let items = self.repo.items(order_id)?;
        self.dispatch(order.clone(), items, event);
        Ok(order)
    }

    // ── Payments ─────────────────────────────────────────────────────────────

    /// Open a gateway payment session for the order's current total.
    pub fn initiate_payment(&self, order_id: Uuid) -> Result<PaymentSession, DomainError> {
        let mut order = self.repo.find(order_id)?.ok_or(DomainError::OrderNotFound)?;
        let session = self.payments.initiate(&order)?;

        let expected = order.status;
        let event = order.note_payment_initiated(session.gateway_order_id.clone())?;
        if !self.repo.apply_transition(expected, &order, &event)? {
            return Err(DomainError::Conflict);
        }
        let items = self.repo.items(order_id)?;
        let amount_minor_units = payment::to_minor_units(&order.total_amount)?;
        self.dispatch(order.clone(), items, event);
        Ok(PaymentSession {
            order,
            gateway_order_id: session.gateway_order_id,
            client_token: session.client_token,
            amount_minor_units,
            currency: self.payments.currency().to_string(),
        })
    }

    /// Apply a gateway payment confirmation.
    ///
    /// Signature verification happens before any state is considered.
    /// Redelivery of an identical confirmation is a no-op returning the
    /// already-settled order, so access is granted and stock decremented at
    /// most once per order.
    pub fn confirm_payment(
        &self,
        gateway_order_id: &str,
        payment_id: String,
        signature: &str,
    ) -> Result<Order, DomainError> {
        let mut order = self
            .repo
            .find_by_gateway_order_id(gateway_order_id)?
            .ok_or(DomainError::OrderNotFound)?;
        self.payments.verify(gateway_order_id, &payment_id, signature)?;

        if order.status.is_settled() {
            return Ok(order);
        }

        let expected = order.status;
        let event = order.confirm_payment(payment_id)?;
        if !self.repo.apply_transition(expected, &order, &event)? {
            // Lost the race. If the winner settled the order this is just a
            // redelivery; anything else is a genuine conflict.
            let current = self.repo.find(order.id)?.ok_or(DomainError::OrderNotFound)?;
            if current.status.is_settled() {
                return Ok(current);
            }
            return Err(DomainError::Conflict);
        }

        let items = self.repo.items(order.id)?;
        if order.is_course_purchase {
            self.access.provision(&order, &items)?;
        }
        self.dispatch(order.clone(), items, event);
        Ok(order)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn get_order(&self, order_id: Uuid) -> Result<(Order, Vec<OrderItem>), DomainError> {
        let order = self.repo.find(order_id)?.ok_or(DomainError::OrderNotFound)?;
        let items = self.repo.items(order_id)?;
        Ok((order, items))
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.repo.list(page, limit)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    /// load → pure transition → compare-and-set persist.
    fn transition<F>(&self, order_id: Uuid, apply: F) -> Result<(Order, OrderEvent), DomainError>
    where
        F: FnOnce(&mut Order) -> Result<OrderEvent, DomainError>,
    {
        let mut order = self.repo.find(order_id)?.ok_or(DomainError::OrderNotFound)?;
        let expected = order.status;
        let event = apply(&mut order)?;
        if !self.repo.apply_transition(expected, &order, &event)? {
            return Err(DomainError::Conflict);
        }
        Ok((order, event))
    }

    fn dispatch(&self, order: Order, items: Vec<OrderItem>, event: OrderEvent) {
        self.effects.dispatch(EffectTask { order, items, event });
    }
}
