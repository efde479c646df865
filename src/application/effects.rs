use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CatalogRef, Order, OrderEvent, OrderStatus};
use crate::domain::ports::{
    Catalog, ChatProvisioner, EffectDispatcher, EffectTask, EmailSink, EmailTemplate,
    NotificationKind, NotificationSink, OrderRepository, UserRole, UserStore,
};

/// Dispatches the notification / email / chat / stock effects of a committed
/// transition.
///
/// Runs strictly after the state mutation is durable. Every effect is
/// isolated: a failure is logged and swallowed, the remaining effects still
/// run, and the order status is never rolled back because of one.
#[derive(Clone)]
pub struct SideEffectOrchestrator<R, C, S, N, M, H> {
    repo: R,
    catalog: C,
    users: S,
    notifications: N,
    email: M,
    chat: H,
}

impl<R, C, S, N, M, H> SideEffectOrchestrator<R, C, S, N, M, H>
where
    R: OrderRepository,
    C: Catalog,
    S: UserStore,
    N: NotificationSink,
    M: EmailSink,
    H: ChatProvisioner,
{
    pub fn new(repo: R, catalog: C, users: S, notifications: N, email: M, chat: H) -> Self {
        SideEffectOrchestrator {
            repo,
            catalog,
            users,
            notifications,
            email,
            chat,
        }
    }

    /// Execute every effect owed for one committed transition.
    pub fn run(&self, task: &EffectTask) {
        let order = &task.order;
        match &task.event {
            OrderEvent::Created => {
                self.guard(order.id, "owner notification", || {
                    self.notifications.notify(
                        order.user_id,
                        NotificationKind::OrderPlaced,
                        "Order placed",
                        "Your order is awaiting review.",
                        Some(order.id),
                    )
                });
                self.guard(order.id, "admin broadcast", || {
                    self.notifications.notify_role(
                        UserRole::Admin,
                        NotificationKind::OrderPlaced,
                        "New order",
                        "A new order is awaiting approval.",
                        Some(order.id),
                    )
                });
                self.email_owner(order, EmailTemplate::OrderPlaced);
            }
            OrderEvent::Approved { admin_id } => match order.status {
                OrderStatus::CustomizationPending => {
                    self.open_customization_chat(order, *admin_id);
                    self.guard(order.id, "owner notification", || {
                        self.notifications.notify(
                            order.user_id,
                            NotificationKind::OrderApproved,
                            "Order approved",
                            "Your order was approved; customization details will be discussed in chat.",
                            Some(order.id),
                        )
                    });
                    self.email_owner(order, EmailTemplate::OrderApproved);
                }
                OrderStatus::Completed => {
                    // Approval of an already-paid course order: access was
                    // granted by the engine, announce it.
                    self.announce_course_access(order);
                }
                _ => {
                    self.guard(order.id, "owner notification", || {
                        self.notifications.notify(
                            order.user_id,
                            NotificationKind::OrderApproved,
                            "Order approved",
                            "Your order was approved and is ready for payment.",
                            Some(order.id),
                        )
                    });
                    self.email_owner(order, EmailTemplate::OrderApproved);
                }
            },
            OrderEvent::Rejected { .. } => {
                if let Some(chat_id) = order.chat_id {
                    self.guard(order.id, "chat deactivation", || {
                        self.chat.deactivate_chat(chat_id)
                    });
                }
                self.guard(order.id, "owner notification", || {
                    self.notifications.notify(
                        order.user_id,
                        NotificationKind::OrderRejected,
                        "Order rejected",
                        order.admin_notes.as_deref().unwrap_or("Your order was rejected."),
                        Some(order.id),
                    )
                });
                self.email_owner(order, EmailTemplate::OrderRejected);
            }
            OrderEvent::CustomizationPriceSet => {
                self.guard(order.id, "owner notification", || {
                    self.notifications.notify(
                        order.user_id,
                        NotificationKind::PaymentRequested,
                        "Customization quote ready",
                        "The customization price was set; your order is ready for payment.",
                        Some(order.id),
                    )
                });
                self.email_owner(order, EmailTemplate::CustomizationQuote);
            }
            OrderEvent::PaymentInitiated => {
                log::debug!("order {}: payment session opened", order.id);
            }
            OrderEvent::PaymentConfirmed => {
                // Stock is held only against paid orders, so the decrement
                // happens here and not at creation.
                for item in &task.items {
                    if let CatalogRef::Product(product_id) = item.catalog_ref {
                        self.guard(order.id, "stock decrement", || {
                            self.catalog.decrement_stock(product_id, item.quantity)
                        });
                    }
                }
                self.guard(order.id, "owner notification", || {
                    self.notifications.notify(
                        order.user_id,
                        NotificationKind::PaymentReceived,
                        "Payment received",
                        "Your payment was confirmed.",
                        Some(order.id),
                    )
                });
                self.email_owner(order, EmailTemplate::PaymentConfirmation);
                if order.is_course_purchase {
                    self.announce_course_access(order);
                }
            }
            OrderEvent::FulfillmentAdvanced { to } => {
                if matches!(to, OrderStatus::Delivered | OrderStatus::Completed) {
                    if let Some(chat_id) = order.chat_id {
                        self.guard(order.id, "chat deactivation", || {
                            self.chat.deactivate_chat(chat_id)
                        });
                    }
                }
                self.guard(order.id, "owner notification", || {
                    self.notifications.notify(
                        order.user_id,
                        NotificationKind::DeliveryUpdate,
                        "Order update",
                        &format!("Your order is now '{to}'."),
                        Some(order.id),
                    )
                });
                if *to == OrderStatus::Delivered {
                    self.email_owner(order, EmailTemplate::DeliveryUpdate);
                }
            }
            OrderEvent::DeliveryReminderSent => {
                self.guard(order.id, "owner notification", || {
                    self.notifications.notify(
                        order.user_id,
                        NotificationKind::DeliveryReminder,
                        "Delivery reminder",
                        "Your order is ready for delivery.",
                        Some(order.id),
                    )
                });
                self.email_owner(order, EmailTemplate::DeliveryReminder);
            }
        }
    }

    /// Chat provisioning for a customization order: owner plus the approving
    /// admin. If creation fails the approval stands; the chat can be
    /// recreated lazily on first access.
    fn open_customization_chat(&self, order: &Order, admin_id: Uuid) {
        let chat_id = match self.chat.create_chat(order.id, &[order.user_id, admin_id]) {
            Ok(chat_id) => chat_id,
            Err(e) => {
                log::warn!("order {}: chat creation failed: {e}", order.id);
                return;
            }
        };
        self.guard(order.id, "chat id backfill", || {
            self.repo.attach_chat(order.id, chat_id)
        });
    }

    fn announce_course_access(&self, order: &Order) {
        self.guard(order.id, "owner notification", || {
            self.notifications.notify(
                order.user_id,
                NotificationKind::CourseAccess,
                "Course access granted",
                "Your course is now available in your library.",
                Some(order.id),
            )
        });
        self.email_owner(order, EmailTemplate::CourseAccess);
    }

    fn email_owner(&self, order: &Order, template: EmailTemplate) {
        let recipient = match self.users.find_user(order.user_id) {
            Ok(Some(user)) => user.email,
            Ok(None) => {
                log::warn!("order {}: owner {} not found, skipping email", order.id, order.user_id);
                return;
            }
            Err(e) => {
                log::warn!("order {}: owner lookup failed: {e}", order.id);
                return;
            }
        };
        let context = order_context(order);
        self.guard(order.id, template.name(), || {
            self.email.send(template, &recipient, &context)
        });
    }

    fn guard(&self, order_id: Uuid, effect: &str, run: impl FnOnce() -> Result<(), DomainError>) {
        if let Err(e) = run() {
            log::warn!("order {order_id}: side effect '{effect}' failed: {e}");
        }
    }
}

impl<R, C, S, N, M, H> EffectDispatcher for SideEffectOrchestrator<R, C, S, N, M, H>
where
    R: OrderRepository,
    C: Catalog,
    S: UserStore,
    N: NotificationSink,
    M: EmailSink,
    H: ChatProvisioner,
{
    fn dispatch(&self, task: EffectTask) {
        self.run(&task);
    }
}

/// Snapshot handed to email templates.
pub fn order_context(order: &Order) -> Value {
    json!({
        "order_id": order.id,
        "status": order.status.as_str(),
        "is_course_purchase": order.is_course_purchase,
        "original_price": order.original_price.to_string(),
        "customization_price": order.customization_price.as_ref().map(|p| p.to_string()),
        "shipping_fee": order.shipping_fee.to_string(),
        "total_amount": order.total_amount.to_string(),
        "course_access_expiry": order.course_access_expiry.map(|t| t.to_rfc3339()),
        "created_at": order.created_at.to_rfc3339(),
    })
}
