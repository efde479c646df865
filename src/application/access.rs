use chrono::Utc;

use crate::domain::access::AccessGrant;
use crate::domain::errors::DomainError;
use crate::domain::order::{CatalogRef, Order, OrderItem};
use crate::domain::ports::UserStore;

/// Grants (or renews) course access when a course order reaches its terminal
/// success transition.
///
/// Exactly-once semantics come from the caller: the engine invokes this only
/// after winning the status compare-and-set for the settling transition, so a
/// redelivered payment confirmation never reaches this code twice.
#[derive(Clone)]
pub struct AccessProvisioningService<S> {
    users: S,
}

impl<S: UserStore> AccessProvisioningService<S> {
    pub fn new(users: S) -> Self {
        AccessProvisioningService { users }
    }

    pub fn provision(&self, order: &Order, items: &[OrderItem]) -> Result<(), DomainError> {
        let now = Utc::now();
        for item in items {
            let CatalogRef::Course(course_id) = item.catalog_ref else {
                continue;
            };
            let mut grant = AccessGrant::new(order.user_id, course_id, now);
            if let Some(expiry) = order.course_access_expiry {
                // Keep the grant row and the order's stamped expiry in step.
                grant.access_expiry = expiry;
            }
            self.users.upsert_access_grant(&grant)?;
            self.users.increment_enrollment(course_id)?;
        }
        Ok(())
    }
}
