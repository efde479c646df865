use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// How long a course purchase stays accessible.
pub const ACCESS_PERIOD_DAYS: i64 = 365;

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(ACCESS_PERIOD_DAYS)
}

/// One grant per `(user, course)` pair. A re-purchase renews the grant in
/// place instead of adding a second row.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub access_expiry: DateTime<Utc>,
}

impl AccessGrant {
    pub fn new(user_id: Uuid, course_id: Uuid, now: DateTime<Utc>) -> Self {
        AccessGrant {
            user_id,
            course_id,
            purchase_date: now,
            access_expiry: expiry_from(now),
        }
    }

    /// Extend the expiry and refresh the purchase date on re-purchase.
    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.purchase_date = now;
        self.access_expiry = expiry_from(now);
    }
}
