use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{NotificationKind, NotificationSink, UserRole};
use crate::schema::{notifications, users};

use super::models::NewNotificationRow;

#[derive(Clone)]
pub struct DieselNotificationSink {
    pool: DbPool,
}

impl DieselNotificationSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NotificationSink for DieselNotificationSink {
    fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(notifications::table)
            .values(&NewNotificationRow {
                id: Uuid::new_v4(),
                user_id,
                kind: kind.as_str().to_string(),
                title: title.to_string(),
                message: message.to_string(),
                related_id,
            })
            .execute(&mut conn)?;
        Ok(())
    }

    fn notify_role(
        &self,
        role: UserRole,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let recipient_ids: Vec<Uuid> = users::table
            .filter(users::role.eq(role.as_str()))
            .select(users::id)
            .load(&mut conn)?;

        let rows: Vec<NewNotificationRow> = recipient_ids
            .into_iter()
            .map(|user_id| NewNotificationRow {
                id: Uuid::new_v4(),
                user_id,
                kind: kind.as_str().to_string(),
                title: title.to_string(),
                message: message.to_string(),
                related_id,
            })
            .collect();
        diesel::insert_into(notifications::table)
            .values(&rows)
            .execute(&mut conn)?;
        Ok(())
    }
}
