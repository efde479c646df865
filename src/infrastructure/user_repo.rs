use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::access::AccessGrant;
use crate::domain::errors::DomainError;
use crate::domain::ports::{UserRef, UserStore};
use crate::schema::{course_access_grants, courses, users};

use super::models::NewAccessGrantRow;

#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserStore for DieselUserStore {
    fn find_user(&self, id: Uuid) -> Result<Option<UserRef>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .filter(users::id.eq(id))
            .select((users::id, users::name, users::email))
            .first::<(Uuid, String, String)>(&mut conn)
            .optional()?;
        Ok(row.map(|(id, name, email)| UserRef { id, name, email }))
    }

    fn upsert_access_grant(&self, grant: &AccessGrant) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        // One row per (user, course): a re-purchase renews the existing grant
        // instead of inserting a second one.
        diesel::insert_into(course_access_grants::table)
            .values(&NewAccessGrantRow {
                id: Uuid::new_v4(),
                user_id: grant.user_id,
                course_id: grant.course_id,
                purchase_date: grant.purchase_date,
                access_expiry: grant.access_expiry,
            })
            .on_conflict((
                course_access_grants::user_id,
                course_access_grants::course_id,
            ))
            .do_update()
            .set((
                course_access_grants::purchase_date.eq(grant.purchase_date),
                course_access_grants::access_expiry.eq(grant.access_expiry),
                course_access_grants::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn increment_enrollment(&self, course_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(courses::table.filter(courses::id.eq(course_id)))
            .set(courses::enrolled_count.eq(courses::enrolled_count + 1))
            .execute(&mut conn)?;
        Ok(())
    }
}
