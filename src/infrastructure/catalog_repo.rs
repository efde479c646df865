use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Catalog, CourseSnapshot, ProductSnapshot};
use crate::schema::{courses, products};

#[derive(Clone)]
pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Catalog for DieselCatalog {
    fn product(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .filter(products::id.eq(id))
            .select((products::id, products::name, products::price, products::stock))
            .first::<(Uuid, String, bigdecimal::BigDecimal, i32)>(&mut conn)
            .optional()?;
        Ok(row.map(|(id, name, price, stock)| ProductSnapshot {
            id,
            name,
            price,
            stock,
        }))
    }

    fn course(&self, id: Uuid) -> Result<Option<CourseSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = courses::table
            .filter(courses::id.eq(id))
            .select((courses::id, courses::title, courses::price))
            .first::<(Uuid, String, bigdecimal::BigDecimal)>(&mut conn)
            .optional()?;
        Ok(row.map(|(id, title, price)| CourseSnapshot { id, title, price }))
    }

    fn decrement_stock(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        // The stock floor is enforced in the update itself so a concurrent
        // decrement can never drive the count negative.
        let updated = diesel::update(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::stock.ge(quantity)),
        )
        .set(products::stock.eq(products::stock - quantity))
        .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::Internal(format!(
                "stock decrement of {quantity} failed for product {product_id}"
            )));
        }
        Ok(())
    }
}
