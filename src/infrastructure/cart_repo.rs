use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CartDecrement, CartLineItem, NewCartLine, ProductKey};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::shopping_cart;

use super::models::{flavor_column, CartLineRow, NewCartLineRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn increment(&self, user_id: Uuid, key: &ProductKey) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(
            shopping_cart::table
                .filter(shopping_cart::user_id.eq(user_id))
                .filter(shopping_cart::product_kind.eq(key.kind.as_str()))
                .filter(shopping_cart::product_id.eq(key.product_id))
                .filter(shopping_cart::dish_flavor.eq(flavor_column(key))),
        )
        .set(shopping_cart::number.eq(shopping_cart::number + 1))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    fn upsert(&self, line: NewCartLine) -> Result<CartLineItem, DomainError> {
        let mut conn = self.pool.get()?;

        let row = NewCartLineRow {
            id: Uuid::new_v4(),
            user_id: line.user_id,
            product_kind: line.key.kind.as_str().to_string(),
            product_id: line.key.product_id,
            dish_flavor: flavor_column(&line.key),
            name: line.snapshot.name,
            image: line.snapshot.image,
            amount: line.snapshot.price,
            number: line.quantity,
            created_at: line.created_at,
        };

        // The unique line key turns a concurrent duplicate insert into an
        // increment of the surviving row; its price snapshot is kept.
        let saved = diesel::insert_into(shopping_cart::table)
            .values(&row)
            .on_conflict((
                shopping_cart::user_id,
                shopping_cart::product_kind,
                shopping_cart::product_id,
                shopping_cart::dish_flavor,
            ))
            .do_update()
            .set(shopping_cart::number.eq(shopping_cart::number + row.number))
            .returning(CartLineRow::as_returning())
            .get_result(&mut conn)?;

        saved.try_into()
    }

    fn decrement(&self, user_id: Uuid, key: &ProductKey) -> Result<CartDecrement, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Row lock so a concurrent add cannot slip between read and write.
            let current: Option<(Uuid, i32)> = shopping_cart::table
                .filter(shopping_cart::user_id.eq(user_id))
                .filter(shopping_cart::product_kind.eq(key.kind.as_str()))
                .filter(shopping_cart::product_id.eq(key.product_id))
                .filter(shopping_cart::dish_flavor.eq(flavor_column(key)))
                .select((shopping_cart::id, shopping_cart::number))
                .for_update()
                .first(conn)
                .optional()?;

            match current {
                None => Ok(CartDecrement::Missing),
                Some((id, number)) if number > 1 => {
                    diesel::update(shopping_cart::table.find(id))
                        .set(shopping_cart::number.eq(number - 1))
                        .execute(conn)?;
                    Ok(CartDecrement::Decremented {
                        remaining: number - 1,
                    })
                }
                Some((id, _)) => {
                    diesel::delete(shopping_cart::table.find(id)).execute(conn)?;
                    Ok(CartDecrement::Removed)
                }
            }
        })
    }

    fn list(&self, user_id: Uuid) -> Result<Vec<CartLineItem>, DomainError> {
        let mut conn = self.pool.get()?;

        shopping_cart::table
            .filter(shopping_cart::user_id.eq(user_id))
            .order(shopping_cart::created_at.asc())
            .select(CartLineRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(CartLineItem::try_from)
            .collect()
    }

    fn clear(&self, user_id: Uuid) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(shopping_cart::table.filter(shopping_cart::user_id.eq(user_id)))
            .execute(&mut conn)?;
        Ok(deleted)
    }
}
