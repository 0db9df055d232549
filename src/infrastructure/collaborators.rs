//! Adapters for the collaborators the order core reads from or signals to
//! but does not own: the catalog, the address book, and staff notifications.

use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::ProductSnapshot;
use crate::domain::errors::DomainError;
use crate::domain::order::AddressSnapshot;
use crate::domain::ports::{AddressValidator, CatalogLookup, NotificationKind, NotificationSink};
use crate::schema::{address_book, dish, order_outbox, setmeal};

use super::models::{AddressRow, DishRow, NewOutboxEventRow, SetmealRow};

pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogLookup for DieselCatalog {
    fn get_dish(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = dish::table
            .find(id)
            .select(DishRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|d| ProductSnapshot {
            name: d.name,
            image: d.image,
            price: d.price,
        }))
    }

    fn get_combo(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = setmeal::table
            .find(id)
            .select(SetmealRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|s| ProductSnapshot {
            name: s.name,
            image: s.image,
            price: s.price,
        }))
    }
}

pub struct DieselAddressBook {
    pool: DbPool,
}

impl DieselAddressBook {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AddressValidator for DieselAddressBook {
    fn resolve(
        &self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AddressSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = address_book::table
            .filter(address_book::id.eq(address_id))
            .filter(address_book::user_id.eq(user_id))
            .select(AddressRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(AddressSnapshot::from))
    }
}

/// Publishes staff notifications through the outbox table, where CDC picks
/// them up alongside the order lifecycle events.
pub struct OutboxNotifier {
    pool: DbPool,
}

impl OutboxNotifier {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn publish(&self, order_id: Uuid, kind: NotificationKind) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(order_outbox::table)
            .values(&NewOutboxEventRow::order_event(
                order_id,
                kind.event_type(),
                json!({
                    "order_id": order_id,
                    "kind": kind,
                    "at": chrono::Utc::now()
                }),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

impl NotificationSink for OutboxNotifier {
    fn notify(&self, order_id: Uuid, kind: NotificationKind) {
        if let Err(e) = self.publish(order_id, kind) {
            log::warn!("could not publish {:?} for order {}: {}", kind, order_id, e);
        }
    }
}
