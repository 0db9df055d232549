use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cart::{CartDecrement, CartLineItem, NewCartLine, ProductKey};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogLookup};

pub struct CartService<C, K> {
    repo: C,
    catalog: K,
}

impl<C: CartRepository, K: CatalogLookup> CartService<C, K> {
    pub fn new(repo: C, catalog: K) -> Self {
        Self { repo, catalog }
    }

    /// Adds one unit of `key`. An existing line is incremented and keeps its
    /// price snapshot; a new line snapshots the catalog as of now.
    pub fn add(&self, user_id: Uuid, key: ProductKey, now: DateTime<Utc>) -> Result<(), DomainError> {
        key.validate()?;
        if self.repo.increment(user_id, &key)? {
            return Ok(());
        }

        let snapshot = self.catalog.get(key.kind, key.product_id)?;
        // A concurrent add may have inserted the row since `increment`; the
        // upsert folds this unit into it instead of duplicating the line.
        self.repo.upsert(NewCartLine {
            user_id,
            key,
            snapshot,
            quantity: 1,
            created_at: now,
        })?;
        Ok(())
    }

    /// Adds `quantity` units of each key, snapshotting current catalog
    /// prices for new lines. Every product is looked up before anything is
    /// written, so an unknown product leaves the cart untouched.
    pub fn add_all(
        &self,
        user_id: Uuid,
        lines: Vec<(ProductKey, i32)>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let resolved = lines
            .into_iter()
            .filter(|(_, quantity)| *quantity > 0)
            .map(|(key, quantity)| {
                let snapshot = self.catalog.get(key.kind, key.product_id)?;
                Ok(NewCartLine {
                    user_id,
                    key,
                    snapshot,
                    quantity,
                    created_at: now,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        for line in resolved {
            self.repo.upsert(line)?;
        }
        Ok(())
    }

    /// Takes one unit off `key`; removing the last unit deletes the line.
    /// Missing lines are not an error.
    pub fn subtract(&self, user_id: Uuid, key: &ProductKey) -> Result<CartDecrement, DomainError> {
        self.repo.decrement(user_id, key)
    }

    pub fn list(&self, user_id: Uuid) -> Result<Vec<CartLineItem>, DomainError> {
        self.repo.list(user_id)
    }

    pub fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        let removed = self.repo.clear(user_id)?;
        log::debug!("cleared {} cart line(s) for user {}", removed, user_id);
        Ok(())
    }
}
