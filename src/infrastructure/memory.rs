//! In-memory implementations of every port.
//!
//! Carts and orders share one lock so that [`OrderRepository::place`] drains
//! the cart in the same critical section that writes the order, mirroring
//! the database transaction of the Diesel adapters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cart::{
    CartDecrement, CartLineItem, NewCartLine, ProductKey, ProductKind, ProductSnapshot,
};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    AddressSnapshot, ListResult, Order, OrderDraft, OrderItem, OrderSearch, OrderView, PageRequest,
};
use crate::domain::ports::{
    AddressValidator, CartRepository, CatalogLookup, NotificationKind, NotificationSink,
    OrderRepository,
};
use crate::domain::state_machine::{OrderStatus, StatusChange};

#[derive(Default)]
struct State {
    cart: Vec<CartLineItem>,
    orders: HashMap<Uuid, Order>,
    items: HashMap<Uuid, Vec<OrderItem>>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: moves an order's submission time, e.g. into the past.
    pub fn backdate(&self, order_id: Uuid, order_time: DateTime<Utc>) -> Result<(), DomainError> {
        let mut state = self.state.lock()?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(DomainError::OrderNotFound)?;
        order.order_time = order_time;
        Ok(())
    }
}

impl CartRepository for InMemoryStore {
    fn increment(&self, user_id: Uuid, key: &ProductKey) -> Result<bool, DomainError> {
        let mut state = self.state.lock()?;
        match state
            .cart
            .iter_mut()
            .find(|l| l.user_id == user_id && &l.key == key)
        {
            Some(line) => {
                line.quantity += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn upsert(&self, line: NewCartLine) -> Result<CartLineItem, DomainError> {
        let mut state = self.state.lock()?;
        if let Some(existing) = state
            .cart
            .iter_mut()
            .find(|l| l.user_id == line.user_id && l.key == line.key)
        {
            existing.quantity += line.quantity;
            return Ok(existing.clone());
        }
        let created = CartLineItem {
            id: Uuid::new_v4(),
            user_id: line.user_id,
            key: line.key,
            name: line.snapshot.name,
            image: line.snapshot.image,
            unit_price: line.snapshot.price,
            quantity: line.quantity,
            created_at: line.created_at,
        };
        state.cart.push(created.clone());
        Ok(created)
    }

    fn decrement(&self, user_id: Uuid, key: &ProductKey) -> Result<CartDecrement, DomainError> {
        let mut state = self.state.lock()?;
        let Some(pos) = state
            .cart
            .iter()
            .position(|l| l.user_id == user_id && &l.key == key)
        else {
            return Ok(CartDecrement::Missing);
        };
        if state.cart[pos].quantity > 1 {
            state.cart[pos].quantity -= 1;
            Ok(CartDecrement::Decremented {
                remaining: state.cart[pos].quantity,
            })
        } else {
            state.cart.remove(pos);
            Ok(CartDecrement::Removed)
        }
    }

    fn list(&self, user_id: Uuid) -> Result<Vec<CartLineItem>, DomainError> {
        let state = self.state.lock()?;
        Ok(state
            .cart
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    fn clear(&self, user_id: Uuid) -> Result<usize, DomainError> {
        let mut state = self.state.lock()?;
        let before = state.cart.len();
        state.cart.retain(|l| l.user_id != user_id);
        Ok(before - state.cart.len())
    }
}

impl OrderRepository for InMemoryStore {
    fn place(&self, draft: OrderDraft, consumed: &[CartLineItem]) -> Result<Order, DomainError> {
        let mut state = self.state.lock()?;
        let unchanged = consumed.iter().all(|c| {
            state
                .cart
                .iter()
                .any(|l| l.id == c.id && l.quantity == c.quantity)
        });
        if !unchanged {
            return Err(DomainError::CartChanged);
        }
        if state.orders.values().any(|o| o.number == draft.order.number) {
            return Err(DomainError::Internal(format!(
                "duplicate order number {}",
                draft.order.number
            )));
        }

        state.cart.retain(|l| !consumed.iter().any(|c| c.id == l.id));
        let order = draft.order;
        state.items.insert(order.id, draft.items);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let state = self.state.lock()?;
        Ok(state.orders.get(&id).map(|order| OrderView {
            order: order.clone(),
            items: state.items.get(&id).cloned().unwrap_or_default(),
        }))
    }

    fn find_by_number(&self, number: &str) -> Result<Option<Order>, DomainError> {
        let state = self.state.lock()?;
        Ok(state.orders.values().find(|o| o.number == number).cloned())
    }

    fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        change: &StatusChange,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock()?;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != expected {
            return Ok(false);
        }
        order.status = change.to;
        if let Some(pay_status) = change.pay_status {
            order.pay_status = pay_status;
        }
        if change.checkout_time.is_some() {
            order.checkout_time = change.checkout_time;
        }
        if change.transaction_id.is_some() {
            order.transaction_id = change.transaction_id.clone();
        }
        if change.cancel_reason.is_some() {
            order.cancel_reason = change.cancel_reason.clone();
        }
        if change.cancel_time.is_some() {
            order.cancel_time = change.cancel_time;
        }
        if change.rejection_reason.is_some() {
            order.rejection_reason = change.rejection_reason.clone();
        }
        if change.delivery_time.is_some() {
            order.delivery_time = change.delivery_time;
        }
        Ok(true)
    }

    fn search(&self, filter: &OrderSearch, page: PageRequest) -> Result<ListResult, DomainError> {
        let state = self.state.lock()?;
        let mut matching: Vec<&Order> = state.orders.values().filter(|o| filter.matches(o)).collect();
        matching.sort_by(|a, b| b.order_time.cmp(&a.order_time));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.page_size).unwrap_or(0))
            .map(|order| OrderView {
                order: order.clone(),
                items: state.items.get(&order.id).cloned().unwrap_or_default(),
            })
            .collect();
        Ok(ListResult { items, total })
    }

    fn find_submitted_before(
        &self,
        status: OrderStatus,
        before: DateTime<Utc>,
    ) -> Result<Vec<Order>, DomainError> {
        let state = self.state.lock()?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.status == status && o.order_time < before)
            .cloned()
            .collect())
    }

    fn count_by_status(&self, status: OrderStatus) -> Result<i64, DomainError> {
        let state = self.state.lock()?;
        Ok(state.orders.values().filter(|o| o.status == status).count() as i64)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<Mutex<HashMap<(ProductKind, Uuid), ProductSnapshot>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product, e.g. to simulate a price change.
    pub fn put(&self, kind: ProductKind, id: Uuid, snapshot: ProductSnapshot) {
        if let Ok(mut products) = self.products.lock() {
            products.insert((kind, id), snapshot);
        }
    }

    pub fn remove(&self, kind: ProductKind, id: Uuid) {
        if let Ok(mut products) = self.products.lock() {
            products.remove(&(kind, id));
        }
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn get_dish(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        let products = self.products.lock()?;
        Ok(products
            .get(&(ProductKind::Dish, id))
            .cloned())
    }

    fn get_combo(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        let products = self.products.lock()?;
        Ok(products
            .get(&(ProductKind::Setmeal, id))
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAddressBook {
    entries: Arc<Mutex<HashMap<Uuid, (Uuid, AddressSnapshot)>>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an address for `user_id` and returns its id.
    pub fn add(&self, user_id: Uuid, consignee: &str, phone: &str, detail: &str) -> Uuid {
        let id = Uuid::new_v4();
        let snapshot = AddressSnapshot {
            address_book_id: id,
            consignee: consignee.to_string(),
            phone: phone.to_string(),
            detail: detail.to_string(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(id, (user_id, snapshot));
        }
        id
    }
}

impl AddressValidator for InMemoryAddressBook {
    fn resolve(
        &self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AddressSnapshot>, DomainError> {
        let entries = self.entries.lock()?;
        Ok(entries
            .get(&address_id)
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, snapshot)| snapshot.clone()))
    }
}

/// Keeps every notification it receives, in order.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(Uuid, NotificationKind)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Uuid, NotificationKind)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self, order_id: Uuid, kind: NotificationKind) -> usize {
        self.sent()
            .iter()
            .filter(|(id, k)| *id == order_id && *k == kind)
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, order_id: Uuid, kind: NotificationKind) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((order_id, kind));
        }
    }
}
