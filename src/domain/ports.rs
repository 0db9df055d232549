use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::cart::{CartDecrement, CartLineItem, NewCartLine, ProductKey, ProductKind, ProductSnapshot};
use super::errors::DomainError;
use super::order::{
    AddressSnapshot, ListResult, Order, OrderDraft, OrderSearch, OrderView, PageRequest,
};
use super::state_machine::{OrderStatus, StatusChange};

pub trait CartRepository: Send + Sync + 'static {
    /// Adds one unit to an existing line. Returns `false` when the user has no
    /// line for `key`; nothing is written in that case.
    fn increment(&self, user_id: Uuid, key: &ProductKey) -> Result<bool, DomainError>;
    /// Inserts the line, or adds its quantity to the row already holding the
    /// same key. Must be atomic against concurrent upserts of the same key.
    fn upsert(&self, line: NewCartLine) -> Result<CartLineItem, DomainError>;
    fn decrement(&self, user_id: Uuid, key: &ProductKey) -> Result<CartDecrement, DomainError>;
    fn list(&self, user_id: Uuid) -> Result<Vec<CartLineItem>, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<usize, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Writes the order and its items and deletes the `consumed` cart lines,
    /// all or nothing. Fails with `CartChanged` if any consumed line no longer
    /// exists with the same quantity.
    fn place(&self, draft: OrderDraft, consumed: &[CartLineItem]) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn find_by_number(&self, number: &str) -> Result<Option<Order>, DomainError>;
    /// Applies `change` only if the order is still in `expected`. Returns
    /// whether the row was updated.
    fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        change: &StatusChange,
    ) -> Result<bool, DomainError>;
    /// Newest first.
    fn search(&self, filter: &OrderSearch, page: PageRequest) -> Result<ListResult, DomainError>;
    fn find_submitted_before(
        &self,
        status: OrderStatus,
        before: DateTime<Utc>,
    ) -> Result<Vec<Order>, DomainError>;
    fn count_by_status(&self, status: OrderStatus) -> Result<i64, DomainError>;
}

pub trait CatalogLookup: Send + Sync + 'static {
    fn get_dish(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError>;
    fn get_combo(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError>;

    fn get(&self, kind: ProductKind, id: Uuid) -> Result<ProductSnapshot, DomainError> {
        let found = match kind {
            ProductKind::Dish => self.get_dish(id)?,
            ProductKind::Setmeal => self.get_combo(id)?,
        };
        found.ok_or(DomainError::ProductNotFound { kind, id })
    }
}

pub trait AddressValidator: Send + Sync + 'static {
    /// The address if it exists and belongs to `user_id`.
    fn resolve(
        &self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AddressSnapshot>, DomainError>;

    fn belongs_to_user(&self, address_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.resolve(address_id, user_id)?.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A paid order is waiting for staff.
    NewOrder,
    /// The customer asked staff to hurry.
    CustomerReminder,
    /// Paid but still unconfirmed past the reminder threshold.
    ConfirmationOverdue,
    /// The customer cancelled an order staff may already be preparing.
    CancelledByCustomer,
}

impl NotificationKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "OrderNewOrder",
            NotificationKind::CustomerReminder => "OrderCustomerReminder",
            NotificationKind::ConfirmationOverdue => "OrderConfirmationOverdue",
            NotificationKind::CancelledByCustomer => "OrderCancelledByCustomer",
        }
    }
}

/// Staff-facing signals. Fire and forget: implementations log their own
/// failures instead of returning them.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, order_id: Uuid, kind: NotificationKind);
}
