use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{bounded_text, Actor, Order};
use crate::domain::ports::{NotificationKind, NotificationSink, OrderRepository};
use crate::domain::state_machine::{OrderEvent, StatusChange};

/// Customer and staff driven status changes.
pub struct OrderService<O, N> {
    orders: O,
    notifier: N,
}

impl<O: OrderRepository, N: NotificationSink> OrderService<O, N> {
    pub fn new(orders: O, notifier: N) -> Self {
        Self { orders, notifier }
    }

    /// Customers may cancel their own orders until staff confirm them; staff
    /// may cancel anything up to dispatch.
    pub fn cancel(
        &self,
        order_id: Uuid,
        by: Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        let order = self.load(order_id)?;
        if !by.may_access(&order) {
            return Err(DomainError::Forbidden);
        }

        let (event, reason) = match by {
            Actor::Customer(_) => (
                OrderEvent::CustomerCancelled,
                bounded_text("cancellation reason", reason)?
                    .unwrap_or_else(|| "Cancelled by customer".to_string()),
            ),
            Actor::Staff(_) => (
                OrderEvent::StaffCancelled,
                bounded_text("cancellation reason", reason)?.ok_or_else(|| {
                    DomainError::InvalidInput("cancellation reason is required".to_string())
                })?,
            ),
        };

        let change = StatusChange::plan(order.status, order.pay_status, event, now)?
            .with_cancel_reason(reason);
        let cancelled = self.apply(order, change)?;

        if event == OrderEvent::CustomerCancelled && cancelled.checkout_time.is_some() {
            self.notifier
                .notify(cancelled.id, NotificationKind::CancelledByCustomer);
        }
        Ok(cancelled)
    }

    pub fn confirm(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order, DomainError> {
        self.staff_transition(order_id, OrderEvent::StaffConfirmed, now)
    }

    pub fn reject(
        &self,
        order_id: Uuid,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        let reason = bounded_text("rejection reason", Some(reason))?.ok_or_else(|| {
            DomainError::InvalidInput("rejection reason is required".to_string())
        })?;
        let order = self.load(order_id)?;
        let change = StatusChange::plan(order.status, order.pay_status, OrderEvent::StaffRejected, now)?
            .with_rejection_reason(reason);
        self.apply(order, change)
    }

    pub fn dispatch(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order, DomainError> {
        self.staff_transition(order_id, OrderEvent::Dispatched, now)
    }

    pub fn complete(&self, order_id: Uuid, now: DateTime<Utc>) -> Result<Order, DomainError> {
        self.staff_transition(order_id, OrderEvent::Delivered, now)
    }

    fn staff_transition(
        &self,
        order_id: Uuid,
        event: OrderEvent,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        let order = self.load(order_id)?;
        let change = StatusChange::plan(order.status, order.pay_status, event, now)?;
        self.apply(order, change)
    }

    fn load(&self, order_id: Uuid) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(order_id)?
            .map(|view| view.order)
            .ok_or(DomainError::OrderNotFound)
    }

    /// Writes `change` conditionally on the status it was planned from. If
    /// another writer moved the order first, the current status is reported
    /// as an invalid transition.
    fn apply(&self, order: Order, change: StatusChange) -> Result<Order, DomainError> {
        let from = order.status;
        if !self.orders.transition(order.id, from, &change)? {
            let current = self.load(order.id)?;
            return Err(DomainError::InvalidTransition {
                from: current.status,
                event: change.event,
            });
        }
        log::info!("order {} {} -> {} ({})", order.number, from, change.to, change.event);

        Ok(Order {
            status: change.to,
            pay_status: change.pay_status.unwrap_or(order.pay_status),
            cancel_reason: change.cancel_reason.or(order.cancel_reason),
            cancel_time: change.cancel_time.or(order.cancel_time),
            rejection_reason: change.rejection_reason.or(order.rejection_reason),
            delivery_time: change.delivery_time.or(order.delivery_time),
            ..order
        })
    }
}
