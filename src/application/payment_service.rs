use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, PayStatus};
use crate::domain::ports::{NotificationKind, NotificationSink, OrderRepository};
use crate::domain::state_machine::{OrderEvent, OrderStatus, StatusChange};

/// A payment provider's callback.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub order_number: String,
    pub amount: BigDecimal,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// This callback moved the order to `ToBeConfirmed`.
    Applied(Order),
    /// The order was already paid; nothing was written.
    AlreadyPaid(Order),
}

pub struct PaymentService<O, N> {
    orders: O,
    notifier: N,
}

impl<O: OrderRepository, N: NotificationSink> PaymentService<O, N> {
    pub fn new(orders: O, notifier: N) -> Self {
        Self { orders, notifier }
    }

    pub fn confirm_payment(
        &self,
        callback: PaymentCallback,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, DomainError> {
        let order = self
            .orders
            .find_by_number(&callback.order_number)?
            .ok_or(DomainError::OrderNotFound)?;

        if callback.amount != order.amount {
            log::warn!(
                "payment {} for order {} rejected: paid {}, expected {}",
                callback.transaction_id,
                order.number,
                callback.amount,
                order.amount
            );
            return Err(DomainError::AmountMismatch {
                expected: order.amount,
                paid: callback.amount,
            });
        }

        if order.pay_status != PayStatus::Unpaid {
            log::info!(
                "duplicate payment callback {} for order {} ignored",
                callback.transaction_id,
                order.number
            );
            return Ok(PaymentOutcome::AlreadyPaid(order));
        }

        if order.status == OrderStatus::Cancelled {
            return Err(self.reconciliation(&order, &callback));
        }

        let change = StatusChange::plan(order.status, order.pay_status, OrderEvent::PaymentConfirmed, now)?
            .with_transaction_id(callback.transaction_id.clone());

        if !self.orders.transition(order.id, order.status, &change)? {
            // Lost the conditional update: a duplicate callback or the
            // timeout sweep got there first.
            let current = self
                .orders
                .find_by_number(&callback.order_number)?
                .ok_or(DomainError::OrderNotFound)?;
            return match (current.status, current.pay_status) {
                (_, PayStatus::Paid) => Ok(PaymentOutcome::AlreadyPaid(current)),
                (OrderStatus::Cancelled, _) => Err(self.reconciliation(&current, &callback)),
                (from, _) => Err(DomainError::InvalidTransition {
                    from,
                    event: OrderEvent::PaymentConfirmed,
                }),
            };
        }

        log::info!(
            "order {} paid via transaction {}",
            order.number,
            callback.transaction_id
        );
        self.notifier.notify(order.id, NotificationKind::NewOrder);

        let paid = Order {
            status: change.to,
            pay_status: PayStatus::Paid,
            checkout_time: change.checkout_time,
            transaction_id: change.transaction_id,
            ..order
        };
        Ok(PaymentOutcome::Applied(paid))
    }

    fn reconciliation(&self, order: &Order, callback: &PaymentCallback) -> DomainError {
        log::error!(
            "payment {} of {} arrived for cancelled order {}; manual reconciliation required",
            callback.transaction_id,
            callback.amount,
            order.number
        );
        DomainError::OrderAlreadyCancelled(order.number.clone())
    }
}
