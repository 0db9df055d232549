//! Order statuses and the transitions between them.
//!
//! Every status change in the crate goes through [`OrderStatus::next`]; the
//! persistence layer then applies the resulting [`StatusChange`] as a
//! conditional update keyed on the status the change was planned from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::order::PayStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    AwaitingPayment,
    ToBeConfirmed,
    Confirmed,
    InDelivery,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::AwaitingPayment,
        OrderStatus::ToBeConfirmed,
        OrderStatus::Confirmed,
        OrderStatus::InDelivery,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::ToBeConfirmed => "TO_BE_CONFIRMED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::InDelivery => "IN_DELIVERY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// The status `event` leads to from `self`, or `InvalidTransition`.
    pub fn next(self, event: OrderEvent) -> Result<OrderStatus, DomainError> {
        use OrderEvent::*;
        use OrderStatus::*;

        let to = match (self, event) {
            (AwaitingPayment, PaymentConfirmed) => ToBeConfirmed,
            (AwaitingPayment, PaymentTimedOut) => Cancelled,
            (AwaitingPayment | ToBeConfirmed, CustomerCancelled) => Cancelled,
            (AwaitingPayment | ToBeConfirmed | Confirmed, StaffCancelled) => Cancelled,
            (ToBeConfirmed, StaffConfirmed) => Confirmed,
            (ToBeConfirmed, StaffRejected) => Rejected,
            (Confirmed, Dispatched) => InDelivery,
            (InDelivery, Delivered) => Completed,
            (from, event) => return Err(DomainError::InvalidTransition { from, event }),
        };
        Ok(to)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::Internal(format!("unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    PaymentConfirmed,
    PaymentTimedOut,
    CustomerCancelled,
    StaffCancelled,
    StaffConfirmed,
    StaffRejected,
    Dispatched,
    Delivered,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 8] = [
        OrderEvent::PaymentConfirmed,
        OrderEvent::PaymentTimedOut,
        OrderEvent::CustomerCancelled,
        OrderEvent::StaffCancelled,
        OrderEvent::StaffConfirmed,
        OrderEvent::StaffRejected,
        OrderEvent::Dispatched,
        OrderEvent::Delivered,
    ];
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderEvent::PaymentConfirmed => "payment confirmed",
            OrderEvent::PaymentTimedOut => "payment timeout",
            OrderEvent::CustomerCancelled => "customer cancel",
            OrderEvent::StaffCancelled => "staff cancel",
            OrderEvent::StaffConfirmed => "staff confirm",
            OrderEvent::StaffRejected => "staff reject",
            OrderEvent::Dispatched => "dispatch",
            OrderEvent::Delivered => "delivery complete",
        };
        f.write_str(name)
    }
}

/// The columns a single transition writes. `None` leaves a column untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub event: OrderEvent,
    pub to: OrderStatus,
    pub pay_status: Option<PayStatus>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub cancel_reason: Option<String>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub changed_at: DateTime<Utc>,
}

impl StatusChange {
    /// Plans `event` against an order currently in `from` with `pay_status`.
    ///
    /// Cancelling or rejecting a paid order marks it refunded; the refund
    /// itself happens downstream of the outbox.
    pub fn plan(
        from: OrderStatus,
        pay_status: PayStatus,
        event: OrderEvent,
        at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let to = from.next(event)?;
        let mut change = StatusChange {
            event,
            to,
            pay_status: None,
            checkout_time: None,
            transaction_id: None,
            cancel_reason: None,
            cancel_time: None,
            rejection_reason: None,
            delivery_time: None,
            changed_at: at,
        };

        match to {
            OrderStatus::ToBeConfirmed => {
                change.pay_status = Some(PayStatus::Paid);
                change.checkout_time = Some(at);
            }
            OrderStatus::Cancelled | OrderStatus::Rejected => {
                if to == OrderStatus::Cancelled {
                    change.cancel_time = Some(at);
                }
                if pay_status == PayStatus::Paid {
                    change.pay_status = Some(PayStatus::Refunded);
                }
            }
            OrderStatus::Completed => change.delivery_time = Some(at),
            _ => {}
        }
        Ok(change)
    }

    pub fn with_cancel_reason(mut self, reason: impl Into<String>) -> Self {
        self.cancel_reason = Some(reason.into());
        self
    }

    pub fn with_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}
