use bigdecimal::BigDecimal;
use thiserror::Error;

use super::cart::ProductKind;
use super::state_machine::{OrderEvent, OrderStatus};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found")]
    OrderNotFound,
    #[error("{kind} {id} not found in catalog")]
    ProductNotFound { kind: ProductKind, id: uuid::Uuid },
    #[error("Order does not belong to the requesting user")]
    Forbidden,
    #[error("Cannot apply {event} to an order in status {from}")]
    InvalidTransition { from: OrderStatus, event: OrderEvent },
    #[error("Shopping cart is empty")]
    EmptyCart,
    #[error("Address does not belong to the user")]
    InvalidAddress,
    #[error("Paid amount {paid} does not match order total {expected}")]
    AmountMismatch { expected: BigDecimal, paid: BigDecimal },
    /// Payment arrived for an order the timeout sweep already cancelled.
    /// Needs operator follow-up; retrying will not help.
    #[error("Order {0} was already cancelled; payment requires manual reconciliation")]
    OrderAlreadyCancelled(String),
    #[error("Operation not applicable to an order in status {0}")]
    InvalidState(OrderStatus),
    #[error("Shopping cart changed while the order was being placed")]
    CartChanged,
    #[error("Order number {0} is already taken")]
    OrderNumberTaken(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl<T> From<std::sync::PoisonError<T>> for DomainError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DomainError::Internal(e.to_string())
    }
}
