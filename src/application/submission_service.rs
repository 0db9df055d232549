use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{bounded_text, OrderDraft, SubmissionReceipt};
use crate::domain::ports::{AddressValidator, CartRepository, OrderRepository};

#[derive(Debug, Clone)]
pub struct SubmitOrder {
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub remark: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

/// Turns a user's cart into an order awaiting payment.
pub struct SubmissionService<C, O, A> {
    cart: C,
    orders: O,
    addresses: A,
}

impl<C, O, A> SubmissionService<C, O, A>
where
    C: CartRepository,
    O: OrderRepository,
    A: AddressValidator,
{
    pub fn new(cart: C, orders: O, addresses: A) -> Self {
        Self {
            cart,
            orders,
            addresses,
        }
    }

    pub fn submit(
        &self,
        request: SubmitOrder,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, DomainError> {
        let remark = bounded_text("remark", request.remark)?;
        let lines = self.cart.list(request.user_id)?;
        if lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let address = self
            .addresses
            .resolve(request.address_id, request.user_id)?
            .ok_or(DomainError::InvalidAddress)?;

        let draft = OrderDraft::from_cart(
            request.user_id,
            address,
            remark,
            request.estimated_delivery_time,
            &lines,
            now,
        );

        let order = self.orders.place(draft, &lines)?;
        log::info!(
            "order {} placed by user {}: {} line(s), total {}",
            order.number,
            order.user_id,
            lines.len(),
            order.amount
        );

        Ok(SubmissionReceipt {
            order_id: order.id,
            order_number: order.number,
            amount: order.amount,
            order_time: order.order_time,
        })
    }
}
