use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::{CartLineItem, ProductKey};
use super::errors::DomainError;
use super::state_machine::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayStatus::Unpaid => "UNPAID",
            PayStatus::Paid => "PAID",
            PayStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for PayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(PayStatus::Unpaid),
            "PAID" => Ok(PayStatus::Paid),
            "REFUNDED" => Ok(PayStatus::Refunded),
            other => Err(DomainError::Internal(format!("unknown pay status '{other}'"))),
        }
    }
}

/// Who is asking. Staff may see and act on any order; customers only on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer(Uuid),
    Staff(Uuid),
}

impl Actor {
    pub fn may_access(&self, order: &Order) -> bool {
        match self {
            Actor::Customer(user_id) => *user_id == order.user_id,
            Actor::Staff(_) => true,
        }
    }
}

/// Delivery address and contact, copied onto the order at submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressSnapshot {
    pub address_book_id: Uuid,
    pub consignee: String,
    pub phone: String,
    pub detail: String,
}

/// Human-readable order number; also the idempotency key for payment callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Submission second followed by six random digits.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let salt = Uuid::new_v4().as_u128() % 1_000_000;
        OrderNumber(format!("{}{:06}", now.format("%Y%m%d%H%M%S"), salt))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub pay_status: PayStatus,
    pub address: AddressSnapshot,
    pub remark: Option<String>,
    pub order_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub amount: BigDecimal,
    pub transaction_id: Option<String>,
    pub cancel_reason: Option<String>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub key: ProductKey,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Everything needed to persist a new order. Built from the cart by the
/// submission service; the repository writes it and drains the consumed
/// cart lines in the same unit.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    pub fn from_cart(
        user_id: Uuid,
        address: AddressSnapshot,
        remark: Option<String>,
        estimated_delivery_time: Option<DateTime<Utc>>,
        lines: &[CartLineItem],
        now: DateTime<Utc>,
    ) -> Self {
        let order_id = Uuid::new_v4();
        let items = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                key: line.key.clone(),
                name: line.name.clone(),
                image: line.image.clone(),
                unit_price: line.unit_price.clone(),
                quantity: line.quantity,
            })
            .collect();

        let order = Order {
            id: order_id,
            number: OrderNumber::generate(now).into_inner(),
            user_id,
            status: OrderStatus::AwaitingPayment,
            pay_status: PayStatus::Unpaid,
            address,
            remark,
            order_time: now,
            checkout_time: None,
            estimated_delivery_time,
            amount: super::cart::cart_total(lines),
            transaction_id: None,
            cancel_reason: None,
            cancel_time: None,
            rejection_reason: None,
            delivery_time: None,
        };
        OrderDraft { order, items }
    }
}

/// Returned to the customer after a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub order_id: Uuid,
    pub order_number: String,
    pub amount: BigDecimal,
    pub order_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}

/// Longest remark, cancellation or rejection reason an order can store.
pub const MAX_NOTE_CHARS: usize = 255;

/// Trims free text, drops it when blank and rejects it when longer than
/// [`MAX_NOTE_CHARS`] characters.
pub fn bounded_text(field: &str, value: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(text) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_NOTE_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "{field} must be at most {MAX_NOTE_CHARS} characters"
        )));
    }
    Ok(Some(text))
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub const MAX_PAGE_SIZE: i64 = 100;
    /// Highest page whose offset still fits in an `i64` at any page size.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_PAGE_SIZE;

    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.clamp(1, Self::MAX_PAGE),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Staff search over all orders; every filter is optional.
#[derive(Debug, Clone, Default)]
pub struct OrderSearch {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub number: Option<String>,
    pub phone: Option<String>,
    pub submitted_from: Option<DateTime<Utc>>,
    pub submitted_to: Option<DateTime<Utc>>,
}

impl OrderSearch {
    pub fn for_user(user_id: Uuid, status: Option<OrderStatus>) -> Self {
        Self {
            user_id: Some(user_id),
            status,
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |u| u == order.user_id)
            && self.status.map_or(true, |s| s == order.status)
            && self
                .number
                .as_deref()
                .map_or(true, |n| order.number.contains(n))
            && self.phone.as_deref().map_or(true, |p| order.address.phone == p)
            && self.submitted_from.map_or(true, |t| order.order_time >= t)
            && self.submitted_to.map_or(true, |t| order.order_time <= t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderStatistics {
    pub to_be_confirmed: i64,
    pub confirmed: i64,
    pub in_delivery: i64,
}
