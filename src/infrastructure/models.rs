use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::{CartLineItem, ProductKey};
use crate::domain::errors::DomainError;
use crate::domain::order::{AddressSnapshot, Order, OrderItem};
use crate::domain::state_machine::StatusChange;
use crate::schema::{
    address_book, dish, order_detail, order_outbox, orders, setmeal, shopping_cart,
};

/// Flavor column value for "no flavor"; the column is NOT NULL so that the
/// cart's unique key also covers flavorless lines.
pub(crate) fn flavor_column(key: &ProductKey) -> String {
    key.flavor.clone().unwrap_or_default()
}

fn product_key(kind: &str, product_id: Uuid, flavor: String) -> Result<ProductKey, DomainError> {
    Ok(ProductKey::new(kind.parse()?, product_id, Some(flavor)))
}

// ── Cart ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = shopping_cart)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartLineRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_kind: String,
    pub product_id: Uuid,
    pub dish_flavor: String,
    pub name: String,
    pub image: Option<String>,
    pub amount: BigDecimal,
    pub number: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLineItem {
    type Error = DomainError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(CartLineItem {
            id: row.id,
            user_id: row.user_id,
            key: product_key(&row.product_kind, row.product_id, row.dish_flavor)?,
            name: row.name,
            image: row.image,
            unit_price: row.amount,
            quantity: row.number,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shopping_cart)]
pub struct NewCartLineRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_kind: String,
    pub product_id: Uuid,
    pub dish_flavor: String,
    pub name: String,
    pub image: Option<String>,
    pub amount: BigDecimal,
    pub number: i32,
    pub created_at: DateTime<Utc>,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub number: String,
    pub user_id: Uuid,
    pub status: String,
    pub pay_status: String,
    pub address_book_id: Uuid,
    pub consignee: String,
    pub phone: String,
    pub address: String,
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
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderRow {
    fn from(o: &Order) -> Self {
        OrderRow {
            id: o.id,
            number: o.number.clone(),
            user_id: o.user_id,
            status: o.status.as_str().to_string(),
            pay_status: o.pay_status.as_str().to_string(),
            address_book_id: o.address.address_book_id,
            consignee: o.address.consignee.clone(),
            phone: o.address.phone.clone(),
            address: o.address.detail.clone(),
            remark: o.remark.clone(),
            order_time: o.order_time,
            checkout_time: o.checkout_time,
            estimated_delivery_time: o.estimated_delivery_time,
            amount: o.amount.clone(),
            transaction_id: o.transaction_id.clone(),
            cancel_reason: o.cancel_reason.clone(),
            cancel_time: o.cancel_time,
            rejection_reason: o.rejection_reason.clone(),
            delivery_time: o.delivery_time,
            updated_at: o.order_time,
        }
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            number: row.number,
            user_id: row.user_id,
            status: row.status.parse()?,
            pay_status: row.pay_status.parse()?,
            address: AddressSnapshot {
                address_book_id: row.address_book_id,
                consignee: row.consignee,
                phone: row.phone,
                detail: row.address,
            },
            remark: row.remark,
            order_time: row.order_time,
            checkout_time: row.checkout_time,
            estimated_delivery_time: row.estimated_delivery_time,
            amount: row.amount,
            transaction_id: row.transaction_id,
            cancel_reason: row.cancel_reason,
            cancel_time: row.cancel_time,
            rejection_reason: row.rejection_reason,
            delivery_time: row.delivery_time,
        })
    }
}

/// Columns written by a status transition; `None` fields are left as they are.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderTransitionChangeset {
    pub status: String,
    pub pay_status: Option<String>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub cancel_reason: Option<String>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StatusChange> for OrderTransitionChangeset {
    fn from(c: &StatusChange) -> Self {
        OrderTransitionChangeset {
            status: c.to.as_str().to_string(),
            pay_status: c.pay_status.map(|p| p.as_str().to_string()),
            checkout_time: c.checkout_time,
            transaction_id: c.transaction_id.clone(),
            cancel_reason: c.cancel_reason.clone(),
            cancel_time: c.cancel_time,
            rejection_reason: c.rejection_reason.clone(),
            delivery_time: c.delivery_time,
            updated_at: c.changed_at,
        }
    }
}

#[derive(
    Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable,
)]
#[diesel(table_name = order_detail)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_kind: String,
    pub product_id: Uuid,
    pub dish_flavor: String,
    pub name: String,
    pub image: Option<String>,
    pub amount: BigDecimal,
    pub number: i32,
}

impl From<&OrderItem> for OrderItemRow {
    fn from(i: &OrderItem) -> Self {
        OrderItemRow {
            id: i.id,
            order_id: i.order_id,
            product_kind: i.key.kind.as_str().to_string(),
            product_id: i.key.product_id,
            dish_flavor: flavor_column(&i.key),
            name: i.name.clone(),
            image: i.image.clone(),
            amount: i.unit_price.clone(),
            number: i.quantity,
        }
    }
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DomainError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            key: product_key(&row.product_kind, row.product_id, row.dish_flavor)?,
            name: row.name,
            image: row.image,
            unit_price: row.amount,
            quantity: row.number,
        })
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

impl NewOutboxEventRow {
    /// Debezium's EventRouter derives the topic from `aggregate_type`.
    pub fn order_event(order_id: Uuid, event_type: &str, payload: Value) -> Self {
        NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order_id.to_string(),
            event_type: event_type.to_string(),
            payload,
        }
    }
}

// ── Collaborator read models ─────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = dish)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DishRow {
    pub name: String,
    pub image: Option<String>,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = setmeal)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SetmealRow {
    pub name: String,
    pub image: Option<String>,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = address_book)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddressRow {
    pub id: Uuid,
    pub consignee: String,
    pub phone: String,
    pub detail: String,
}

impl From<AddressRow> for AddressSnapshot {
    fn from(row: AddressRow) -> Self {
        AddressSnapshot {
            address_book_id: row.id,
            consignee: row.consignee,
            phone: row.phone,
            detail: row.detail,
        }
    }
}
