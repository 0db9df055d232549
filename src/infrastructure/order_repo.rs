use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::CartLineItem;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    ListResult, Order, OrderDraft, OrderItem, OrderNumber, OrderSearch, OrderView, PageRequest,
};
use crate::domain::ports::OrderRepository;
use crate::domain::state_machine::{OrderStatus, StatusChange};
use crate::schema::{order_detail, order_outbox, orders, shopping_cart};

use super::models::{NewOutboxEventRow, OrderItemRow, OrderRow, OrderTransitionChangeset};

/// Unique constraint on `orders.number`.
const ORDER_NUMBER_KEY: &str = "orders_number_key";
/// Fresh numbers drawn before a collision is reported to the caller.
const NUMBER_ATTEMPTS: u32 = 3;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn try_place(&self, draft: &OrderDraft, consumed: &[CartLineItem]) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = draft.order.clone();

            // 1. Insert the order and its items
            let inserted = diesel::insert_into(orders::table)
                .values(&OrderRow::from(&order))
                .execute(conn);
            if let Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) = &inserted {
                if info.constraint_name() == Some(ORDER_NUMBER_KEY) {
                    return Err(DomainError::OrderNumberTaken(order.number));
                }
            }
            inserted?;

            let item_rows: Vec<OrderItemRow> = draft.items.iter().map(OrderItemRow::from).collect();
            diesel::insert_into(order_detail::table)
                .values(&item_rows)
                .execute(conn)?;

            // 2. Drain exactly the cart lines the order was built from. A line
            //    that vanished or changed quantity aborts the whole unit.
            for line in consumed {
                let deleted = diesel::delete(
                    shopping_cart::table
                        .filter(shopping_cart::id.eq(line.id))
                        .filter(shopping_cart::user_id.eq(order.user_id))
                        .filter(shopping_cart::number.eq(line.quantity)),
                )
                .execute(conn)?;
                if deleted != 1 {
                    return Err(DomainError::CartChanged);
                }
            }

            // 3. Outbox event in the same transaction.
            let lines: Vec<serde_json::Value> = draft
                .items
                .iter()
                .map(|i| {
                    json!({
                        "product_kind": i.key.kind,
                        "product_id": i.key.product_id,
                        "flavor": i.key.flavor,
                        "quantity": i.quantity,
                        "unit_price": i.unit_price.to_string()
                    })
                })
                .collect();
            diesel::insert_into(order_outbox::table)
                .values(&NewOutboxEventRow::order_event(
                    order.id,
                    "OrderPlaced",
                    json!({
                        "order_id": order.id,
                        "number": order.number,
                        "user_id": order.user_id,
                        "status": order.status,
                        "amount": order.amount.to_string(),
                        "order_time": order.order_time,
                        "lines": lines
                    }),
                ))
                .execute(conn)?;

            Ok(order)
        })
    }

}

/// `LIKE` pattern matching `fragment` literally anywhere in the column.
/// Postgres escapes with a backslash by default.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn filtered(filter: &OrderSearch) -> orders::BoxedQuery<'static, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(orders::user_id.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(orders::status.eq(status.as_str()));
    }
    if let Some(number) = &filter.number {
        query = query.filter(orders::number.like(contains_pattern(number)));
    }
    if let Some(phone) = &filter.phone {
        query = query.filter(orders::phone.eq(phone.clone()));
    }
    if let Some(from) = filter.submitted_from {
        query = query.filter(orders::order_time.ge(from));
    }
    if let Some(to) = filter.submitted_to {
        query = query.filter(orders::order_time.le(to));
    }
    query
}

fn to_views(rows: Vec<OrderRow>, items: Vec<Vec<OrderItemRow>>) -> Result<Vec<OrderView>, DomainError> {
    rows.into_iter()
        .zip(items)
        .map(|(row, items)| {
            Ok(OrderView {
                order: row.try_into()?,
                items: items
                    .into_iter()
                    .map(OrderItem::try_from)
                    .collect::<Result<_, _>>()?,
            })
        })
        .collect()
}

impl OrderRepository for DieselOrderRepository {
    fn place(&self, mut draft: OrderDraft, consumed: &[CartLineItem]) -> Result<Order, DomainError> {
        let mut attempt = 1;
        loop {
            match self.try_place(&draft, consumed) {
                Err(DomainError::OrderNumberTaken(number)) if attempt < NUMBER_ATTEMPTS => {
                    log::warn!("order number {} already taken, drawing another", number);
                    draft.order.number = OrderNumber::generate(draft.order.order_time).into_inner();
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;

        Ok(to_views(vec![order], vec![items])?.pop())
    }

    fn find_by_number(&self, number: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        orders::table
            .filter(orders::number.eq(number))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        change: &StatusChange,
    ) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq(expected.as_str())),
            )
            .set(&OrderTransitionChangeset::from(change))
            .execute(conn)?;

            if updated == 0 {
                return Ok(false);
            }

            diesel::insert_into(order_outbox::table)
                .values(&NewOutboxEventRow::order_event(
                    id,
                    "OrderStatusChanged",
                    json!({
                        "order_id": id,
                        "from": expected,
                        "to": change.to,
                        "event": change.event,
                        "pay_status": change.pay_status,
                        "reason": change.cancel_reason.as_ref().or(change.rejection_reason.as_ref()),
                        "at": change.changed_at
                    }),
                ))
                .execute(conn)?;
            Ok(true)
        })
    }

    fn search(&self, filter: &OrderSearch, page: PageRequest) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter)
                .select(diesel::dsl::count_star())
                .get_result(conn)?;

            let rows = filtered(filter)
                .select(OrderRow::as_select())
                .order(orders::order_time.desc())
                .limit(page.page_size)
                .offset(page.offset())
                .load(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .load(conn)?
                .grouped_by(&rows);

            Ok(ListResult {
                items: to_views(rows, items)?,
                total,
            })
        })
    }

    fn find_submitted_before(
        &self,
        status: OrderStatus,
        before: DateTime<Utc>,
    ) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        orders::table
            .filter(orders::status.eq(status.as_str()))
            .filter(orders::order_time.lt(before))
            .order(orders::order_time.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    fn count_by_status(&self, status: OrderStatus) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;

        let count = orders::table
            .filter(orders::status.eq(status.as_str()))
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bigdecimal::BigDecimal;
    use chrono::Duration;
    use diesel::prelude::*;

    use super::*;
    use crate::domain::cart::{NewCartLine, ProductKey, ProductSnapshot};
    use crate::domain::order::{AddressSnapshot, PayStatus};
    use crate::domain::ports::CartRepository;
    use crate::domain::state_machine::OrderEvent;
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::models::OutboxEventRow;
    use crate::infrastructure::test_db::setup_db;

    fn address() -> AddressSnapshot {
        AddressSnapshot {
            address_book_id: Uuid::new_v4(),
            consignee: "Grace".to_string(),
            phone: "555-0199".to_string(),
            detail: "2 Harbour Rd".to_string(),
        }
    }

    /// Fills the user's cart with two lines and returns them.
    fn fill_cart(carts: &DieselCartRepository, user: Uuid) -> Vec<CartLineItem> {
        for (key, price, quantity) in [
            (ProductKey::dish(Uuid::new_v4(), Some("hot".to_string())), "9.99", 2),
            (ProductKey::setmeal(Uuid::new_v4()), "4.50", 1),
        ] {
            carts
                .upsert(NewCartLine {
                    user_id: user,
                    key,
                    snapshot: ProductSnapshot {
                        name: "Item".to_string(),
                        image: None,
                        price: BigDecimal::from_str(price).expect("valid decimal"),
                    },
                    quantity,
                    created_at: Utc::now(),
                })
                .expect("upsert failed");
        }
        carts.list(user).expect("list failed")
    }

    fn place(orders: &DieselOrderRepository, carts: &DieselCartRepository, user: Uuid) -> Order {
        let lines = fill_cart(carts, user);
        let draft = OrderDraft::from_cart(user, address(), None, None, &lines, Utc::now());
        orders.place(draft, &lines).expect("place failed")
    }

    fn outbox_events(pool: &crate::db::DbPool, order_id: Uuid) -> Vec<OutboxEventRow> {
        let mut conn = pool.get().expect("Failed to get connection");
        order_outbox::table
            .filter(order_outbox::aggregate_id.eq(order_id.to_string()))
            .order(order_outbox::created_at.asc())
            .select(OutboxEventRow::as_select())
            .load(&mut conn)
            .expect("query failed")
    }

    #[tokio::test]
    async fn place_writes_order_items_and_drains_cart() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let user = Uuid::new_v4();

        let order = place(&orders, &carts, user);

        let view = orders
            .find_by_id(order.id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(view.order.status, OrderStatus::AwaitingPayment);
        assert_eq!(view.order.pay_status, PayStatus::Unpaid);
        assert_eq!(view.order.amount, BigDecimal::from_str("24.48").unwrap());
        assert_eq!(view.items.len(), 2);
        assert!(view
            .items
            .iter()
            .any(|i| i.key.flavor.as_deref() == Some("hot") && i.quantity == 2));
        assert!(carts.list(user).unwrap().is_empty());

        let events = outbox_events(&pool, order.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "OrderPlaced");
        assert_eq!(events[0].aggregate_type, "Order");
    }

    #[tokio::test]
    async fn place_rolls_back_when_cart_changed() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let user = Uuid::new_v4();
        let lines = fill_cart(&carts, user);
        carts.increment(user, &lines[0].key).unwrap();
        let draft = OrderDraft::from_cart(user, address(), None, None, &lines, Utc::now());
        let order_id = draft.order.id;

        let err = orders.place(draft, &lines).unwrap_err();

        assert!(matches!(err, DomainError::CartChanged));
        assert!(orders.find_by_id(order_id).unwrap().is_none());
        assert_eq!(carts.list(user).unwrap().len(), 2);
        assert!(outbox_events(&pool, order_id).is_empty());
    }

    #[tokio::test]
    async fn colliding_order_number_is_redrawn() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let first = place(&orders, &carts, Uuid::new_v4());

        let user = Uuid::new_v4();
        let lines = fill_cart(&carts, user);
        let mut draft = OrderDraft::from_cart(user, address(), None, None, &lines, Utc::now());
        draft.order.number = first.number.clone();

        let second = orders.place(draft, &lines).expect("place failed");

        assert_ne!(second.number, first.number);
        let stored = orders.find_by_number(&second.number).unwrap().unwrap();
        assert_eq!(stored.id, second.id);
        assert!(carts.list(user).unwrap().is_empty());
    }

    #[tokio::test]
    async fn transition_is_conditional_on_expected_status() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let order = place(&orders, &carts, Uuid::new_v4());

        let pay = StatusChange::plan(
            OrderStatus::AwaitingPayment,
            PayStatus::Unpaid,
            OrderEvent::PaymentConfirmed,
            Utc::now(),
        )
        .unwrap()
        .with_transaction_id("txn-42");
        let timeout = StatusChange::plan(
            OrderStatus::AwaitingPayment,
            PayStatus::Unpaid,
            OrderEvent::PaymentTimedOut,
            Utc::now(),
        )
        .unwrap();

        assert!(orders
            .transition(order.id, OrderStatus::AwaitingPayment, &pay)
            .unwrap());
        assert!(!orders
            .transition(order.id, OrderStatus::AwaitingPayment, &timeout)
            .unwrap());

        let stored = orders.find_by_number(&order.number).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::ToBeConfirmed);
        assert_eq!(stored.pay_status, PayStatus::Paid);
        assert_eq!(stored.transaction_id.as_deref(), Some("txn-42"));
        assert!(stored.checkout_time.is_some());
        assert_eq!(stored.cancel_reason, None);

        let events = outbox_events(&pool, order.id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "OrderStatusChanged");
        assert_eq!(events[1].payload["to"], "TO_BE_CONFIRMED");
    }

    #[tokio::test]
    async fn racing_transitions_have_exactly_one_winner() {
        let (_container, pool) = setup_db().await;
        let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
        let carts = DieselCartRepository::new(pool.clone());
        let order = place(&orders, &carts, Uuid::new_v4());

        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = [OrderEvent::PaymentConfirmed, OrderEvent::PaymentTimedOut]
                .into_iter()
                .cycle()
                .take(6)
                .map(|event| {
                    let orders = Arc::clone(&orders);
                    s.spawn(move || {
                        let change = StatusChange::plan(
                            OrderStatus::AwaitingPayment,
                            PayStatus::Unpaid,
                            event,
                            Utc::now(),
                        )
                        .unwrap();
                        orders
                            .transition(order.id, OrderStatus::AwaitingPayment, &change)
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn search_filters_and_paginates_newest_first() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let user = Uuid::new_v4();

        let mut placed = Vec::new();
        for _ in 0..5 {
            placed.push(place(&orders, &carts, user));
        }
        place(&orders, &carts, Uuid::new_v4());

        let page1 = orders
            .search(&OrderSearch::for_user(user, None), PageRequest::new(1, 3))
            .expect("search failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        assert_eq!(page1.items[0].order.id, placed[4].id);
        assert!(page1.items.iter().all(|v| v.items.len() == 2));

        let page2 = orders
            .search(&OrderSearch::for_user(user, None), PageRequest::new(2, 3))
            .expect("search failed");
        assert_eq!(page2.items.len(), 2);

        let everyone = orders
            .search(&OrderSearch::default(), PageRequest::new(1, 20))
            .unwrap();
        assert_eq!(everyone.total, 6);

        let by_phone = orders
            .search(
                &OrderSearch {
                    phone: Some("555-0199".to_string()),
                    status: Some(OrderStatus::Completed),
                    ..OrderSearch::default()
                },
                PageRequest::new(1, 20),
            )
            .unwrap();
        assert_eq!(by_phone.total, 0);
    }

    #[test]
    fn number_fragment_wildcards_are_escaped() {
        assert_eq!(contains_pattern("2024"), "%2024%");
        assert_eq!(contains_pattern("1_%"), "%1\\_\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn number_search_treats_wildcards_literally() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let order = place(&orders, &carts, Uuid::new_v4());

        let search = |number: &str| {
            orders
                .search(
                    &OrderSearch {
                        number: Some(number.to_string()),
                        ..OrderSearch::default()
                    },
                    PageRequest::new(1, 10),
                )
                .expect("search failed")
                .total
        };

        assert_eq!(search(&order.number[4..10]), 1);
        assert_eq!(search("%"), 0);
        assert_eq!(search("_"), 0);
    }

    #[tokio::test]
    async fn find_submitted_before_and_counts() {
        let (_container, pool) = setup_db().await;
        let orders = DieselOrderRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        let order = place(&orders, &carts, Uuid::new_v4());

        let stale = orders
            .find_submitted_before(OrderStatus::AwaitingPayment, Utc::now() + Duration::minutes(1))
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, order.id);

        let none = orders
            .find_submitted_before(OrderStatus::AwaitingPayment, Utc::now() - Duration::minutes(15))
            .unwrap();
        assert!(none.is_empty());

        assert_eq!(orders.count_by_status(OrderStatus::AwaitingPayment).unwrap(), 1);
        assert_eq!(orders.count_by_status(OrderStatus::Confirmed).unwrap(), 0);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown_id() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let result = repo
            .find_by_id(Uuid::new_v4())
            .expect("find should not error");

        assert!(result.is_none());
    }
}
