use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    Actor, ListResult, OrderSearch, OrderStatistics, OrderView, PageRequest,
};
use crate::domain::ports::{
    CartRepository, CatalogLookup, NotificationKind, NotificationSink, OrderRepository,
};
use crate::domain::state_machine::OrderStatus;

use super::cart_service::CartService;

/// Read paths over orders, plus the two customer actions that only read an
/// order: repeating it into the cart and reminding staff about it.
pub struct OrderQueryService<O, C, K, N> {
    orders: O,
    cart: CartService<C, K>,
    notifier: N,
}

impl<O, C, K, N> OrderQueryService<O, C, K, N>
where
    O: OrderRepository,
    C: CartRepository,
    K: CatalogLookup,
    N: NotificationSink,
{
    pub fn new(orders: O, cart: CartService<C, K>, notifier: N) -> Self {
        Self {
            orders,
            cart,
            notifier,
        }
    }

    /// A customer's orders, newest first.
    pub fn history(
        &self,
        user_id: Uuid,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<ListResult, DomainError> {
        self.orders
            .search(&OrderSearch::for_user(user_id, status), page)
    }

    pub fn detail(&self, order_id: Uuid, viewer: Actor) -> Result<OrderView, DomainError> {
        let view = self
            .orders
            .find_by_id(order_id)?
            .ok_or(DomainError::OrderNotFound)?;
        if !viewer.may_access(&view.order) {
            return Err(DomainError::Forbidden);
        }
        Ok(view)
    }

    /// Puts every item of a past order back into the user's cart at today's
    /// catalog prices.
    pub fn repeat(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let view = self.detail(order_id, Actor::Customer(user_id))?;
        let lines = view
            .items
            .into_iter()
            .map(|item| (item.key, item.quantity))
            .collect();
        self.cart.add_all(user_id, lines, now)
    }

    pub fn remind(&self, order_id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        let view = self.detail(order_id, Actor::Customer(user_id))?;
        if view.order.status.is_terminal() {
            return Err(DomainError::InvalidState(view.order.status));
        }
        self.notifier
            .notify(order_id, NotificationKind::CustomerReminder);
        Ok(())
    }

    /// Staff search across all customers.
    pub fn search(&self, filter: &OrderSearch, page: PageRequest) -> Result<ListResult, DomainError> {
        self.orders.search(filter, page)
    }

    pub fn statistics(&self) -> Result<OrderStatistics, DomainError> {
        Ok(OrderStatistics {
            to_be_confirmed: self.orders.count_by_status(OrderStatus::ToBeConfirmed)?,
            confirmed: self.orders.count_by_status(OrderStatus::Confirmed)?,
            in_delivery: self.orders.count_by_status(OrderStatus::InDelivery)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::Duration;

    use super::*;
    use crate::application::fixtures::Harness;
    use crate::domain::cart::{ProductKey, ProductKind};

    #[test]
    fn history_is_newest_first_and_scoped_to_user() {
        let h = Harness::new();
        let first = h.place_order();
        h.store
            .backdate(first.order_id, Utc::now() - Duration::minutes(5))
            .unwrap();
        let second = h.place_order();
        let other_user = Uuid::new_v4();
        h.place_order_for(other_user);

        let page = h
            .queries
            .history(h.user, PageRequest::new(1, 10), None)
            .unwrap();

        assert_eq!(page.total, 2);
        let ids: Vec<Uuid> = page.items.iter().map(|v| v.order.id).collect();
        assert_eq!(ids, vec![second.order_id, first.order_id]);
        assert!(!page.items[0].items.is_empty());
    }

    #[test]
    fn history_filters_by_status_and_paginates() {
        let h = Harness::new();
        for _ in 0..3 {
            h.place_order();
        }
        let paid = h.place_order();
        h.pay(&paid).unwrap();

        let unpaid = h
            .queries
            .history(h.user, PageRequest::new(2, 2), Some(OrderStatus::AwaitingPayment))
            .unwrap();
        assert_eq!(unpaid.total, 3);
        assert_eq!(unpaid.items.len(), 1);

        let to_confirm = h
            .queries
            .history(h.user, PageRequest::new(1, 10), Some(OrderStatus::ToBeConfirmed))
            .unwrap();
        assert_eq!(to_confirm.total, 1);
        assert_eq!(to_confirm.items[0].order.id, paid.order_id);
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let h = Harness::new();
        h.place_order();

        let page = h
            .queries
            .history(h.user, PageRequest::new(i64::MAX, 10), None)
            .unwrap();

        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn detail_is_forbidden_to_other_customers_but_not_staff() {
        let h = Harness::new();
        let receipt = h.place_order();

        assert!(matches!(
            h.queries
                .detail(receipt.order_id, Actor::Customer(Uuid::new_v4())),
            Err(DomainError::Forbidden)
        ));
        let view = h
            .queries
            .detail(receipt.order_id, Actor::Staff(Uuid::new_v4()))
            .unwrap();
        assert_eq!(view.order.id, receipt.order_id);
    }

    #[test]
    fn repeat_refills_cart_at_current_prices() {
        let h = Harness::new();
        h.cart.add(h.user, ProductKey::dish(h.dish, Some("hot".to_string())), Utc::now()).unwrap();
        h.cart.add(h.user, ProductKey::dish(h.dish, Some("hot".to_string())), Utc::now()).unwrap();
        h.cart.add(h.user, ProductKey::setmeal(h.combo), Utc::now()).unwrap();
        let address = h.address_for(h.user);
        let receipt = h.submit(h.user, address).unwrap();
        h.set_dish_price("20.00");

        h.queries.repeat(receipt.order_id, h.user, Utc::now()).unwrap();

        let mut lines = h.cart.list(h.user).unwrap();
        lines.sort_by_key(|l| l.key.kind == ProductKind::Setmeal);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].key, ProductKey::dish(h.dish, Some("hot".to_string())));
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].unit_price, BigDecimal::from_str("20.00").unwrap());
        assert_eq!(lines[1].key, ProductKey::setmeal(h.combo));
        assert_eq!(lines[1].quantity, 1);
    }

    #[test]
    fn repeat_of_someone_elses_order_is_forbidden() {
        let h = Harness::new();
        let receipt = h.place_order();
        let stranger = Uuid::new_v4();

        let err = h
            .queries
            .repeat(receipt.order_id, stranger, Utc::now())
            .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden));
        assert!(h.cart.list(stranger).unwrap().is_empty());
    }

    #[test]
    fn repeat_with_delisted_product_leaves_cart_untouched() {
        let h = Harness::new();
        h.cart.add(h.user, ProductKey::setmeal(h.combo), Utc::now()).unwrap();
        h.cart.add(h.user, ProductKey::dish(h.dish, None), Utc::now()).unwrap();
        let address = h.address_for(h.user);
        let receipt = h.submit(h.user, address).unwrap();
        h.catalog.remove(ProductKind::Dish, h.dish);

        let err = h
            .queries
            .repeat(receipt.order_id, h.user, Utc::now())
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::ProductNotFound {
                kind: ProductKind::Dish,
                ..
            }
        ));
        assert!(h.cart.list(h.user).unwrap().is_empty());
    }

    #[test]
    fn remind_signals_staff_for_open_orders() {
        let h = Harness::new();
        let receipt = h.place_order();
        h.pay(&receipt).unwrap();

        h.queries.remind(receipt.order_id, h.user).unwrap();

        assert_eq!(
            h.notifier
                .count(receipt.order_id, NotificationKind::CustomerReminder),
            1
        );
    }

    #[test]
    fn remind_on_terminal_order_is_invalid_state() {
        let h = Harness::new();
        let receipt = h.place_order();
        h.orders
            .cancel(receipt.order_id, Actor::Customer(h.user), None, Utc::now())
            .unwrap();

        let err = h.queries.remind(receipt.order_id, h.user).unwrap_err();

        assert!(matches!(err, DomainError::InvalidState(OrderStatus::Cancelled)));
        assert_eq!(
            h.notifier
                .count(receipt.order_id, NotificationKind::CustomerReminder),
            0
        );
    }

    #[test]
    fn staff_search_and_statistics() {
        let h = Harness::new();
        let a = h.place_order();
        let b = h.place_order_for(Uuid::new_v4());
        h.pay(&a).unwrap();
        h.pay(&b).unwrap();
        h.orders.confirm(b.order_id, Utc::now()).unwrap();
        h.place_order();

        let stats = h.queries.statistics().unwrap();
        assert_eq!(
            stats,
            OrderStatistics {
                to_be_confirmed: 1,
                confirmed: 1,
                in_delivery: 0
            }
        );

        let by_number = h
            .queries
            .search(
                &OrderSearch {
                    number: Some(b.order_number[10..].to_string()),
                    ..OrderSearch::default()
                },
                PageRequest::new(1, 10),
            )
            .unwrap();
        assert_eq!(by_number.total, 1);
        assert_eq!(by_number.items[0].order.id, b.order_id);

        let all = h
            .queries
            .search(&OrderSearch::default(), PageRequest::new(1, 10))
            .unwrap();
        assert_eq!(all.total, 3);
    }
}
