use std::sync::Arc;

use crate::application::cart_service::CartService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::query_service::OrderQueryService;
use crate::application::submission_service::SubmissionService;
use crate::application::timeout_sweep::{SweepSettings, TimeoutSweep};
use crate::db::DbPool;
use crate::infrastructure::cart_repo::DieselCartRepository;
use crate::infrastructure::collaborators::{DieselAddressBook, DieselCatalog, OutboxNotifier};
use crate::infrastructure::order_repo::DieselOrderRepository;

pub type Sweep = TimeoutSweep<DieselOrderRepository, OutboxNotifier>;

/// Services shared by all request handlers.
pub struct AppState {
    pub cart: CartService<DieselCartRepository, DieselCatalog>,
    pub submission: SubmissionService<DieselCartRepository, DieselOrderRepository, DieselAddressBook>,
    pub payments: PaymentService<DieselOrderRepository, OutboxNotifier>,
    pub orders: OrderService<DieselOrderRepository, OutboxNotifier>,
    pub queries:
        OrderQueryService<DieselOrderRepository, DieselCartRepository, DieselCatalog, OutboxNotifier>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let cart = || {
            CartService::new(
                DieselCartRepository::new(pool.clone()),
                DieselCatalog::new(pool.clone()),
            )
        };

        AppState {
            cart: cart(),
            submission: SubmissionService::new(
                DieselCartRepository::new(pool.clone()),
                DieselOrderRepository::new(pool.clone()),
                DieselAddressBook::new(pool.clone()),
            ),
            payments: PaymentService::new(
                DieselOrderRepository::new(pool.clone()),
                OutboxNotifier::new(pool.clone()),
            ),
            orders: OrderService::new(
                DieselOrderRepository::new(pool.clone()),
                OutboxNotifier::new(pool.clone()),
            ),
            queries: OrderQueryService::new(
                DieselOrderRepository::new(pool.clone()),
                cart(),
                OutboxNotifier::new(pool.clone()),
            ),
        }
    }
}

pub fn build_sweep(pool: DbPool, settings: SweepSettings) -> Arc<Sweep> {
    Arc::new(TimeoutSweep::new(
        DieselOrderRepository::new(pool.clone()),
        OutboxNotifier::new(pool),
        settings,
    ))
}
