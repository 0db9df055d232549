use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::ports::{NotificationKind, NotificationSink, OrderRepository};
use crate::domain::state_machine::{OrderEvent, OrderStatus, StatusChange};

pub const TIMEOUT_CANCEL_REASON: &str = "Payment timed out";

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    /// Unpaid orders older than this are cancelled.
    pub payment_timeout: Duration,
    /// Paid orders unconfirmed for longer than this trigger a staff reminder.
    pub confirm_reminder_after: Duration,
    pub interval: StdDuration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::minutes(15),
            confirm_reminder_after: Duration::minutes(60),
            interval: StdDuration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub cancelled: usize,
    /// Orders that left `AwaitingPayment` between the query and the update.
    pub skipped: usize,
    pub reminded: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        *self == SweepReport::default()
    }
}

/// Periodic pass that cancels stale unpaid orders and nudges staff about
/// paid orders nobody has confirmed.
pub struct TimeoutSweep<O, N> {
    orders: O,
    notifier: N,
    settings: SweepSettings,
}

impl<O: OrderRepository, N: NotificationSink> TimeoutSweep<O, N> {
    pub fn new(orders: O, notifier: N, settings: SweepSettings) -> Self {
        Self {
            orders,
            notifier,
            settings,
        }
    }

    /// One pass. Never fails as a whole: query and per-order errors are
    /// logged and counted, and the pass moves on.
    pub fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        match self.orders.find_submitted_before(
            OrderStatus::AwaitingPayment,
            now - self.settings.payment_timeout,
        ) {
            Ok(stale) => {
                for order in stale {
                    match self.cancel_unpaid(&order, now) {
                        Ok(true) => report.cancelled += 1,
                        Ok(false) => report.skipped += 1,
                        Err(e) => {
                            log::warn!("timeout sweep could not cancel order {}: {}", order.number, e);
                            report.failed += 1;
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("timeout sweep could not query unpaid orders: {}", e);
                report.failed += 1;
            }
        }

        match self.orders.find_submitted_before(
            OrderStatus::ToBeConfirmed,
            now - self.settings.confirm_reminder_after,
        ) {
            Ok(overdue) => {
                for order in overdue {
                    self.notifier
                        .notify(order.id, NotificationKind::ConfirmationOverdue);
                    report.reminded += 1;
                }
            }
            Err(e) => {
                log::warn!("timeout sweep could not query unconfirmed orders: {}", e);
                report.failed += 1;
            }
        }

        if report.is_idle() {
            log::debug!("timeout sweep: nothing to do");
        } else {
            log::info!(
                "timeout sweep: cancelled={} skipped={} reminded={} failed={}",
                report.cancelled,
                report.skipped,
                report.reminded,
                report.failed
            );
        }
        report
    }

    fn cancel_unpaid(&self, order: &Order, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let change = StatusChange::plan(
            OrderStatus::AwaitingPayment,
            order.pay_status,
            OrderEvent::PaymentTimedOut,
            now,
        )?
        .with_cancel_reason(TIMEOUT_CANCEL_REASON);
        self.orders
            .transition(order.id, OrderStatus::AwaitingPayment, &change)
    }

    /// Runs [`run_once`](Self::run_once) every `settings.interval` on the
    /// blocking pool until `shutdown` flips to `true` or its sender is
    /// dropped. A pass in flight is allowed to finish.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!(
                "timeout sweep started: every {:?}, payment timeout {} min, reminder after {} min",
                self.settings.interval,
                self.settings.payment_timeout.num_minutes(),
                self.settings.confirm_reminder_after.num_minutes()
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let sweep = Arc::clone(&self);
                if let Err(e) = tokio::task::spawn_blocking(move || sweep.run_once(Utc::now())).await {
                    log::error!("timeout sweep pass panicked: {}", e);
                }
            }
            log::info!("timeout sweep stopped");
        })
    }
}
