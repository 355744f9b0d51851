use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::assignment::{attempt_assignment, complete_delivery, AssignmentOutcome};
use crate::models::assignment::AssignmentSource;
use crate::models::order::OrderStatus;
use crate::state::AppState;

/// Orders waiting longer than this are escalated in logs and metrics.
pub const STALE_PENDING_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub orders_completed: usize,
    pub orders_assigned: usize,
    pub still_waiting: usize,
    pub stale_pending: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    Ran(TickReport),
    Skipped,
}

pub fn run_scheduler_tick(state: &AppState, now: DateTime<Utc>) -> TickOutcome {
    let Ok(_guard) = state.tick_guard.try_lock() else {
        debug!("scheduler tick already running; skipping");
        state
            .metrics
            .scheduler_ticks_total
            .with_label_values(&["skipped"])
            .inc();
        return TickOutcome::Skipped;
    };

    let started = Instant::now();
    let mut report = TickReport::default();

    completion_pass(state, now, &mut report);
    assignment_pass(state, now, &mut report);

    state
        .metrics
        .scheduler_tick_seconds
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .scheduler_ticks_total
        .with_label_values(&["ran"])
        .inc();
    state.metrics.stale_pending_orders.set(report.stale_pending as i64);

    if report.orders_completed > 0 || report.orders_assigned > 0 || report.failures > 0 {
        info!(
            completed = report.orders_completed,
            assigned = report.orders_assigned,
            waiting = report.still_waiting,
            failures = report.failures,
            "scheduler tick finished"
        );
    }

    TickOutcome::Ran(report)
}

fn completion_pass(state: &AppState, now: DateTime<Utc>, report: &mut TickReport) {
    let due = state
        .store
        .orders_with_status(&[OrderStatus::OutForDelivery])
        .into_iter()
        .filter(|order| order.estimated_delivery_time.is_some_and(|eta| eta <= now));

    for order in due {
        match complete_delivery(&state.store, order.id, now) {
            Ok(_) => {
                report.orders_completed += 1;
                state.metrics.deliveries_completed_total.inc();
                info!(order_id = %order.id, "delivery completed");
            }
            Err(err) => {
                report.failures += 1;
                warn!(order_id = %order.id, error = %err, "failed to complete delivery");
            }
        }
    }
}

fn assignment_pass(state: &AppState, now: DateTime<Utc>, report: &mut TickReport) {
    let stale_after = chrono::Duration::minutes(STALE_PENDING_MINUTES);
    let waiting = state
        .store
        .orders_with_status(&[OrderStatus::Pending, OrderStatus::PendingAssignment]);

    for order in waiting {
        if state.store.is_checking_out(order.id) {
            continue;
        }
        match attempt_assignment(&state.store, order.id, now, AssignmentSource::Scheduler) {
            Ok(AssignmentOutcome::Assigned {
                assignment,
                completed_delivery,
                ..
            }) => {
                report.orders_assigned += 1;
                if completed_delivery.is_some() {
                    report.orders_completed += 1;
                    state.metrics.deliveries_completed_total.inc();
                }
                state.publish_assignment(&assignment);
            }
            Ok(AssignmentOutcome::NoCourier) => {
                report.still_waiting += 1;
                if now - order.created_at >= stale_after {
                    report.stale_pending += 1;
                    warn!(
                        order_id = %order.id,
                        waiting_minutes = (now - order.created_at).num_minutes(),
                        "order waiting for a courier past escalation window"
                    );
                }
            }
            Ok(AssignmentOutcome::NotAssignable(status)) => {
                debug!(order_id = %order.id, status = ?status, "order left the waiting set");
            }
            Err(err) => {
                report.failures += 1;
                warn!(order_id = %order.id, error = %err, "assignment attempt failed");
            }
        }
    }
}

/// Each tick runs in its own task so a panicking tick does not stop the loop.
pub fn spawn_scheduler(
    state: Arc<AppState>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "delivery scheduler started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let tick_state = Arc::clone(&state);
                    let handle = tokio::spawn(async move { run_scheduler_tick(&tick_state, Utc::now()) });

                    if let Err(err) = handle.await {
                        state
                            .metrics
                            .scheduler_ticks_total
                            .with_label_values(&["panicked"])
                            .inc();
                        error!(error = %err, "scheduler tick aborted");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("delivery scheduler stopped");
    })
}
