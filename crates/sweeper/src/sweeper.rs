//! The sweep loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::{DomainError, Order, OrderError, OrderLifecycle};
use futures_util::{StreamExt, stream};
use store::{InventoryStore, OrderId, OrderStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{Result, SweepError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Candidates fetched per query.
    pub batch_size: usize,

    /// Orders expired at the same time.
    pub concurrency: usize,

    /// Time between runs of the background task.
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 8,
            interval: Duration::from_secs(300),
        }
    }
}

/// What one run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates the run tried to expire.
    pub examined: usize,
    pub expired: usize,

    /// Candidates that were paid, cancelled or extended before the run got
    /// to them.
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: Outcome) {
        self.examined += 1;
        match outcome {
            Outcome::Expired => self.expired += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Expired,
    Skipped,
    Failed,
}

/// Cancels unpaid orders whose payment deadline has passed.
pub struct ExpirationSweeper<S> {
    lifecycle: Arc<OrderLifecycle<S>>,
    config: SweeperConfig,
}

impl<S> ExpirationSweeper<S>
where
    S: OrderStore + InventoryStore + Clone + 'static,
{
    pub fn new(lifecycle: Arc<OrderLifecycle<S>>, config: SweeperConfig) -> Self {
        Self { lifecycle, config }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Runs one sweep over everything currently past due.
    ///
    /// Candidates are fetched in batches from the expiration index. An order
    /// that fails stays in the index, so the run stops once a query returns
    /// nothing it has not already tried; the next run picks those up again.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let mut report = SweepReport::default();
        let mut tried = HashSet::new();

        loop {
            let batch = self
                .lifecycle
                .expired_orders(batch_size)
                .await
                .map_err(SweepError::Query)?;
            let full = batch.len() >= batch_size;

            let fresh: Vec<OrderId> = batch
                .iter()
                .map(Order::id)
                .filter(|id| tried.insert(*id))
                .collect();
            if fresh.is_empty() {
                break;
            }

            let outcomes: Vec<Outcome> = stream::iter(fresh)
                .map(|order_id| self.expire(order_id))
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;
            for outcome in outcomes {
                report.record(outcome);
            }

            if !full {
                break;
            }
        }

        metrics::counter!("sweeper_runs_total").increment(1);
        metrics::histogram!("sweep_duration_seconds").record(started.elapsed().as_secs_f64());

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                "sweep finished"
            );
        } else {
            tracing::debug!("sweep found nothing to expire");
        }

        Ok(report)
    }

    async fn expire(&self, order_id: OrderId) -> Outcome {
        match self.lifecycle.expire_order(order_id).await {
            Ok(order) => {
                metrics::counter!("sweeper_orders_expired_total").increment(1);
                tracing::debug!(%order_id, order_number = order.order_number(), "order expired");
                Outcome::Expired
            }
            Err(e) if no_longer_expirable(&e) => {
                tracing::debug!(%order_id, reason = %e, "order skipped");
                Outcome::Skipped
            }
            Err(e) => {
                metrics::counter!("sweeper_failures_total").increment(1);
                tracing::error!(%order_id, error = %e, "failed to expire order");
                Outcome::Failed
            }
        }
    }

    /// Starts the periodic background task.
    ///
    /// The first run starts immediately. A run in progress is finished
    /// before the task honours a shutdown request.
    pub fn spawn(self: Arc<Self>) -> SweeperHandle {
        let (shutdown, mut stop) = watch::channel(false);
        let interval = self.config.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = interval.as_secs(), "expiration sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            metrics::counter!("sweeper_failures_total").increment(1);
                            tracing::error!(error = %e, "sweep failed");
                        }
                    }
                    _ = stop.changed() => break,
                }
            }

            tracing::info!("expiration sweeper stopped");
        });

        SweeperHandle { shutdown, task }
    }
}

/// The order moved on between the query and the lock: paid, cancelled,
/// extended, or removed.
fn no_longer_expirable(error: &DomainError) -> bool {
    matches!(
        error,
        DomainError::OrderNotFound(_)
            | DomainError::Order(
                OrderError::AlreadyCancelled
                    | OrderError::AlreadyConfirmed
                    | OrderError::NotExpired { .. }
                    | OrderError::InvalidTransition { .. }
            )
    )
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Asks the task to stop and waits for it.
    pub async fn shutdown(self) -> Result<()> {
        // The task may already be gone; joining reports how it ended.
        let _ = self.shutdown.send(true);
        self.task.await?;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_every_outcome() {
        let mut report = SweepReport::default();
        report.record(Outcome::Expired);
        report.record(Outcome::Expired);
        report.record(Outcome::Skipped);
        report.record(Outcome::Failed);

        assert_eq!(
            report,
            SweepReport {
                examined: 4,
                expired: 2,
                skipped: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_skippable_errors() {
        assert!(no_longer_expirable(&DomainError::OrderNotFound("x".into())));
        assert!(no_longer_expirable(&DomainError::Order(
            OrderError::AlreadyCancelled
        )));
        assert!(!no_longer_expirable(&DomainError::Timeout("order save")));
    }
}
