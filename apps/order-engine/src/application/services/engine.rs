//! Order Engine (worker pool)
//!
//! Runs a pool of identical workers. Each tick a worker evaluates one page of
//! pending orders and then dispatches one page of due triggered orders.
//! Workers share the pending-scan cursor so consecutive pages spread across
//! the backlog. Correctness never depends on which worker handles an order:
//! every status change is a compare-and-swap in the ledger.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ExecutionVenuePort, MarketDataPort};
use crate::application::use_cases::{
    DispatchOrderUseCase, DispatchReport, EvaluateTriggersUseCase, EvaluationReport,
};
use crate::domain::order_management::{OrderError, OrderLedger, PendingQuery, ScanKey};
use crate::domain::quota::QuotaLedger;
use crate::domain::shared::Timestamp;

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Number of workers.
    pub workers: usize,
    /// Page size for evaluation and dispatch.
    pub batch_size: usize,
    /// Delay between ticks of one worker.
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: 100,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Outcome of one worker cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Evaluation counters.
    pub evaluation: EvaluationReport,
    /// Dispatch counters.
    pub dispatch: DispatchReport,
}

/// Evaluator/dispatcher worker pool.
pub struct OrderEngine<L, Q, V, M>
where
    L: OrderLedger,
    Q: QuotaLedger,
    V: ExecutionVenuePort,
    M: MarketDataPort,
{
    evaluate: EvaluateTriggersUseCase<L, M>,
    dispatch: DispatchOrderUseCase<L, Q, V>,
    settings: EngineSettings,
    cursor: Mutex<Option<ScanKey>>,
    shutdown: CancellationToken,
}

impl<L, Q, V, M> OrderEngine<L, Q, V, M>
where
    L: OrderLedger + 'static,
    Q: QuotaLedger + 'static,
    V: ExecutionVenuePort + 'static,
    M: MarketDataPort + 'static,
{
    /// Create a new engine.
    pub fn new(
        evaluate: EvaluateTriggersUseCase<L, M>,
        dispatch: DispatchOrderUseCase<L, Q, V>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            evaluate,
            dispatch,
            settings,
            cursor: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Engine settings.
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Token cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop all workers after their current cycle.
    pub fn shutdown(&self) {
        tracing::info!("Order engine shutting down");
        self.shutdown.cancel();
    }

    /// Run one evaluate-then-dispatch cycle now.
    ///
    /// # Errors
    ///
    /// Returns error if a page cannot be read from the ledger.
    pub async fn run_cycle(&self) -> Result<CycleReport, OrderError> {
        self.run_cycle_at(Timestamp::now()).await
    }

    /// Run one cycle with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns error if a page cannot be read from the ledger.
    pub async fn run_cycle_at(&self, now: Timestamp) -> Result<CycleReport, OrderError> {
        let after = self.cursor.lock().clone();
        let query = PendingQuery {
            asset: None,
            after,
            limit: self.settings.batch_size,
        };

        let evaluation = self.evaluate.execute(query, now).await?;
        *self.cursor.lock() = evaluation.next_cursor.clone();

        let dispatch = self
            .dispatch
            .dispatch_due(now, self.settings.batch_size)
            .await?;

        Ok(CycleReport {
            evaluation,
            dispatch,
        })
    }

    /// Spawn the worker pool.
    ///
    /// Workers stop when [`OrderEngine::shutdown`] is called; await the
    /// returned handles to wait for them.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        tracing::info!(
            workers = self.settings.workers,
            batch_size = self.settings.batch_size,
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Starting order engine"
        );

        (0..self.settings.workers)
            .map(|worker| {
                let engine = Arc::clone(self);
                tokio::spawn(async move { engine.worker_loop(worker).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker: usize) {
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => {
                            if report.evaluation.fired > 0 || report.dispatch.attempted > 0 {
                                tracing::debug!(
                                    worker,
                                    fired = report.evaluation.fired,
                                    dispatched = report.dispatch.attempted,
                                    completed = report.dispatch.completed,
                                    "Worker cycle finished"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::warn!(worker, error = %e, "Worker cycle failed");
                        }
                    }
                }
                () = self.shutdown.cancelled() => {
                    tracing::info!(worker, "Worker shutting down");
                    break;
                }
            }
        }
    }
}
