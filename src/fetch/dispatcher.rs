//! Concurrent fetch dispatcher
//!
//! Fans a batch of identifiers out to one worker task each, waits for every
//! worker, and compacts the results:
//! - Concurrency is capped by a semaphore (or unbounded when the cap is 0)
//! - Workers report through a channel that is drained once after the join
//! - A failed, panicked or timed-out worker contributes no record
//! - Surviving records come back in input order
//!
//! Nothing a worker does can fail the batch itself.

use crate::config::FetcherConfig;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Why one identifier contributed no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub identifier: String,
    pub reason: String,
}

/// Outcome of one batch: compacted records plus what was dropped
#[derive(Debug, Clone)]
pub struct BatchReport<T> {
    /// One record per successful identifier, in input order
    pub records: Vec<T>,

    /// One entry per identifier that degraded, in input order
    pub failures: Vec<ItemFailure>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// True when no identifier was dropped
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of identifiers the batch was asked for
    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    /// Identifiers that produced no record
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.identifier.as_str()).collect()
    }
}

struct WorkerOutcome<T> {
    index: usize,
    result: Result<T, String>,
}

/// Spawn-and-join dispatcher with an optional concurrency cap and deadline
///
/// The cap applies to each batch separately; concurrent batches on one
/// dispatcher do not share permits.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    limit: Option<usize>,
    deadline: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher
    ///
    /// # Arguments
    ///
    /// * `max_concurrency` - Maximum in-flight workers per batch; 0 means one per identifier
    /// * `deadline` - Optional bound on the whole batch
    pub fn new(max_concurrency: usize, deadline: Option<Duration>) -> Self {
        Self {
            limit: (max_concurrency > 0).then_some(max_concurrency),
            deadline,
        }
    }

    /// A dispatcher that launches every worker at once and never gives up
    pub fn unbounded() -> Self {
        Self::new(0, None)
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(config.max_concurrent_fetches, config.batch_deadline())
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.limit
    }

    /// Runs `fetch_one` for every identifier and returns the successful records
    ///
    /// See [`Dispatcher::dispatch_report`] for the failure details this drops.
    pub async fn dispatch<I, C, T, E, F, Fut>(&self, ids: Vec<I>, context: C, fetch_one: F) -> Vec<T>
    where
        I: Display,
        C: Clone,
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(I, C) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.dispatch_report(ids, context, fetch_one).await.records
    }

    /// Runs `fetch_one` for every identifier and reports records and failures
    ///
    /// # Arguments
    ///
    /// * `ids` - Identifiers to fetch; duplicates are fetched once per occurrence
    /// * `context` - Read-only context cloned into every worker
    /// * `fetch_one` - Builds the worker future for one identifier
    ///
    /// # Returns
    ///
    /// A [`BatchReport`] whose records and failures together cover every input
    /// position exactly once. An empty input returns an empty report without
    /// calling `fetch_one`.
    pub async fn dispatch_report<I, C, T, E, F, Fut>(
        &self,
        ids: Vec<I>,
        context: C,
        fetch_one: F,
    ) -> BatchReport<T>
    where
        I: Display,
        C: Clone,
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(I, C) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if ids.is_empty() {
            return BatchReport::default();
        }

        let labels: Vec<String> = ids.iter().map(ToString::to_string).collect();
        tracing::debug!(
            "Dispatching {} workers (limit: {:?})",
            labels.len(),
            self.limit
        );

        let semaphore = self.limit.map(|n| Arc::new(Semaphore::new(n)));
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerOutcome<T>>();
        let mut workers = JoinSet::new();

        for (index, id) in ids.into_iter().enumerate() {
            let task = fetch_one(id, context.clone());
            let permits = semaphore.clone();
            let tx = tx.clone();

            workers.spawn(async move {
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let result = task.await.map_err(|e| e.to_string());
                // The receiver outlives every worker; a send error cannot happen
                let _ = tx.send(WorkerOutcome { index, result });
            });
        }
        drop(tx);

        self.join_all(&mut workers).await;

        let mut outcomes: Vec<Option<Result<T, String>>> = labels.iter().map(|_| None).collect();
        while let Ok(outcome) = rx.try_recv() {
            outcomes[outcome.index] = Some(outcome.result);
        }

        let mut report = BatchReport::default();
        for (identifier, outcome) in labels.into_iter().zip(outcomes) {
            match outcome {
                Some(Ok(record)) => report.records.push(record),
                Some(Err(reason)) => {
                    tracing::warn!("Dropping {}: {}", identifier, reason);
                    report.failures.push(ItemFailure { identifier, reason });
                }
                None => {
                    tracing::warn!("Dropping {}: worker did not complete", identifier);
                    report.failures.push(ItemFailure {
                        identifier,
                        reason: "worker did not complete".to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch finished: {} of {} records fetched",
            report.records.len(),
            report.attempted()
        );
        report
    }

    /// Waits for every worker, aborting stragglers once the deadline passes
    async fn join_all(&self, workers: &mut JoinSet<()>) {
        let Some(deadline) = self.deadline else {
            drain(workers).await;
            return;
        };

        let finished = tokio::time::timeout(deadline, drain(workers)).await.is_ok();
        if !finished {
            tracing::warn!(
                "Batch deadline of {:?} passed, aborting {} workers",
                deadline,
                workers.len()
            );
            workers.abort_all();
            drain(workers).await;
        }
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!("Worker panicked: {}", e);
            }
        }
    }
}
