//! Periodic refresh of every data source into the snapshot
//!
//! Sources are fetched concurrently once per cycle. A failed source is
//! logged and its slot keeps whatever it held before; it never blocks or
//! aborts the other sources.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapters::DataSource;
use crate::domain::{Slot, Snapshot};

/// Result of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: Vec<Slot>,
    pub failed: Vec<Slot>,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sole writer of the snapshot
pub struct Refresher {
    sources: Vec<Arc<dyn DataSource>>,
    snapshot: Arc<Snapshot>,
}

impl Refresher {
    pub fn new(sources: Vec<Arc<dyn DataSource>>, snapshot: Arc<Snapshot>) -> Self {
        Self { sources, snapshot }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Fetch every source once and store the successes
    pub async fn refresh_cycle(&self) -> CycleReport {
        let fetches = self.sources.iter().map(|source| async move {
            let result = source.fetch().await;
            (source, result)
        });

        let mut report = CycleReport::default();
        for (source, result) in join_all(fetches).await {
            match result {
                Ok(payload) if payload.slot() == source.slot() => {
                    self.snapshot.replace(payload);
                    report.updated.push(source.slot());
                }
                Ok(payload) => {
                    warn!(
                        "Source {} returned a {} payload, ignoring",
                        source.name(),
                        payload.slot()
                    );
                    report.failed.push(source.slot());
                }
                Err(e) => {
                    warn!("Request failed, {} API call error: {}", source.name(), e);
                    report.failed.push(source.slot());
                }
            }
        }

        debug!(
            "Refresh cycle done: {} updated, {} failed",
            report.updated.len(),
            report.failed.len()
        );
        report
    }

    /// Run one cycle now and then one per `period` until stopped
    pub fn spawn(self, period: Duration) -> RefresherHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                "Refreshing {} sources every {:?}",
                self.sources.len(),
                period
            );
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        self.refresh_cycle().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Refresher stopped");
        });

        RefresherHandle { stop_tx, task }
    }
}

/// Handle to a running refresher task
pub struct RefresherHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signal the task and wait for it; an in-flight cycle finishes first
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Refresher task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
