/// Sequential drain of the persisted download queue.
///
/// A run works from a copy of `pending` taken when it starts; items queued
/// afterwards wait for the next run. Each outcome is written back through
/// the store before the next item begins.
use std::path::PathBuf;

use tracing::{info, warn};

use crate::executor::DownloadExecutor;
use crate::models::{DownloadOutcome, QueueReport, QueueState, WorkItem};
use crate::queue_store::QueueStore;
use crate::runner::ToolRunner;

/// Progress notifications for whoever renders the run.
#[derive(Debug)]
pub enum QueueEvent<'a> {
    Started {
        item: &'a WorkItem,
        position: usize,
        total: usize,
    },
    Finished {
        item: &'a WorkItem,
        outcome: &'a DownloadOutcome,
    },
}

pub struct QueueProcessor<'a, R: ?Sized> {
    executor: &'a DownloadExecutor<R>,
    store: &'a QueueStore,
    max_retries: u32,
    /// Used when neither the item nor the state names a destination.
    working_dir: PathBuf,
}

impl<'a, R> QueueProcessor<'a, R>
where
    R: ToolRunner + ?Sized,
{
    pub fn new(executor: &'a DownloadExecutor<R>, store: &'a QueueStore, max_retries: u32) -> Self {
        Self {
            executor,
            store,
            max_retries,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    fn resolve(&self, item: &WorkItem, state: &QueueState) -> WorkItem {
        let fallback = state
            .default_destination
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| self.working_dir.to_string_lossy().to_string());
        item.clone().with_fallback_destination(&fallback)
    }

    pub async fn process(&self, state: &mut QueueState) -> QueueReport {
        self.process_with(state, |_| {}).await
    }

    /// Drain the queue in FIFO order, calling `on_event` around each item.
    pub async fn process_with<F>(&self, state: &mut QueueState, mut on_event: F) -> QueueReport
    where
        F: FnMut(QueueEvent<'_>),
    {
        let mut report = QueueReport::default();
        if state.pending.is_empty() {
            info!("Download queue is empty");
            report.empty = true;
            return report;
        }

        let batch = state.pending.clone();
        let total = batch.len();
        info!("Processing {} queued downloads", total);

        for (idx, item) in batch.iter().enumerate() {
            on_event(QueueEvent::Started {
                item,
                position: idx + 1,
                total,
            });

            let resolved = self.resolve(item, state);
            let outcome = self.executor.execute(&resolved, self.max_retries).await;

            if let DownloadOutcome::Cancelled { .. } = outcome {
                // The item stays pending for the next run.
                on_event(QueueEvent::Finished { item, outcome: &outcome });
                report.interrupted = true;
                break;
            }

            if !state.take_pending(item) {
                warn!("Queued item {} vanished from pending during the run", item.target);
            }
            if outcome.is_success() {
                report.succeeded.push(item.clone());
            } else {
                state.failed.push(item.clone());
                report.failed.push(item.clone());
            }
            self.store.persist(state);

            on_event(QueueEvent::Finished { item, outcome: &outcome });
        }

        report.remaining = state.pending.len();
        info!(
            "Queue run finished: {} succeeded, {} failed, {} remaining",
            report.succeeded.len(),
            report.failed.len(),
            report.remaining
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Attempt, ScriptedRunner};
    use std::sync::Arc;

    struct Fixture {
        executor: DownloadExecutor<ScriptedRunner>,
        store: QueueStore,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(runner: ScriptedRunner) -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                executor: DownloadExecutor::new(Arc::new(runner), dir.path().join("cookies.txt")),
                store: QueueStore::new(dir.path().join("YTGet_Conf.json")),
                dir,
            }
        }

        fn out(&self) -> String {
            self.dir.path().join("out").to_string_lossy().to_string()
        }

        fn processor(&self) -> QueueProcessor<'_, ScriptedRunner> {
            QueueProcessor::new(&self.executor, &self.store, 3).with_working_dir(self.dir.path())
        }
    }

    #[tokio::test]
    async fn test_empty_queue_returns_immediately() {
        let fx = Fixture::new(ScriptedRunner::always(Attempt::Ok));
        let mut state = QueueState::default();
        let report = fx.processor().process(&mut state).await;
        assert!(report.empty);
        assert_eq!(fx.executor.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_and_succeeded_items_are_binned() {
        let runner = ScriptedRunner::always(Attempt::Ok).with_target("V1", Attempt::ExitNonZero);
        let fx = Fixture::new(runner);
        let mut state = fx.store.load();
        let v1 = WorkItem::new("V1", "22", fx.out());
        let v2 = WorkItem::new("V2", "18", fx.out());
        fx.store.enqueue(&mut state, v1.clone());
        fx.store.enqueue(&mut state, v2.clone());

        let report = fx.processor().process(&mut state).await;

        assert!(state.pending.is_empty());
        assert_eq!(state.failed, vec![v1.clone()]);
        assert!(!state.failed.contains(&v2));
        assert_eq!(report.succeeded, vec![v2]);
        assert_eq!(report.failed, vec![v1]);
        // V1 used all three attempts, V2 one.
        assert_eq!(fx.executor.runner().call_count(), 4);
        assert_eq!(fx.store.load(), state);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let fx = Fixture::new(ScriptedRunner::always(Attempt::Ok));
        let mut state = QueueState::default();
        for target in ["A", "B", "C", "D", "E"] {
            fx.store.enqueue(&mut state, WorkItem::new(target, "22", fx.out()));
        }
        fx.processor().process(&mut state).await;
        assert_eq!(fx.executor.runner().called_targets(), vec!["A", "B", "C", "D", "E"]);
    }

    #[tokio::test]
    async fn test_item_queued_after_run_waits_for_next_run() {
        let fx = Fixture::new(ScriptedRunner::always(Attempt::Ok));
        let mut state = QueueState::default();
        fx.store.enqueue(&mut state, WorkItem::new("A", "22", fx.out()));

        let first = fx.processor().process(&mut state).await;
        fx.store.enqueue(&mut state, WorkItem::new("B", "22", fx.out()));
        assert_eq!(first.processed(), 1);
        assert_eq!(state.pending.len(), 1);

        let second = fx.processor().process(&mut state).await;
        assert_eq!(second.succeeded[0].target, "B");
        assert_eq!(fx.executor.runner().called_targets(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_missing_destination_uses_default_then_working_dir() {
        let fx = Fixture::new(ScriptedRunner::always(Attempt::Ok));
        let default_dir = fx.dir.path().join("default").to_string_lossy().to_string();
        let mut no_dest = WorkItem::new("A", "22", "");
        no_dest.destination = None;

        let mut state = QueueState {
            default_destination: Some(default_dir.clone()),
            pending: vec![no_dest.clone()],
            ..Default::default()
        };
        fx.processor().process(&mut state).await;

        state.default_destination = None;
        state.pending.push(no_dest);
        fx.processor().process(&mut state).await;

        let calls = fx.executor.runner().calls.lock().unwrap();
        assert!(calls[0].output_template.starts_with(&default_dir));
        assert!(calls[1]
            .output_template
            .starts_with(&*fx.dir.path().to_string_lossy()));
    }

    #[tokio::test]
    async fn test_rejected_item_goes_to_failed_and_run_continues() {
        let fx = Fixture::new(ScriptedRunner::always(Attempt::Ok));
        let blank_format = WorkItem::new("A", "", fx.out());
        let good = WorkItem::new("B", "22", fx.out());
        let mut state = QueueState {
            pending: vec![blank_format.clone(), good.clone()],
            ..Default::default()
        };
        let report = fx.processor().process(&mut state).await;
        assert_eq!(state.failed, vec![blank_format]);
        assert_eq!(report.succeeded, vec![good]);
        assert_eq!(fx.executor.runner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_leaves_rest_pending() {
        let runner = ScriptedRunner::scripted(&[Attempt::Ok, Attempt::Cancelled], Attempt::Ok);
        let fx = Fixture::new(runner);
        let mut state = QueueState::default();
        for target in ["A", "B", "C"] {
            fx.store.enqueue(&mut state, WorkItem::new(target, "22", fx.out()));
        }
        let report = fx.processor().process(&mut state).await;

        assert!(report.interrupted);
        assert_eq!(report.remaining, 2);
        let pending: Vec<&str> = state.pending.iter().map(|i| i.target.as_str()).collect();
        assert_eq!(pending, vec!["B", "C"]);
        assert!(state.failed.is_empty());
        assert_eq!(fx.store.load(), state);
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_does_not_stop_the_run() {
        let fx = Fixture::new(ScriptedRunner::always(Attempt::Ok).with_target("B", Attempt::ExitNonZero));
        let broken = QueueStore::new(fx.dir.path().join("missing").join("YTGet_Conf.json"));
        let mut state = QueueState {
            pending: vec![WorkItem::new("A", "22", fx.out()), WorkItem::new("B", "22", fx.out())],
            ..Default::default()
        };

        let report = QueueProcessor::new(&fx.executor, &broken, 2)
            .with_working_dir(fx.dir.path())
            .process(&mut state)
            .await;

        assert_eq!(report.processed(), 2);
        assert_eq!(report.succeeded.len(), 1);
        assert!(state.pending.is_empty());
        assert_eq!(state.failed.len(), 1);
        assert!(!broken.path().exists());
    }

    #[tokio::test]
    async fn test_each_item_lands_in_one_bin() {
        let runner = ScriptedRunner::always(Attempt::Ok)
            .with_target("B", Attempt::ExitNonZero)
            .with_target("D", Attempt::SpawnError);
        let fx = Fixture::new(runner);
        let mut state = QueueState::default();
        let items: Vec<WorkItem> = ["A", "B", "C", "D"]
            .iter()
            .map(|t| WorkItem::new(*t, "22", fx.out()))
            .collect();
        for item in &items {
            fx.store.enqueue(&mut state, item.clone());
        }
        let mut events = 0;
        fx.processor()
            .process_with(&mut state, |_| events += 1)
            .await;

        assert_eq!(events, 8);
        for item in &items {
            let in_pending = state.pending.contains(item) as u8;
            let in_failed = state.failed.iter().filter(|f| *f == item).count() as u8;
            assert!(in_pending + in_failed <= 1);
        }
        let failed: Vec<&str> = state.failed.iter().map(|i| i.target.as_str()).collect();
        assert_eq!(failed, vec!["B", "D"]);
    }
}
