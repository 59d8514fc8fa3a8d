//! Core of YTGet: a persistent download queue and retry engine driving yt-dlp.
pub mod config;
pub mod errors;
pub mod executor;
pub mod format_filter;
pub mod links;
pub mod models;
pub mod playlist;
pub mod queue_store;
pub mod release;
pub mod runner;
pub mod task_queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use errors::{PlaylistError, ReleaseError, RunnerError, StoreError};
pub use executor::DownloadExecutor;
pub use models::{DownloadOutcome, FormatPreset, QueueReport, QueueState, RejectReason, WorkItem};
pub use queue_store::QueueStore;
pub use runner::{DownloadRequest, ToolRunner, YtDlpRunner};
pub use task_queue::{QueueEvent, QueueProcessor};
