/// Runs one work item through the external tool with bounded retry.
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::models::{DownloadOutcome, RejectReason, WorkItem};
use crate::runner::{DownloadRequest, ToolRunner};

pub struct DownloadExecutor<R: ?Sized> {
    runner: std::sync::Arc<R>,
    /// Passed as `--cookies` when the file exists at dispatch time.
    cookie_file: PathBuf,
}

impl<R> DownloadExecutor<R>
where
    R: ToolRunner + ?Sized,
{
    pub fn new(runner: std::sync::Arc<R>, cookie_file: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cookie_file: cookie_file.into(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn cookie_argument(&self) -> Option<PathBuf> {
        if self.cookie_file.is_file() {
            debug!("Using cookie file {:?}", self.cookie_file);
            Some(self.cookie_file.clone())
        } else {
            None
        }
    }

    /// Download `item`, making at most `max_retries` identical attempts.
    ///
    /// Invalid items and unusable destinations are rejected before the tool
    /// is ever spawned.
    pub async fn execute(&self, item: &WorkItem, max_retries: u32) -> DownloadOutcome {
        if let Err(reason) = item.validate() {
            warn!("Rejected {:?}: {}", item.target, reason);
            return DownloadOutcome::Rejected(reason);
        }
        let destination = item.destination.as_deref().unwrap_or_default();

        if let Err(e) = tokio::fs::create_dir_all(destination).await {
            warn!("Cannot create destination {}: {}", destination, e);
            return DownloadOutcome::Rejected(RejectReason::DestinationUnavailable {
                path: destination.to_string(),
                reason: e.to_string(),
            });
        }

        let request = DownloadRequest {
            target: item.target.clone(),
            format_selector: item.format_selector.clone(),
            output_template: DownloadRequest::output_template_for(Path::new(destination)),
            cookie_file: self.cookie_argument(),
        };

        let mut last_error = String::from("no attempts made");
        for attempt in 1..=max_retries {
            match self.runner.download(&request).await {
                Ok(()) => {
                    info!("Downloaded {} on attempt {}/{}", item.target, attempt, max_retries);
                    return DownloadOutcome::Success { attempts: attempt };
                }
                Err(e) if !e.is_retriable() => {
                    warn!("Download of {} stopped on attempt {}: {}", item.target, attempt, e);
                    return DownloadOutcome::Cancelled { attempts: attempt };
                }
                Err(e) => {
                    warn!("Attempt {}/{} for {} failed: {}", attempt, max_retries, item.target, e);
                    last_error = e.to_string();
                }
            }
        }

        DownloadOutcome::Failed {
            attempts: max_retries,
            last_error,
        }
    }
}
