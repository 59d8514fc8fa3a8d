/// Data models shared by the YTGet core and the menu front end.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single request to obtain media.
///
/// Field names on disk follow the snapshot layout older YTGet releases wrote,
/// so existing `YTGet_Conf.json` files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(rename = "url", default)]
    pub target: String,
    #[serde(rename = "format_code", default)]
    pub format_selector: String,
    #[serde(rename = "download_path", default)]
    pub destination: Option<String>,
}

impl WorkItem {
    pub fn new(
        target: impl Into<String>,
        format_selector: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            format_selector: format_selector.into(),
            destination: Some(destination.into()),
        }
    }

    /// Fill an absent or blank destination from `fallback`.
    pub fn with_fallback_destination(mut self, fallback: &str) -> Self {
        let blank = self.destination.as_deref().map_or(true, |d| d.trim().is_empty());
        if blank {
            self.destination = Some(fallback.to_string());
        }
        self
    }

    /// Check that target, format selector and destination are all non-empty.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if self.target.trim().is_empty() {
            return Err(RejectReason::EmptyTarget);
        }
        if self.format_selector.trim().is_empty() {
            return Err(RejectReason::EmptyFormat);
        }
        match self.destination.as_deref() {
            Some(d) if !d.trim().is_empty() => Ok(()),
            _ => Err(RejectReason::EmptyDestination),
        }
    }
}

/// The persisted snapshot: default destination plus pending and failed work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(rename = "download_path", default)]
    pub default_destination: Option<String>,
    /// FIFO: insertion order is processing order.
    #[serde(rename = "queue", default)]
    pub pending: Vec<WorkItem>,
    #[serde(rename = "failed_downloads", default)]
    pub failed: Vec<WorkItem>,
}

impl QueueState {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove the first pending entry equal to `item`.
    pub fn take_pending(&mut self, item: &WorkItem) -> bool {
        match self.pending.iter().position(|p| p == item) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Named format selectors offered by the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPreset {
    BestAudio,
    BestVideoAudio,
    Custom(String),
}

impl FormatPreset {
    pub fn selector(&self) -> &str {
        match self {
            FormatPreset::BestAudio => "bestaudio/best",
            FormatPreset::BestVideoAudio => "bestvideo+bestaudio/best",
            FormatPreset::Custom(code) => code,
        }
    }
}

impl std::fmt::Display for FormatPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatPreset::BestAudio => write!(f, "best audio"),
            FormatPreset::BestVideoAudio => write!(f, "best video+audio"),
            FormatPreset::Custom(code) => write!(f, "format {}", code),
        }
    }
}

/// Why an item was refused before any process was spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("target is empty")]
    EmptyTarget,

    #[error("format selector is empty")]
    EmptyFormat,

    #[error("destination path is empty")]
    EmptyDestination,

    #[error("cannot create destination {path}: {reason}")]
    DestinationUnavailable { path: String, reason: String },
}

/// Result of running one work item through the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success { attempts: u32 },
    /// Every attempt failed; `last_error` describes the final one.
    Failed { attempts: u32, last_error: String },
    Rejected(RejectReason),
    Cancelled { attempts: u32 },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }

    /// Number of times the external tool was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            DownloadOutcome::Success { attempts }
            | DownloadOutcome::Failed { attempts, .. }
            | DownloadOutcome::Cancelled { attempts } => *attempts,
            DownloadOutcome::Rejected(_) => 0,
        }
    }
}

/// Summary of one queue-processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Nothing was pending when the run started.
    pub empty: bool,
    pub succeeded: Vec<WorkItem>,
    pub failed: Vec<WorkItem>,
    /// Items still pending when the run stopped early.
    pub remaining: usize,
    pub interrupted: bool,
}

impl QueueReport {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
