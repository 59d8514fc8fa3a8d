//! Scripted `ToolRunner` double for unit tests.
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::RunnerError;
use crate::runner::{DownloadRequest, ToolRunner};

/// Scripted result of one download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Ok,
    ExitNonZero,
    SpawnError,
    Cancelled,
}

impl Attempt {
    fn into_result(self) -> Result<(), RunnerError> {
        match self {
            Attempt::Ok => Ok(()),
            Attempt::ExitNonZero => Err(RunnerError::Exited(1)),
            Attempt::SpawnError => Err(RunnerError::SpawnFailed {
                program: "yt-dlp".into(),
                reason: "scripted".into(),
            }),
            Attempt::Cancelled => Err(RunnerError::Cancelled),
        }
    }
}

#[derive(Default)]
pub struct ScriptedRunner {
    /// `None` makes the listing invocation fail.
    pub formats: Option<String>,
    pub playlist: Option<String>,
    pub version: Option<String>,
    /// Consumed front to back, then `fallback` applies.
    pub script: Mutex<VecDeque<Attempt>>,
    /// Targets that always get this result, ahead of the script.
    pub per_target: HashMap<String, Attempt>,
    pub fallback: Option<Attempt>,
    pub calls: Mutex<Vec<DownloadRequest>>,
}

impl ScriptedRunner {
    pub fn always(attempt: Attempt) -> Self {
        Self {
            fallback: Some(attempt),
            ..Default::default()
        }
    }

    pub fn scripted(attempts: &[Attempt], fallback: Attempt) -> Self {
        Self {
            script: Mutex::new(attempts.iter().copied().collect()),
            fallback: Some(fallback),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: &str, attempt: Attempt) -> Self {
        self.per_target.insert(target.to_string(), attempt);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn called_targets(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.target.clone()).collect()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn list_formats(&self, _target: &str) -> Result<String, RunnerError> {
        self.formats.clone().ok_or(RunnerError::Exited(1))
    }

    async fn flat_playlist(&self, _target: &str) -> Result<String, RunnerError> {
        self.playlist.clone().ok_or(RunnerError::Exited(1))
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), RunnerError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(attempt) = self.per_target.get(&request.target) {
            return attempt.into_result();
        }
        let next = self.script.lock().unwrap().pop_front();
        next.or(self.fallback).unwrap_or(Attempt::ExitNonZero).into_result()
    }

    async fn version(&self) -> Result<String, RunnerError> {
        self.version.clone().ok_or(RunnerError::Exited(1))
    }
}
