/// yt-dlp subprocess runner.
///
/// Every invocation is a fresh child process. Captured invocations read stdout
/// into memory and forward stderr to tracing. Downloads inherit the terminal
/// so the tool's own progress output stays visible. Each wait races the
/// shared cancellation token, and a cancelled child is killed.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::RunnerError;

/// Arguments for one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub target: String,
    pub format_selector: String,
    pub output_template: String,
    pub cookie_file: Option<PathBuf>,
}

impl DownloadRequest {
    /// Output template placing `<title>.<ext>` inside `destination`.
    pub fn output_template_for(destination: &Path) -> String {
        destination
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .to_string()
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            self.format_selector.clone().into(),
            self.target.clone().into(),
            "-o".into(),
            self.output_template.clone().into(),
        ];
        if let Some(cookies) = &self.cookie_file {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }
        args
    }
}

/// The invocation shapes the core needs from the external executable.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Raw "list formats" output for a target.
    async fn list_formats(&self, target: &str) -> Result<String, RunnerError>;

    /// One JSON record per line describing each playlist entry.
    async fn flat_playlist(&self, target: &str) -> Result<String, RunnerError>;

    /// Run one download attempt; `Ok` only on a zero exit status.
    async fn download(&self, request: &DownloadRequest) -> Result<(), RunnerError>;

    /// The tool's self-reported version string.
    async fn version(&self) -> Result<String, RunnerError>;
}

/// Runs the real yt-dlp executable.
#[derive(Debug, Clone)]
pub struct YtDlpRunner {
    program: PathBuf,
    cancel: CancellationToken,
}

impl YtDlpRunner {
    pub fn new(program: impl Into<PathBuf>, cancel: CancellationToken) -> Self {
        Self {
            program: program.into(),
            cancel,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> Result<Child, RunnerError> {
        if self.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }
        let child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: self.program.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Spawned {:?} (pid: {:?})", self.program, child.id());
        Ok(child)
    }

    /// Wait for the child, killing it if the cancellation token fires first.
    async fn wait(&self, child: &mut Child) -> Result<(), RunnerError> {
        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| RunnerError::Wait(e.to_string()))?;
                RunnerError::check_status(status)
            }
            _ = self.cancel.cancelled() => {
                warn!("Cancellation requested, killing {:?}", self.program);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill child: {}", e);
                }
                Err(RunnerError::Cancelled)
            }
        }
    }

    /// Run with piped stdout and return it once the tool exits cleanly.
    async fn capture(&self, args: &[&str]) -> Result<String, RunnerError> {
        let mut cmd = self.command(args.iter().copied());
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = self.spawn(cmd)?;

        let stdout = child.stdout.take().ok_or(RunnerError::MissingStdio("stdout"))?;
        let stderr = child.stderr.take().ok_or(RunnerError::MissingStdio("stderr"))?;

        let _stderr_handle = tokio::spawn(forward_stderr(stderr));
        let stdout_handle = tokio::spawn(async move {
            let mut text = String::new();
            let mut reader = BufReader::new(stdout);
            reader.read_to_string(&mut text).await.map(|_| text)
        });

        self.wait(&mut child).await?;

        match stdout_handle.await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RunnerError::Wait(format!("reading stdout: {}", e))),
            Err(e) => Err(RunnerError::Wait(format!("stdout reader task: {}", e))),
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "ytdlp", "{}", line);
    }
}

#[async_trait]
impl ToolRunner for YtDlpRunner {
    async fn list_formats(&self, target: &str) -> Result<String, RunnerError> {
        self.capture(&["-F", target]).await
    }

    async fn flat_playlist(&self, target: &str) -> Result<String, RunnerError> {
        self.capture(&["--flat-playlist", "-j", target]).await
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), RunnerError> {
        info!("Running {:?} -f {} {}", self.program, request.format_selector, request.target);
        let mut cmd = self.command(request.to_args());
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let mut child = self.spawn(cmd)?;
        self.wait(&mut child).await
    }

    async fn version(&self) -> Result<String, RunnerError> {
        let out = self.capture(&["--version"]).await?;
        Ok(out.trim().to_string())
    }
}
