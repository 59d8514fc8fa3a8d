/// Line-oriented operator input that gives way to Ctrl-C.
use std::io::Write;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

/// The operator interrupted the session (Ctrl-C or closed stdin).
#[derive(Debug, Error)]
#[error("interrupted")]
pub struct Interrupted;

pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
    cancel: CancellationToken,
}

impl Prompt {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Read one line without printing anything first.
    pub async fn read_line(&mut self) -> Result<String, Interrupted> {
        tokio::select! {
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => Ok(line.trim().to_string()),
                Ok(None) | Err(_) => Err(Interrupted),
            },
            _ = self.cancel.cancelled() => Err(Interrupted),
        }
    }

    pub async fn ask(&mut self, question: &str) -> Result<String, Interrupted> {
        print!("{}", question);
        let _ = std::io::stdout().flush();
        self.read_line().await
    }

    pub async fn confirm(&mut self, question: &str) -> Result<bool, Interrupted> {
        let answer = self.ask(&format!("{} (y/n): ", question)).await?;
        Ok(is_yes(&answer))
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
