/// What to do with the machine once the queue has drained.
use std::io::Write;
use std::time::Duration;

use tracing::{error, info};

use crate::prompt::{Interrupted, Prompt};

const COUNTDOWN_SECS: u64 = 60;

const WINDOWS_SHUTDOWN: &[&str] = &["/s", "/t", "0"];
const WINDOWS_SLEEP: &[&str] = &["powrprof.dll,SetSuspendState", "0,1,0"];
const MACOS_SHUTDOWN: &[&str] = &["-h", "now"];
const MACOS_SLEEP: &[&str] = &["sleepnow"];
const SYSTEMD_SHUTDOWN: &[&str] = &["poweroff"];
const SYSTEMD_SLEEP: &[&str] = &["suspend"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostQueueAction {
    Idle,
    Shutdown,
    Sleep,
}

impl PostQueueAction {
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(PostQueueAction::Idle),
            "2" => Some(PostQueueAction::Shutdown),
            "3" => Some(PostQueueAction::Sleep),
            _ => None,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            PostQueueAction::Idle => "stay idle",
            PostQueueAction::Shutdown => "shut down",
            PostQueueAction::Sleep => "sleep",
        }
    }

    /// Platform power command, `None` for idle.
    pub fn command(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            PostQueueAction::Idle => None,
            PostQueueAction::Shutdown => Some(if cfg!(target_os = "windows") {
                ("shutdown", WINDOWS_SHUTDOWN)
            } else if cfg!(target_os = "macos") {
                ("shutdown", MACOS_SHUTDOWN)
            } else {
                ("systemctl", SYSTEMD_SHUTDOWN)
            }),
            PostQueueAction::Sleep => Some(if cfg!(target_os = "windows") {
                ("rundll32.exe", WINDOWS_SLEEP)
            } else if cfg!(target_os = "macos") {
                ("pmset", MACOS_SLEEP)
            } else {
                ("systemctl", SYSTEMD_SLEEP)
            }),
        }
    }
}

/// Count down, then run the power command unless the operator types `e`.
///
/// Returns true when the command was issued.
pub async fn run_after_countdown(action: PostQueueAction, prompt: &mut Prompt) -> Result<bool, Interrupted> {
    let Some((program, args)) = action.command() else {
        println!("System will remain idle.");
        return Ok(false);
    };

    let deadline = tokio::time::sleep(Duration::from_secs(COUNTDOWN_SECS));
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut remaining = COUNTDOWN_SECS;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            line = prompt.read_line() => {
                if line?.eq_ignore_ascii_case("e") {
                    println!("\n{} canceled.", capitalize(action.verb()));
                    return Ok(false);
                }
            }
            _ = ticker.tick() => {
                print!("\rSystem will {} in {:>2} seconds. Type 'e' + Enter to cancel. ", action.verb(), remaining);
                let _ = std::io::stdout().flush();
                remaining = remaining.saturating_sub(1);
            }
        }
    }
    println!();

    info!("Issuing power command: {} {:?}", program, args);
    match tokio::process::Command::new(program).args(args).status().await {
        Ok(status) if status.success() => Ok(true),
        Ok(status) => {
            error!("{} exited with {}", program, status);
            println!("Could not {} the system ({}).", action.verb(), status);
            Ok(false)
        }
        Err(e) => {
            error!("Failed to run {}: {}", program, e);
            println!("Could not {} the system: {}", action.verb(), e);
            Ok(false)
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
