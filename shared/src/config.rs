/// Runtime configuration read from the environment (and `.env`).
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Retry bound shared by immediate and queued downloads.
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_QUEUE_FILE: &str = "YTGet_Conf.json";
pub const DEFAULT_COOKIE_FILE: &str = "cookies.txt";
pub const DEFAULT_PROBE_URL: &str = "https://www.youtube.com";
pub const DEFAULT_TOOL_RELEASES: &str = "https://api.github.com/repos/yt-dlp/yt-dlp/releases/latest";

#[derive(Debug, Clone)]
pub struct Config {
    pub ytdlp_bin: PathBuf,
    pub queue_file: PathBuf,
    pub cookie_file: PathBuf,
    pub max_retries: u32,
    pub probe_url: String,
    pub probe_timeout: Duration,
    pub tool_releases_url: String,
    pub skip_update_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp_bin: PathBuf::from(default_ytdlp_bin()),
            queue_file: PathBuf::from(DEFAULT_QUEUE_FILE),
            cookie_file: PathBuf::from(DEFAULT_COOKIE_FILE),
            max_retries: DEFAULT_MAX_RETRIES,
            probe_url: DEFAULT_PROBE_URL.to_string(),
            probe_timeout: Duration::from_secs(5),
            tool_releases_url: DEFAULT_TOOL_RELEASES.to_string(),
            skip_update_check: false,
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read `YTDLP_BIN` / `YTGET_*` variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_retries = parse_or("YTGET_MAX_RETRIES", lookup("YTGET_MAX_RETRIES"), defaults.max_retries);
        let probe_secs = parse_or("YTGET_PROBE_TIMEOUT_SECS", lookup("YTGET_PROBE_TIMEOUT_SECS"), 5u64);

        Self {
            ytdlp_bin: lookup("YTDLP_BIN").map(PathBuf::from).unwrap_or(defaults.ytdlp_bin),
            queue_file: lookup("YTGET_QUEUE_FILE").map(PathBuf::from).unwrap_or(defaults.queue_file),
            cookie_file: lookup("YTGET_COOKIE_FILE").map(PathBuf::from).unwrap_or(defaults.cookie_file),
            // zero attempts would make every download fail without trying
            max_retries: max_retries.max(1),
            probe_url: lookup("YTGET_PROBE_URL").unwrap_or(defaults.probe_url),
            probe_timeout: Duration::from_secs(probe_secs),
            tool_releases_url: lookup("YTGET_TOOL_RELEASES").unwrap_or(defaults.tool_releases_url),
            skip_update_check: parse_or("YTGET_SKIP_UPDATE_CHECK", lookup("YTGET_SKIP_UPDATE_CHECK"), false),
        }
    }
}

fn default_ytdlp_bin() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {:?}", key, value, default);
            default
        }),
    }
}
