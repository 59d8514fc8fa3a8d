/// Connectivity probe and yt-dlp release-feed lookups.
///
/// Failures here only ever degrade to "update unavailable"; nothing in this
/// module blocks queue processing.
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::ReleaseError;
use crate::runner::ToolRunner;

/// Release feed payload (GitHub "latest release" shape).
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    pub fn tag(&self) -> Result<&str, ReleaseError> {
        self.tag_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ReleaseError::MissingTag)
    }

    pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// Standalone yt-dlp build name for the current platform.
pub fn platform_asset_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else {
        "yt-dlp_linux"
    }
}

/// Local vs. latest tool version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate { version: String },
    /// `local` is `None` when the tool is not installed.
    Available { local: Option<String>, latest: String },
    Unavailable { reason: String },
}

pub fn compare_versions(local: Option<&str>, latest: &str) -> UpdateStatus {
    match local.map(str::trim) {
        Some(v) if v == latest.trim() => UpdateStatus::UpToDate { version: v.to_string() },
        other => UpdateStatus::Available {
            local: other.map(String::from),
            latest: latest.trim().to_string(),
        },
    }
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ReleaseError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("ytget/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// True when `url` answers a GET with 200 within `timeout`.
pub async fn probe_connectivity(url: &str, timeout: Duration) -> bool {
    let client = match http_client(timeout) {
        Ok(c) => c,
        Err(e) => {
            warn!("Cannot build HTTP client: {}", e);
            return false;
        }
    };
    match client.get(url).send().await {
        Ok(resp) => {
            debug!("Connectivity probe {} -> {}", url, resp.status());
            resp.status() == reqwest::StatusCode::OK
        }
        Err(e) => {
            warn!("Connectivity probe to {} failed: {}", url, e);
            false
        }
    }
}

pub async fn fetch_latest_release(client: &reqwest::Client, feed_url: &str) -> Result<Release, ReleaseError> {
    let resp = client
        .get(feed_url)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(ReleaseError::Status(resp.status().as_u16(), feed_url.to_string()));
    }
    let release: Release = resp.json().await?;
    Ok(release)
}

/// Installed tool version, `None` when it cannot be run.
pub async fn local_tool_version<R>(runner: &R) -> Option<String>
where
    R: ToolRunner + ?Sized,
{
    match runner.version().await {
        Ok(v) if !v.is_empty() => Some(v),
        Ok(_) => None,
        Err(e) => {
            debug!("Tool version unavailable: {}", e);
            None
        }
    }
}

/// Compare the installed tool with the feed's latest release.
///
/// Returns the release alongside the status so an update can reuse it.
pub async fn check_tool_update<R>(
    client: &reqwest::Client,
    feed_url: &str,
    runner: &R,
) -> (UpdateStatus, Option<Release>)
where
    R: ToolRunner + ?Sized,
{
    let local = local_tool_version(runner).await;
    let release = match fetch_latest_release(client, feed_url).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Release lookup failed: {}", e);
            return (UpdateStatus::Unavailable { reason: e.to_string() }, None);
        }
    };
    let status = match release.tag() {
        Ok(tag) => compare_versions(local.as_deref(), tag),
        Err(e) => UpdateStatus::Unavailable { reason: e.to_string() },
    };
    (status, Some(release))
}

/// Download `url` and atomically replace `dest` with it.
pub async fn download_release_asset(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, ReleaseError> {
    info!("Downloading {} -> {:?}", url, dest);
    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(ReleaseError::Status(resp.status().as_u16(), url.to_string()));
    }
    let bytes = resp.bytes().await?;

    let mut tmp_name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "yt-dlp".into());
    tmp_name.push(".download");
    let tmp = dest.with_file_name(tmp_name);

    tokio::fs::write(&tmp, &bytes).await?;
    mark_executable(&tmp).await?;
    tokio::fs::rename(&tmp, dest).await?;

    info!("Installed {} bytes to {:?}", bytes.len(), dest);
    Ok(bytes.len() as u64)
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
