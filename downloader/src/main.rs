/// YTGet - Main Entry Point
///
/// Menu-driven yt-dlp front end with a persistent download queue. Checks
/// connectivity and the yt-dlp release feed on startup, then hands over to
/// the interactive menu.
mod menu;
mod power;
mod prompt;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use ytget_shared::release::{self, UpdateStatus};
use ytget_shared::{Config, YtDlpRunner};

use menu::App;
use prompt::{Interrupted, Prompt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ytget=warn".parse()?)
                .add_directive("ytget_shared=warn".parse()?),
        )
        .init();

    let mut config = Config::from_env();
    info!("Configuration: {:?}", config);

    // Ctrl-C cancels prompts and kills any running yt-dlp child.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_token.cancel(),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    println!("Welcome to YTGet {}", env!("CARGO_PKG_VERSION"));
    let mut prompt = Prompt::new(cancel.clone());

    let result = startup(&mut config, &mut prompt).await;
    let result = match result {
        Ok(()) => {
            let runner = Arc::new(YtDlpRunner::new(config.ytdlp_bin.clone(), cancel.clone()));
            let mut app = App::new(config, runner, prompt);
            app.run().await
        }
        Err(e) => Err(e),
    };

    if let Err(Interrupted) = result {
        println!("\nProgram interrupted. Exiting...");
    }
    info!("YTGet stopped.");
    Ok(())
}

/// Wait for connectivity, then offer a yt-dlp update if one is available.
async fn startup(config: &mut Config, prompt: &mut Prompt) -> Result<(), Interrupted> {
    while !release::probe_connectivity(&config.probe_url, config.probe_timeout).await {
        if prompt.cancel_token().is_cancelled() {
            return Err(Interrupted);
        }
        prompt
            .ask("No internet connection detected. Please check your connection and press Enter to retry.")
            .await?;
    }

    if config.skip_update_check {
        return Ok(());
    }
    println!("Checking for yt-dlp updates...");
    let client = match release::http_client(std::time::Duration::from_secs(60)) {
        Ok(c) => c,
        Err(e) => {
            warn!("Update check skipped: {}", e);
            println!("Update check unavailable.");
            return Ok(());
        }
    };
    let runner = YtDlpRunner::new(config.ytdlp_bin.clone(), prompt.cancel_token().clone());
    let (status, latest_release) = release::check_tool_update(&client, &config.tool_releases_url, &runner).await;

    let latest = match status {
        UpdateStatus::UpToDate { version } => {
            println!("You already have the latest version of yt-dlp: {}", version);
            return Ok(());
        }
        UpdateStatus::Unavailable { reason } => {
            println!("Cannot fetch yt-dlp latest version ({}). Update skipped.", reason);
            return Ok(());
        }
        UpdateStatus::Available { local: None, latest } => {
            if !prompt.confirm(&format!("yt-dlp not found. Download version {}?", latest)).await? {
                println!("Skipping download. Downloads will fail until yt-dlp is installed.");
                return Ok(());
            }
            latest
        }
        UpdateStatus::Available { local: Some(local), latest } => {
            println!(
                "A new version of yt-dlp is available: {} (current version: {})",
                latest, local
            );
            if !prompt.confirm("Do you want to update yt-dlp?").await? {
                println!("Skipping update.");
                return Ok(());
            }
            latest
        }
    };

    let asset = latest_release
        .as_ref()
        .and_then(|r| r.asset(release::platform_asset_name()));
    let Some(asset) = asset else {
        println!("No {} build in release {}. Update skipped.", release::platform_asset_name(), latest);
        return Ok(());
    };

    let target = install_path(&config.ytdlp_bin, release::platform_asset_name());
    match release::download_release_asset(&client, &asset.browser_download_url, &target).await {
        Ok(_) => {
            println!("yt-dlp has been updated to version {}.", latest);
            config.ytdlp_bin = target;
        }
        Err(e) => {
            error!("yt-dlp update failed: {}", e);
            println!("Error downloading yt-dlp: {}", e);
        }
    }
    Ok(())
}

/// Where to write a downloaded yt-dlp build.
///
/// A bare program name resolves through PATH, so the download lands in the
/// working directory instead.
fn install_path(configured: &Path, asset_name: &str) -> PathBuf {
    let has_dir = configured
        .parent()
        .map_or(false, |p| !p.as_os_str().is_empty());
    if has_dir {
        return configured.to_path_buf();
    }
    let name = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { asset_name };
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(name)
}
