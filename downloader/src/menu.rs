/// Interactive menu and rendering of queue/executor outcomes.
///
/// Everything the operator sees is printed here; the core only returns
/// structured values and logs.
use std::sync::Arc;

use tracing::{info, warn};
use ytget_shared::errors::PlaylistError;
use ytget_shared::format_filter::{available_formats, LISTING_HEADER};
use ytget_shared::links::{classify_link, LinkKind};
use ytget_shared::playlist::expand_playlist;
use ytget_shared::{
    Config, DownloadExecutor, DownloadOutcome, FormatPreset, QueueEvent, QueueProcessor, QueueReport,
    QueueState, QueueStore, WorkItem, YtDlpRunner,
};

use crate::power::{run_after_countdown, PostQueueAction};
use crate::prompt::{Interrupted, Prompt};

/// Main menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    DownloadFormat,
    DownloadBestAudio,
    DownloadBestVideo,
    PlaylistBestAudio,
    PlaylistBestQuality,
    StartQueue,
    ShowQueue,
    RetryFailed,
    SetDefaultPath,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::DownloadFormat),
            "2" => Some(MenuChoice::DownloadBestAudio),
            "3" => Some(MenuChoice::DownloadBestVideo),
            "4" => Some(MenuChoice::PlaylistBestAudio),
            "5" => Some(MenuChoice::PlaylistBestQuality),
            "6" => Some(MenuChoice::StartQueue),
            "7" => Some(MenuChoice::ShowQueue),
            "8" => Some(MenuChoice::RetryFailed),
            "9" => Some(MenuChoice::SetDefaultPath),
            "0" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

const MAIN_MENU: &str = "\
Menu:
1. Download a video (choose format code)
2. Download best audio
3. Download best video+audio
4. Playlist: best audio
5. Playlist: best quality
6. Start download queue
7. Show queue
8. Retry failed downloads
9. Set default download path
0. Exit";

/// Queue now or download right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Queue,
    Immediate,
}

pub struct App {
    config: Config,
    store: QueueStore,
    state: QueueState,
    executor: DownloadExecutor<YtDlpRunner>,
    prompt: Prompt,
}

impl App {
    pub fn new(config: Config, runner: Arc<YtDlpRunner>, prompt: Prompt) -> Self {
        let store = QueueStore::new(config.queue_file.clone());
        let state = store.load();
        let executor = DownloadExecutor::new(runner, config.cookie_file.clone());
        Self {
            config,
            store,
            state,
            executor,
            prompt,
        }
    }

    /// Run the menu until the operator exits.
    pub async fn run(&mut self) -> Result<(), Interrupted> {
        loop {
            println!("\n{}", MAIN_MENU);
            let input = self.prompt.ask("Enter your choice: ").await?;
            let Some(choice) = MenuChoice::parse(&input) else {
                println!("Invalid choice. Please try again.");
                continue;
            };
            match choice {
                MenuChoice::DownloadFormat => self.download_with_format_code().await?,
                MenuChoice::DownloadBestAudio => self.download_preset(FormatPreset::BestAudio).await?,
                MenuChoice::DownloadBestVideo => self.download_preset(FormatPreset::BestVideoAudio).await?,
                MenuChoice::PlaylistBestAudio => self.download_playlist(FormatPreset::BestAudio).await?,
                MenuChoice::PlaylistBestQuality => self.download_playlist(FormatPreset::BestVideoAudio).await?,
                MenuChoice::StartQueue => self.start_queue().await?,
                MenuChoice::ShowQueue => self.show_queue(),
                MenuChoice::RetryFailed => self.retry_failed(),
                MenuChoice::SetDefaultPath => self.set_default_path().await?,
                MenuChoice::Exit => {
                    println!("Exiting program. Goodbye!");
                    return Ok(());
                }
            }
        }
    }

    async fn ask_url(&mut self, what: &str) -> Result<Option<String>, Interrupted> {
        let url = self.prompt.ask(&format!("Enter {} URL: ", what)).await?;
        if url.is_empty() {
            println!("No URL entered.");
            return Ok(None);
        }
        Ok(Some(url))
    }

    async fn download_with_format_code(&mut self) -> Result<(), Interrupted> {
        let Some(url) = self.ask_url("YouTube").await? else {
            return Ok(());
        };
        println!("Fetching available formats...");
        let formats = available_formats(self.executor.runner(), &url).await;
        if formats.is_empty() {
            println!("Failed to fetch formats. Please try again later.");
            return Ok(());
        }
        for line in formats.lines() {
            if line.starts_with(LISTING_HEADER) {
                println!("== {} ==", line);
            } else {
                println!("{}", line);
            }
        }
        let code = self
            .prompt
            .ask("Enter format code to download (e.g., 251 or 251+271): ")
            .await?;
        if code.is_empty() {
            println!("No format code entered.");
            return Ok(());
        }
        self.download_preset_for(url, FormatPreset::Custom(code)).await
    }

    async fn download_preset(&mut self, preset: FormatPreset) -> Result<(), Interrupted> {
        let Some(url) = self.ask_url("YouTube").await? else {
            return Ok(());
        };
        if classify_link(&url).is_playlist() {
            println!("This looks like a playlist link; only the linked video will be downloaded.");
        }
        self.download_preset_for(url, preset).await
    }

    async fn download_preset_for(&mut self, url: String, preset: FormatPreset) -> Result<(), Interrupted> {
        let destination = self.choose_destination().await?;
        let item = WorkItem::new(url, preset.selector(), destination);
        match self.choose_dispatch().await? {
            Dispatch::Queue => {
                if self.store.enqueue(&mut self.state, item) {
                    println!("Added to download queue.");
                } else {
                    println!("Added to download queue, but the queue file could not be saved.");
                }
            }
            Dispatch::Immediate => {
                println!("Downloading ({})...", preset);
                self.download_now(item).await?;
            }
        }
        Ok(())
    }

    async fn download_playlist(&mut self, preset: FormatPreset) -> Result<(), Interrupted> {
        let Some(url) = self.ask_url("playlist").await? else {
            return Ok(());
        };
        if !matches!(classify_link(&url), LinkKind::Playlist { .. }) {
            println!("This does not look like a playlist link; trying anyway.");
        }
        println!("Expanding playlist...");
        let items = match expand_playlist(self.executor.runner(), &url).await {
            Ok(items) => items,
            Err(PlaylistError::Listing(_)) => return Err(Interrupted),
            Err(e) => {
                println!("Could not read the playlist: {}", e);
                return Ok(());
            }
        };
        if items.len() == 0 {
            println!("No playlist items found.");
            return Ok(());
        }
        println!("Found {} items.", items.len());

        let destination = self.choose_destination().await?;
        let dispatch = self.choose_dispatch().await?;
        let mut queued = 0;
        let mut unsaved = 0;
        for video in items {
            let item = WorkItem::new(video, preset.selector(), destination.clone());
            match dispatch {
                Dispatch::Queue => {
                    if !self.store.enqueue(&mut self.state, item) {
                        unsaved += 1;
                    }
                    queued += 1;
                }
                Dispatch::Immediate => {
                    println!("Downloading {} ({})...", item.target, preset);
                    self.download_now(item).await?;
                }
            }
        }
        if dispatch == Dispatch::Queue {
            println!("{}", queued_summary(queued, unsaved));
        }
        Ok(())
    }

    /// Download right away; a failure is recorded in the failed list.
    async fn download_now(&mut self, item: WorkItem) -> Result<(), Interrupted> {
        let outcome = self.executor.execute(&item, self.config.max_retries).await;
        render_outcome(&item, &outcome);
        match outcome {
            DownloadOutcome::Success { .. } => Ok(()),
            DownloadOutcome::Cancelled { .. } => Err(Interrupted),
            DownloadOutcome::Failed { .. } | DownloadOutcome::Rejected(_) => {
                println!("Adding to failed downloads.");
                self.store.record_failure(&mut self.state, item);
                Ok(())
            }
        }
    }

    async fn choose_destination(&mut self) -> Result<String, Interrupted> {
        if let Some(current) = self.state.default_destination.clone() {
            let change = self
                .prompt
                .confirm(&format!("Current download path is '{}'. Do you want to change it?", current))
                .await?;
            if !change {
                return Ok(current);
            }
            let path = self.prompt.ask("Enter new download path: ").await?;
            return Ok(self.remember_destination(path, current));
        }

        let set = self
            .prompt
            .confirm("No download path set. Do you want to enter a download path?")
            .await?;
        let cwd = working_dir();
        if !set {
            return Ok(cwd);
        }
        let path = self.prompt.ask("Enter download path: ").await?;
        Ok(self.remember_destination(path, cwd))
    }

    fn remember_destination(&mut self, path: String, fallback: String) -> String {
        if path.is_empty() {
            return fallback;
        }
        self.store.set_default_destination(&mut self.state, Some(path.clone()));
        path
    }

    async fn choose_dispatch(&mut self) -> Result<Dispatch, Interrupted> {
        let answer = self
            .prompt
            .ask("Do you want to add this download to the queue or start immediately? (q/i): ")
            .await?;
        Ok(if answer.eq_ignore_ascii_case("q") {
            Dispatch::Queue
        } else {
            Dispatch::Immediate
        })
    }

    async fn ask_post_queue_action(&mut self) -> Result<PostQueueAction, Interrupted> {
        loop {
            println!(
                "\nOnce the download queue has finished, what would you like to do next?\n\
                 1. Keep system idle\n\
                 2. Shut down system after 60 seconds\n\
                 3. Sleep system after 60 seconds"
            );
            let answer = self.prompt.ask("Enter your choice: ").await?;
            match PostQueueAction::from_choice(&answer) {
                Some(action) => return Ok(action),
                None => println!("Invalid choice. Please try again."),
            }
        }
    }

    async fn start_queue(&mut self) -> Result<(), Interrupted> {
        if self.state.is_empty() {
            println!("The download queue is empty.");
            return Ok(());
        }
        let action = self.ask_post_queue_action().await?;
        println!("Starting download queue...");

        let processor = QueueProcessor::new(&self.executor, &self.store, self.config.max_retries);
        let report = processor.process_with(&mut self.state, render_event).await;
        render_report(&report);

        if report.interrupted {
            return Err(Interrupted);
        }
        run_after_countdown(action, &mut self.prompt).await?;
        Ok(())
    }

    fn show_queue(&self) {
        if let Some(dest) = &self.state.default_destination {
            println!("Default download path: {}", dest);
        }
        println!("Pending ({}):", self.state.pending.len());
        for (idx, item) in self.state.pending.iter().enumerate() {
            println!("  {}. {}", idx + 1, describe(item));
        }
        println!("Failed ({}):", self.state.failed.len());
        for (idx, item) in self.state.failed.iter().enumerate() {
            println!("  {}. {}", idx + 1, describe(item));
        }
    }

    fn retry_failed(&mut self) {
        match self.store.requeue_failed(&mut self.state) {
            0 => println!("There are no failed downloads."),
            n => println!("Moved {} failed downloads back into the queue.", n),
        }
    }

    async fn set_default_path(&mut self) -> Result<(), Interrupted> {
        let path = self
            .prompt
            .ask("Enter default download path (leave empty to clear): ")
            .await?;
        let saved = self
            .store
            .set_default_destination(&mut self.state, Some(path));
        match (&self.state.default_destination, saved) {
            (_, false) => println!("Could not save the queue file."),
            (Some(dest), true) => println!("Default download path set to '{}'.", dest),
            (None, true) => println!("Default download path cleared."),
        }
        Ok(())
    }
}

fn working_dir() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| ".".to_string())
}

fn queued_summary(queued: usize, unsaved: usize) -> String {
    if unsaved == 0 {
        format!("Added {} playlist items to the download queue.", queued)
    } else {
        format!(
            "Added {} playlist items to the download queue, but the queue file could not be saved {} times.",
            queued, unsaved
        )
    }
}

fn describe(item: &WorkItem) -> String {
    format!(
        "{} [{}] -> {}",
        item.target,
        item.format_selector,
        item.destination.as_deref().unwrap_or("(default)")
    )
}

fn render_event(event: QueueEvent<'_>) {
    match event {
        QueueEvent::Started { item, position, total } => {
            println!("[{}/{}] Starting download for {}...", position, total, item.target);
        }
        QueueEvent::Finished { item, outcome } => {
            render_outcome(item, outcome);
            if !outcome.is_success() && !matches!(outcome, DownloadOutcome::Cancelled { .. }) {
                println!("Added {} to failed downloads.", item.target);
            }
        }
    }
}

fn render_outcome(item: &WorkItem, outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Success { attempts: 1 } => println!("Download completed for {}.", item.target),
        DownloadOutcome::Success { attempts } => {
            println!("Download completed for {} after {} attempts.", item.target, attempts)
        }
        DownloadOutcome::Failed { attempts, last_error } => {
            warn!("Giving up on {}: {}", item.target, last_error);
            println!("Download failed for {} after {} attempts.", item.target, attempts);
        }
        DownloadOutcome::Rejected(reason) => println!("Download rejected for {}: {}.", item.target, reason),
        DownloadOutcome::Cancelled { .. } => println!("Download interrupted for {}.", item.target),
    }
}

fn render_report(report: &QueueReport) {
    if report.empty {
        println!("The download queue is empty.");
        return;
    }
    info!("Queue report: {:?}", report);
    println!(
        "Download queue processing completed: {} succeeded, {} failed, {} still queued.",
        report.succeeded.len(),
        report.failed.len(),
        report.remaining
    );
}
