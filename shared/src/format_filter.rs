/// Cleans yt-dlp `-F` output into a display-ready format table.
use tracing::{debug, warn};

use crate::runner::ToolRunner;

/// Progress/log lines yt-dlp mixes into the listing.
pub const NOISE_MARKERS: &[&str] = &[
    "Extracting URL",
    "Downloading webpage",
    "Downloading ios player API JSON",
    "Downloading m3u8 information",
];

/// Format codes hidden from the table, matched by substring containment.
pub const EXCLUDED_FORMATS: &[&str] = &[
    "sb0",
    "sb1",
    "sb2",
    "sb3",
    "sb0 mhtml",
    "sb1 mhtml",
    "sb2 mhtml",
    "sb3 mhtml",
    "drc",
    "233 mp4",
    "234 mp4",
    "18",
];

/// Header line yt-dlp prints above the table.
pub const LISTING_HEADER: &str = "[info] Available formats for";

/// Drop noise and excluded-format lines, keeping the remaining order.
pub fn filter_formats(raw: &str) -> String {
    raw.lines()
        .filter(|line| !NOISE_MARKERS.iter().any(|m| line.contains(m)))
        .filter(|line| !EXCLUDED_FORMATS.iter().any(|code| line.contains(code)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// List and filter formats for `target`.
///
/// An empty string means the formats are unavailable and no download should
/// be attempted.
pub async fn available_formats<R>(runner: &R, target: &str) -> String
where
    R: ToolRunner + ?Sized,
{
    match runner.list_formats(target).await {
        Ok(raw) => {
            let filtered = filter_formats(&raw);
            debug!(
                "Format listing for {}: {} raw lines, {} kept",
                target,
                raw.lines().count(),
                filtered.lines().count()
            );
            filtered
        }
        Err(e) => {
            warn!("Failed to fetch formats for {}: {}", target, e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    const LISTING: &str = "\
[youtube] Extracting URL: https://www.youtube.com/watch?v=dQw4w9WgXcQ
[youtube] dQw4w9WgXcQ: Downloading webpage
[youtube] dQw4w9WgXcQ: Downloading ios player API JSON
[youtube] dQw4w9WgXcQ: Downloading m3u8 information
[info] Available formats for dQw4w9WgXcQ:
ID  EXT   RESOLUTION FPS |   FILESIZE   TBR PROTO
sb1 mhtml 45x80        1 |                  mhtml
sb0 mhtml 90x160       1 |                  mhtml
233 mp4   audio only     |                  m3u8
18  mp4   360x640     30 |  ~2.31MiB   318k https
251 webm  audio only     |    3.28MiB  139k https bestaudio
137 mp4   1080x1920   30 |   40.11MiB 1687k https";

    #[test]
    fn test_filters_noise_and_excluded_codes() {
        let out = filter_formats(LISTING);
        assert!(!out.contains("Extracting URL"));
        assert!(!out.contains("Downloading webpage"));
        assert!(!out.contains("sb1"));
        assert!(!out.contains("233 mp4"));
        assert!(!out.contains("360x640"));
        assert!(out.contains("bestaudio"));
        assert!(out.contains("137 mp4"));
    }

    #[test]
    fn test_preserves_order() {
        let out = filter_formats(LISTING);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with(LISTING_HEADER));
        assert!(lines[1].starts_with("ID"));
        assert!(lines[2].starts_with("251"));
        assert!(lines[3].starts_with("137"));
    }

    #[test]
    fn test_format_18_hidden_with_wide_id_column() {
        let listing = "\
ID      EXT   RESOLUTION FPS |   FILESIZE   TBR PROTO
251-drc webm  audio only     |    3.30MiB  140k https
18      mp4   640x360     30 |  ~2.31MiB   318k https
137     mp4   1920x1080   30 |   40.11MiB 1687k https";
        let out = filter_formats(listing);
        assert!(!out.contains("640x360"));
        assert!(!out.contains("251-drc"));
        assert!(out.contains("137     mp4"));
    }

    #[test]
    fn test_substring_match_inside_longer_text() {
        let out = filter_formats("storyboard_sb2_preview line\nkeep me");
        assert_eq!(out, "keep me");
    }

    #[tokio::test]
    async fn test_failed_listing_is_empty() {
        let runner = ScriptedRunner::default();
        assert!(available_formats(&runner, "V1").await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_listing_is_filtered() {
        let runner = ScriptedRunner {
            formats: Some(LISTING.to_string()),
            ..Default::default()
        };
        let out = available_formats(&runner, "V1").await;
        assert!(out.contains("251 webm"));
        assert!(!out.contains("sb0"));
    }
}
