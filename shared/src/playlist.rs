/// Playlist expansion via yt-dlp's flat listing.
///
/// Every record is parsed before any URL is handed out, so a malformed line
/// fails the whole playlist rather than yielding a silently shortened one.
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::{PlaylistError, RunnerError};
use crate::links::watch_url;
use crate::runner::ToolRunner;

#[derive(Debug, Deserialize)]
struct FlatRecord {
    id: String,
}

/// Single-pass sequence of watch URLs for one playlist.
#[derive(Debug)]
pub struct PlaylistItems {
    inner: std::vec::IntoIter<String>,
}

impl PlaylistItems {
    fn empty() -> Self {
        Self {
            inner: Vec::new().into_iter(),
        }
    }
}

impl Iterator for PlaylistItems {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for PlaylistItems {}

/// Parse flat-listing output, one JSON record per non-blank line.
pub fn parse_flat_listing(output: &str) -> Result<PlaylistItems, PlaylistError> {
    let mut urls = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: FlatRecord = serde_json::from_str(line).map_err(|e| PlaylistError::Malformed {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        if record.id.trim().is_empty() {
            return Err(PlaylistError::Malformed {
                line: idx + 1,
                reason: "empty id".to_string(),
            });
        }
        urls.push(watch_url(record.id.trim()));
    }
    Ok(PlaylistItems {
        inner: urls.into_iter(),
    })
}

/// Expand `playlist` into item URLs.
///
/// A failed listing yields an empty sequence; only cancellation and
/// malformed records are errors.
pub async fn expand_playlist<R>(runner: &R, playlist: &str) -> Result<PlaylistItems, PlaylistError>
where
    R: ToolRunner + ?Sized,
{
    let output = match runner.flat_playlist(playlist).await {
        Ok(output) => output,
        Err(RunnerError::Cancelled) => return Err(PlaylistError::Listing(RunnerError::Cancelled)),
        Err(e) => {
            warn!("Flat listing of {} failed: {}", playlist, e);
            return Ok(PlaylistItems::empty());
        }
    };
    let items = parse_flat_listing(&output)?;
    info!("Playlist {} expanded to {} items", playlist, items.len());
    Ok(items)
}
