/// YouTube link classification for menu input.
use once_cell::sync::Lazy;
use regex::Regex;

/// Kind of link an operator pasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    Video { video_id: String },
    Playlist { playlist_id: String },
    Other,
}

impl LinkKind {
    pub fn is_playlist(&self) -> bool {
        matches!(self, LinkKind::Playlist { .. })
    }
}

// ====== REGEX PATTERNS ======

static VIDEO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com/(?:watch\?v=|shorts/)|youtu\.be/)([a-zA-Z0-9_-]{11})"
    ).expect("video pattern")
});

static PLAYLIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.|m\.|music\.)?youtube\.com/.*[?&]list=([a-zA-Z0-9_-]+)")
        .expect("playlist pattern")
});

/// Classify a pasted link. A playlist parameter wins over a video id.
pub fn classify_link(text: &str) -> LinkKind {
    let text = text.trim();
    if let Some(cap) = PLAYLIST_RE.captures(text) {
        return LinkKind::Playlist {
            playlist_id: cap[1].to_string(),
        };
    }
    if let Some(cap) = VIDEO_RE.captures(text) {
        return LinkKind::Video {
            video_id: cap[1].to_string(),
        };
    }
    LinkKind::Other
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
