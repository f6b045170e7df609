//! Resolves a pasted video URL into a [`Track`] via an oEmbed endpoint.

use crate::config::LookupSettings;
use crate::model::Track;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Anchored on the host: short links, path-style ids and `watch?...v=`.
static VIDEO_URL: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtu\.be/|youtube\.com/(?:(?:embed|shorts|v|live)/|watch/?\?(?:[^#\s]*&)?v=))(?P<id>[A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
});

const TITLE_DELIMITER: &str = " - ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("not a recognizable video link: {0}")]
    InvalidUrl(String),
    #[error("metadata fetch failed: {0}")]
    Fetch(String),
    #[error("metadata response unreadable: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OEmbed {
    pub title: String,
    #[serde(default)]
    pub author_name: Option<String>,
}

pub trait MetadataSource {
    fn fetch(&self, video_id: &str) -> Result<OEmbed, LookupError>;
}

pub fn canonical_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Pulls the 11-character id out of the common link shapes.
pub fn extract_video_id(url: &str) -> Result<String, LookupError> {
    let trimmed = url.trim();
    let pattern = VIDEO_URL
        .as_ref()
        .map_err(|err| LookupError::InvalidUrl(err.to_string()))?;
    pattern
        .captures(trimmed)
        .and_then(|caps| caps.name("id"))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| LookupError::InvalidUrl(trimmed.to_string()))
}

/// `"Artist - Title"` becomes `(Some("Artist"), "Title")`. Only the first
/// delimiter splits.
pub fn split_title(raw: &str) -> (Option<String>, String) {
    let raw = raw.trim();
    match raw.split_once(TITLE_DELIMITER) {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (Some(artist.trim().to_string()), title.trim().to_string())
        }
        _ => (None, raw.to_string()),
    }
}

/// Validates the URL, fetches metadata, and builds the track. Nothing is
/// touched on failure.
pub fn resolve_track(source: &dyn MetadataSource, url: &str) -> Result<Track, LookupError> {
    let video_id = extract_video_id(url)?;
    let meta = source.fetch(&video_id)?;
    if meta.title.trim().is_empty() {
        return Err(LookupError::Malformed(format!("empty title for {video_id}")));
    }
    let (artist, title) = split_title(&meta.title);
    let mut track = Track::new(video_id.clone(), canonical_url(&video_id), title);
    track.artist = artist;
    debug!(id = %video_id, title = %track.title, "resolved track metadata");
    Ok(track)
}

#[derive(Debug, Clone)]
pub struct OEmbedClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl OEmbedClient {
    pub fn new(settings: &LookupSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(settings.timeout_ms)))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint: settings.oembed_endpoint.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl MetadataSource for OEmbedClient {
    fn fetch(&self, video_id: &str) -> Result<OEmbed, LookupError> {
        let target = canonical_url(video_id);
        let body = self
            .agent
            .get(self.endpoint.as_str())
            .query("url", &target)
            .query("format", "json")
            .call()
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|err| {
                warn!(id = video_id, error = %err, "oEmbed request failed");
                LookupError::Fetch(err.to_string())
            })?;
        serde_json::from_str(&body).map_err(|err| LookupError::Malformed(err.to_string()))
    }
}
