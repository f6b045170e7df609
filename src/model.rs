use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub lyric_offset_ms: Option<i64>,
}

impl Track {
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            artist: None,
            album: None,
            lyric_offset_ms: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn artist_label(&self) -> &str {
        self.artist
            .as_deref()
            .filter(|artist| !artist.trim().is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
    }
}

/// The three effective states of the `loop_all` / `loop_current` flag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn from_flags(loop_all: bool, loop_current: bool) -> Self {
        if loop_current {
            Self::One
        } else if loop_all {
            Self::All
        } else {
            Self::Off
        }
    }

    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Off => (false, false),
            Self::All => (true, false),
            Self::One => (false, true),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::All => "All",
            Self::One => "One",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Classic,
    Black,
    U2,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Self::Classic => Self::Black,
            Self::Black => Self::U2,
            Self::U2 => Self::Classic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::Black => "Black",
            Self::U2 => "U2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryState {
    pub tracks: Vec<Track>,
    pub current_index: usize,
    pub original_order: Vec<Track>,
    pub is_shuffled: bool,
    pub loop_all: bool,
    pub loop_current: bool,
    pub is_playing: bool,
}

impl LibraryState {
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            original_order: tracks.clone(),
            tracks,
            ..Self::default()
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        RepeatMode::from_flags(self.loop_all, self.loop_current)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.original_order.iter().any(|track| track.id == id)
            || self.tracks.iter().any(|track| track.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_cycles_with_period_three() {
        let mut mode = RepeatMode::Off;
        let mut seen = Vec::new();
        for _ in 0..6 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(
            seen,
            vec![
                RepeatMode::All,
                RepeatMode::One,
                RepeatMode::Off,
                RepeatMode::All,
                RepeatMode::One,
                RepeatMode::Off
            ]
        );
    }

    #[test]
    fn repeat_flags_are_never_both_set() {
        for mode in [RepeatMode::Off, RepeatMode::All, RepeatMode::One] {
            let (all, one) = mode.flags();
            assert!(!(all && one));
            assert_eq!(RepeatMode::from_flags(all, one), mode);
        }
    }

    #[test]
    fn blank_artist_falls_back_to_unknown() {
        let track = Track::new("a", "u", "t").with_artist("  ");
        assert_eq!(track.artist_label(), UNKNOWN_ARTIST);
    }

    #[test]
    fn track_deserializes_without_optional_fields() {
        let raw = r#"{"id":"dQw4w9WgXcQ","url":"https://youtu.be/dQw4w9WgXcQ","title":"Song"}"#;
        let track: Track = serde_json::from_str(raw).expect("parse");
        assert_eq!(track.artist, None);
        assert_eq!(track.lyric_offset_ms, None);
    }
}
