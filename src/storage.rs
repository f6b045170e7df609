use crate::config;
use crate::library::Field;
use crate::model::{LibraryState, Theme, Track};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One persisted field. Each key is loaded once at mount and saved whenever
/// the corresponding state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Tracks,
    OriginalOrder,
    CurrentIndex,
    LoopAll,
    LoopCurrent,
    Shuffle,
    Backlight,
    Theme,
}

impl StoreKey {
    pub const ALL: [StoreKey; 8] = [
        StoreKey::Tracks,
        StoreKey::OriginalOrder,
        StoreKey::CurrentIndex,
        StoreKey::LoopAll,
        StoreKey::LoopCurrent,
        StoreKey::Shuffle,
        StoreKey::Backlight,
        StoreKey::Theme,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tracks => "tracks",
            Self::OriginalOrder => "originalOrder",
            Self::CurrentIndex => "currentIndex",
            Self::LoopAll => "loopAll",
            Self::LoopCurrent => "loopCurrent",
            Self::Shuffle => "isShuffled",
            Self::Backlight => "backlightOn",
            Self::Theme => "theme",
        }
    }

    pub fn for_field(field: Field) -> &'static [StoreKey] {
        match field {
            Field::Tracks => &[StoreKey::Tracks, StoreKey::OriginalOrder],
            Field::CurrentIndex => &[StoreKey::CurrentIndex],
            Field::Shuffle => &[StoreKey::Shuffle],
            Field::LoopAll => &[StoreKey::LoopAll],
            Field::LoopCurrent => &[StoreKey::LoopCurrent],
            Field::Playing => &[],
        }
    }
}

pub trait Storage {
    fn load(&self, key: StoreKey) -> Result<Option<Value>>;
    fn save(&mut self, key: StoreKey, value: Value) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<StoreKey, Value>,
    fail_saves: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, for exercising the non-fatal path.
    pub fn failing() -> Self {
        Self {
            values: HashMap::new(),
            fail_saves: true,
        }
    }

    pub fn get(&self, key: StoreKey) -> Option<&Value> {
        self.values.get(&key)
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: StoreKey) -> Result<Option<Value>> {
        Ok(self.values.get(&key).cloned())
    }

    fn save(&mut self, key: StoreKey, value: Value) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("memory storage rejected write of {}", key.name());
        }
        self.values.insert(key, value);
        Ok(())
    }
}

/// All fields in one JSON object on disk, rewritten on every save.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                values: Map::new(),
            });
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        let values = match serde_json::from_str::<Value>(&raw)
            .with_context(|| format!("failed to parse state file {}", path.display()))?
        {
            Value::Object(values) => values,
            _ => anyhow::bail!("state file {} is not a JSON object", path.display()),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            config::ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn load(&self, key: StoreKey) -> Result<Option<Value>> {
        Ok(self.values.get(key.name()).cloned())
    }

    fn save(&mut self, key: StoreKey, value: Value) -> Result<()> {
        self.values.insert(key.name().to_string(), value);
        self.flush()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedPod {
    pub library: LibraryState,
    pub backlight_on: bool,
    pub theme: Theme,
}

impl Default for PersistedPod {
    fn default() -> Self {
        Self {
            library: LibraryState::default(),
            backlight_on: true,
            theme: Theme::default(),
        }
    }
}

/// Reads every field, substituting the default for anything absent or
/// unreadable.
pub fn load_persisted(storage: &dyn Storage) -> PersistedPod {
    let defaults = PersistedPod::default();
    let tracks: Vec<Track> = load_field(storage, StoreKey::Tracks).unwrap_or_default();
    let original_order: Vec<Track> =
        load_field(storage, StoreKey::OriginalOrder).unwrap_or_default();

    PersistedPod {
        library: LibraryState {
            tracks,
            original_order,
            current_index: load_field(storage, StoreKey::CurrentIndex).unwrap_or(0),
            is_shuffled: load_field(storage, StoreKey::Shuffle).unwrap_or(false),
            loop_all: load_field(storage, StoreKey::LoopAll).unwrap_or(false),
            loop_current: load_field(storage, StoreKey::LoopCurrent).unwrap_or(false),
            is_playing: false,
        },
        backlight_on: load_field(storage, StoreKey::Backlight).unwrap_or(defaults.backlight_on),
        theme: load_field(storage, StoreKey::Theme).unwrap_or(defaults.theme),
    }
}

fn load_field<T: DeserializeOwned>(storage: &dyn Storage, key: StoreKey) -> Option<T> {
    match storage.load(key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(key = key.name(), error = %err, "ignoring unreadable persisted field");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!(key = key.name(), error = %err, "failed to load persisted field");
            None
        }
    }
}

pub struct PodSnapshot<'a> {
    pub library: &'a LibraryState,
    pub backlight_on: bool,
    pub theme: Theme,
}

impl PodSnapshot<'_> {
    fn value_for(&self, key: StoreKey) -> serde_json::Result<Value> {
        match key {
            StoreKey::Tracks => serde_json::to_value(&self.library.tracks),
            StoreKey::OriginalOrder => serde_json::to_value(&self.library.original_order),
            StoreKey::CurrentIndex => serde_json::to_value(self.library.current_index),
            StoreKey::LoopAll => serde_json::to_value(self.library.loop_all),
            StoreKey::LoopCurrent => serde_json::to_value(self.library.loop_current),
            StoreKey::Shuffle => serde_json::to_value(self.library.is_shuffled),
            StoreKey::Backlight => serde_json::to_value(self.backlight_on),
            StoreKey::Theme => serde_json::to_value(self.theme),
        }
    }
}

/// Writes the given keys. Failures are logged and dropped; the next change to
/// the same field writes it again.
pub fn save_keys(storage: &mut dyn Storage, keys: &[StoreKey], snapshot: &PodSnapshot<'_>) {
    for key in keys {
        let result = snapshot
            .value_for(*key)
            .map_err(anyhow::Error::from)
            .and_then(|value| storage.save(*key, value));
        match result {
            Ok(()) => debug!(key = key.name(), "persisted field"),
            Err(err) => warn!(key = key.name(), error = %err, "failed to persist field"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn library() -> LibraryState {
        let mut state = LibraryState::with_tracks(vec![
            Track::new("aaaaaaaaaaa", "https://youtu.be/aaaaaaaaaaa", "A").with_artist("X"),
            Track::new("bbbbbbbbbbb", "https://youtu.be/bbbbbbbbbbb", "B"),
        ]);
        state.current_index = 1;
        state.loop_all = true;
        state
    }

    #[test]
    fn empty_storage_loads_defaults() {
        let loaded = load_persisted(&MemoryStorage::new());
        assert_eq!(loaded, PersistedPod::default());
        assert!(loaded.backlight_on);
    }

    #[test]
    fn saved_fields_load_back() {
        let lib = library();
        let mut storage = MemoryStorage::new();
        let snapshot = PodSnapshot {
            library: &lib,
            backlight_on: false,
            theme: Theme::U2,
        };
        save_keys(&mut storage, &StoreKey::ALL, &snapshot);

        let loaded = load_persisted(&storage);
        assert_eq!(loaded.library.tracks, lib.tracks);
        assert_eq!(loaded.library.current_index, 1);
        assert!(loaded.library.loop_all);
        assert!(!loaded.backlight_on);
        assert_eq!(loaded.theme, Theme::U2);
    }

    #[test]
    fn unreadable_field_falls_back_to_default() {
        let mut storage = MemoryStorage::new();
        storage
            .save(StoreKey::CurrentIndex, json!("three"))
            .expect("save");
        storage.save(StoreKey::LoopCurrent, json!(true)).expect("save");

        let loaded = load_persisted(&storage);
        assert_eq!(loaded.library.current_index, 0);
        assert!(loaded.library.loop_current);
    }

    #[test]
    fn failing_storage_is_not_fatal() {
        let lib = library();
        let mut storage = MemoryStorage::failing();
        let snapshot = PodSnapshot {
            library: &lib,
            backlight_on: true,
            theme: Theme::Classic,
        };
        save_keys(&mut storage, &[StoreKey::Tracks], &snapshot);
        assert!(storage.get(StoreKey::Tracks).is_none());
    }

    #[test]
    fn json_file_storage_round_trips_through_disk() {
        let dir = tempdir().expect("tempdir");
        let path = config::state_path(&dir.path().join("nested"));
        let lib = library();

        let mut storage = JsonFileStorage::open(&path).expect("open");
        let snapshot = PodSnapshot {
            library: &lib,
            backlight_on: true,
            theme: Theme::Black,
        };
        save_keys(&mut storage, &StoreKey::ALL, &snapshot);

        let reopened = JsonFileStorage::open(&path).expect("reopen");
        let loaded = load_persisted(&reopened);
        assert_eq!(loaded.library.original_order, lib.original_order);
        assert_eq!(loaded.theme, Theme::Black);

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"isShuffled\""));
    }

    #[test]
    fn json_file_storage_rejects_non_object() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "[1,2,3]").expect("write");
        assert!(JsonFileStorage::open(&path).is_err());
    }
}
