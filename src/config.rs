use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "podwheel";
const STATE_FILE: &str = "state.json";
const SETTINGS_FILE: &str = "settings.json";
const LOG_DIR: &str = "logs";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("PODWHEEL_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn log_dir(root: &Path) -> PathBuf {
    root.join(LOG_DIR)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

/// Tuning knobs read from `settings.json`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub wheel: WheelSettings,
    pub playback: PlaybackSettings,
    pub lookup: LookupSettings,
    /// Host capability flag: the platform refuses to start media without a
    /// prior user gesture.
    pub platform_blocks_autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelSettings {
    /// Accumulated scroll delta that produces one rotation step.
    pub scroll_threshold: f64,
    /// Degrees of touch rotation per step.
    pub rotation_step_degrees: f64,
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            scroll_threshold: 50.0,
            rotation_step_degrees: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub settle_delay_ms: u64,
    pub play_settle_delay_ms: u64,
    pub reconcile_delay_ms: u64,
    pub autoplay_watchdog_ms: u64,
    pub idle_timeout_ms: u64,
    pub seek_step_seconds: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 150,
            play_settle_delay_ms: 100,
            reconcile_delay_ms: 200,
            autoplay_watchdog_ms: 2_500,
            idle_timeout_ms: 5_000,
            seek_step_seconds: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    pub oembed_endpoint: String,
    pub timeout_ms: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            oembed_endpoint: String::from("https://www.youtube.com/oembed"),
            timeout_ms: 8_000,
        }
    }
}

pub fn load_settings(root: &Path) -> Result<Settings> {
    let path = settings_path(root);
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_file_uses_defaults() {
        let dir = tempdir().expect("tempdir");
        let settings = load_settings(dir.path()).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.playback.idle_timeout_ms, 5_000);
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            settings_path(dir.path()),
            r#"{"wheel":{"scroll_threshold":20.0},"platform_blocks_autoplay":true}"#,
        )
        .expect("write");

        let settings = load_settings(dir.path()).expect("load");
        assert_eq!(settings.wheel.scroll_threshold, 20.0);
        assert_eq!(settings.wheel.rotation_step_degrees, 15.0);
        assert!(settings.platform_blocks_autoplay);
        assert_eq!(settings.playback, PlaybackSettings::default());
    }

    #[test]
    fn malformed_settings_report_the_path() {
        let dir = tempdir().expect("tempdir");
        fs::write(settings_path(dir.path()), "{not json").expect("write");
        let err = load_settings(dir.path()).expect_err("should fail");
        assert!(format!("{err:#}").contains("settings.json"));
    }
}
