//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ie::screen::inventory::Layout;

/// On-disk configuration for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The game window is the first top-level window whose title starts with this.
    pub window_title: String,

    /// Directory holding `echo.json`, `cost.json` and `default_rules.json`.
    pub data_dir: PathBuf,

    /// Directory holding the template PNGs and the `sets/` icon directory.
    pub assets_dir: PathBuf,

    /// Scratch directory for the page anchor snapshot.
    pub work_dir: PathBuf,

    /// OCR model language code (`<lang>_recognition.mnn`, `<lang>_charset.txt`).
    pub ocr_lang: String,

    /// Stop after this many echoes.
    pub max_items: u32,

    pub keys: Keys,
    pub pacing: Pacing,
    pub attempts: Attempts,
    pub layout: Layout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: "Wuthering Waves".to_string(),
            data_dir: PathBuf::from("resources/data"),
            assets_dir: PathBuf::from("resources/assets"),
            work_dir: PathBuf::from("work"),
            ocr_lang: "en".to_string(),
            max_items: 3000,
            keys: Keys::default(),
            pacing: Pacing::default(),
            attempts: Attempts::default(),
            layout: Layout::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keys {
    pub lock: char,
    pub discard: char,
    pub inventory: char,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            lock: 'c',
            discard: 'z',
            inventory: 'b',
        }
    }
}

/// Every sleep the sorter does, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// After clicking an inventory slot, before reading the detail panel.
    pub click_settle_ms: u64,
    /// After a lock/discard key press, before verifying the marker.
    pub key_settle_ms: u64,
    /// After scrolling one page, before looking for the anchor.
    pub scroll_settle_ms: u64,
    /// Between failed recognition attempts.
    pub recognition_backoff_ms: u64,
    /// After a menu click or key press during inventory preparation.
    pub ui_settle_ms: u64,
    /// After bringing the game window to the front.
    pub window_settle_ms: u64,
    /// Between inventory preparation retries.
    pub prepare_retry_ms: u64,
    /// Wheel delta for one page; negative scrolls down.
    pub scroll_amount: i32,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            click_settle_ms: 100,
            key_settle_ms: 200,
            scroll_settle_ms: 500,
            recognition_backoff_ms: 1000,
            ui_settle_ms: 500,
            window_settle_ms: 2000,
            prepare_retry_ms: 1500,
            scroll_amount: -933,
        }
    }
}

impl Pacing {
    /// No waiting at all (tests, replaying screenshots).
    pub const ZERO: Self = Self {
        click_settle_ms: 0,
        key_settle_ms: 0,
        scroll_settle_ms: 0,
        recognition_backoff_ms: 0,
        ui_settle_ms: 0,
        window_settle_ms: 0,
        prepare_retry_ms: 0,
        scroll_amount: -933,
    };

    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    pub fn key_settle(&self) -> Duration {
        Duration::from_millis(self.key_settle_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn recognition_backoff(&self) -> Duration {
        Duration::from_millis(self.recognition_backoff_ms)
    }

    pub fn ui_settle(&self) -> Duration {
        Duration::from_millis(self.ui_settle_ms)
    }

    pub fn window_settle(&self) -> Duration {
        Duration::from_millis(self.window_settle_ms)
    }

    pub fn prepare_retry(&self) -> Duration {
        Duration::from_millis(self.prepare_retry_ms)
    }
}

/// Retry budgets, as attempt counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attempts {
    pub recognition: u32,
    pub pagination: u32,
    pub prepare: u32,
}

impl Default for Attempts {
    fn default() -> Self {
        Self {
            recognition: 3,
            pagination: 1,
            prepare: 3,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("echosort.json"))
    }

    /// Load configuration from `path` (or the default location), falling
    /// back to defaults when it is missing or broken.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::path() {
                Ok(path) => path,
                Err(err) => {
                    tracing::warn!(error = %err, "no config directory; using defaults");
                    return Self::default();
                }
            },
        };
        match Self::try_load(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = ?err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk. A missing file means defaults.
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Where the page anchor snapshot goes.
    pub fn anchor_path(&self) -> PathBuf {
        self.work_dir.join("page-anchor.png")
    }

    pub fn set_icon_dir(&self) -> PathBuf {
        self.assets_dir.join("sets")
    }
}
