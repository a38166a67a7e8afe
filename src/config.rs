//! Configuration loading for Cadence.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.cadence/config.toml`)
//! 3. User config (`~/.cadence/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The scheduler runs with the client's
//! defaults (20 new cards per day, 20-card status cap) when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::core::{DayBoundary, DEFAULT_AGAIN_DELAY_MINUTES, DEFAULT_STATUS_CAP};
use crate::error::{CadenceError, Result};
use crate::util::read_to_string_limited;

/// Main configuration struct for Cadence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Daily budget and scheduling policy.
    pub scheduling: SchedulingConfig,
    /// Calendar day boundary.
    pub day: DayConfig,
    /// Data and catalog locations.
    pub storage: StorageConfig,
}

/// Daily budget and scheduling policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulingConfig {
    /// New items a learner may start per day.
    pub daily_new_limit: u32,
    /// Reviews per day after which the study page switches to study-again.
    pub study_again_threshold: u32,
    /// Bound on the counts computed for the deck overview.
    pub status_cap: u32,
    /// Minutes until an item graded Again comes back.
    pub again_delay_minutes: u32,
}

/// Largest accepted Again delay (one day).
pub const MAX_AGAIN_DELAY_MINUTES: u32 = 24 * 60;

impl SchedulingConfig {
    /// Check if a status cap is valid (must be at least 1).
    pub fn is_valid_status_cap(value: u32) -> bool {
        value >= 1
    }

    /// Check if an Again delay is valid (1 minute to 1 day).
    pub fn is_valid_again_delay(value: u32) -> bool {
        (1..=MAX_AGAIN_DELAY_MINUTES).contains(&value)
    }

    /// The Again delay as a duration.
    pub fn again_delay(&self) -> Duration {
        Duration::minutes(i64::from(self.again_delay_minutes))
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            daily_new_limit: 20,
            study_again_threshold: 20,
            status_cap: DEFAULT_STATUS_CAP,
            again_delay_minutes: DEFAULT_AGAIN_DELAY_MINUTES,
        }
    }
}

/// Calendar day boundary configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DayConfig {
    /// Offset east of UTC at which days start. Unset means the machine's
    /// local offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

impl DayConfig {
    /// Check if an offset is valid (strictly within ±24h).
    pub fn is_valid_offset(minutes: i32) -> bool {
        DayBoundary::from_offset_minutes(minutes).is_some()
    }

    /// The configured day boundary.
    pub fn boundary(&self) -> DayBoundary {
        self.utc_offset_minutes
            .and_then(DayBoundary::from_offset_minutes)
            .unwrap_or_else(DayBoundary::local)
    }
}

/// Data and catalog locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Learner data directory. Unset means `<cadence_home>/data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Deck catalog directory. Unset means `<cadence_home>/decks`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.cadence/config.toml` in cwd or an ancestor)
    /// 3. User config (`~/.cadence/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        // Layer 4 → 3: Apply user config
        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        // Layer 3 → 2: Apply project config
        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        // Layer 2 → 1: Apply environment variables
        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.cadence/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = cadence_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from the nearest `.cadence/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_cadence_dir(cwd).join("config.toml"))
    }

    /// Load a config file that may be missing; unreadable files are skipped
    /// with a warning.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load and validate config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_limited(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| CadenceError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !SchedulingConfig::is_valid_status_cap(self.scheduling.status_cap) {
            return Err(CadenceError::config("scheduling.status_cap must be at least 1"));
        }
        if !SchedulingConfig::is_valid_again_delay(self.scheduling.again_delay_minutes) {
            return Err(CadenceError::config(format!(
                "scheduling.again_delay_minutes must be between 1 and {}",
                MAX_AGAIN_DELAY_MINUTES
            )));
        }
        if let Some(minutes) = self.day.utc_offset_minutes {
            if !DayConfig::is_valid_offset(minutes) {
                return Err(CadenceError::config(format!(
                    "day.utc_offset_minutes {} is outside ±24h",
                    minutes
                )));
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // CADENCE_DAILY_NEW_LIMIT
        if let Ok(val) = env::var("CADENCE_DAILY_NEW_LIMIT") {
            match val.parse::<u32>() {
                Ok(n) => self.scheduling.daily_new_limit = n,
                Err(_) => eprintln!(
                    "Warning: Invalid CADENCE_DAILY_NEW_LIMIT value '{}', using default",
                    val
                ),
            }
        }

        // CADENCE_STATUS_CAP
        if let Ok(val) = env::var("CADENCE_STATUS_CAP") {
            match val.parse::<u32>() {
                Ok(n) if SchedulingConfig::is_valid_status_cap(n) => {
                    self.scheduling.status_cap = n
                }
                Ok(n) => eprintln!(
                    "Warning: Invalid CADENCE_STATUS_CAP value '{}' (must be >= 1), using default",
                    n
                ),
                Err(_) => eprintln!(
                    "Warning: Invalid CADENCE_STATUS_CAP value '{}', using default",
                    val
                ),
            }
        }

        // CADENCE_UTC_OFFSET_MINUTES
        if let Ok(val) = env::var("CADENCE_UTC_OFFSET_MINUTES") {
            match val.parse::<i32>() {
                Ok(n) if DayConfig::is_valid_offset(n) => self.day.utc_offset_minutes = Some(n),
                Ok(n) => eprintln!(
                    "Warning: Invalid CADENCE_UTC_OFFSET_MINUTES value '{}' (must be within ±1439), using default",
                    n
                ),
                Err(_) => eprintln!(
                    "Warning: Invalid CADENCE_UTC_OFFSET_MINUTES value '{}', using default",
                    val
                ),
            }
        }

        // CADENCE_DATA_DIR
        if let Ok(val) = env::var("CADENCE_DATA_DIR") {
            if val.is_empty() {
                eprintln!("Warning: CADENCE_DATA_DIR is empty, using default");
            } else {
                self.storage.data_dir = Some(PathBuf::from(val));
            }
        }

        // CADENCE_CATALOG_DIR
        if let Ok(val) = env::var("CADENCE_CATALOG_DIR") {
            if val.is_empty() {
                eprintln!("Warning: CADENCE_CATALOG_DIR is empty, using default");
            } else {
                self.storage.catalog_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value in
    /// `other` that differs from the default replaces the value in `self`.
    ///
    /// # Limitation
    ///
    /// A layer cannot set a value back to its default to override a
    /// non-default value from a lower layer. A project config with
    /// `daily_new_limit = 20` does not undo a user config with
    /// `daily_new_limit = 10`.
    fn merge(mut self, other: Config) -> Self {
        let default_scheduling = SchedulingConfig::default();
        if other.scheduling.daily_new_limit != default_scheduling.daily_new_limit {
            self.scheduling.daily_new_limit = other.scheduling.daily_new_limit;
        }
        if other.scheduling.study_again_threshold != default_scheduling.study_again_threshold {
            self.scheduling.study_again_threshold = other.scheduling.study_again_threshold;
        }
        if other.scheduling.status_cap != default_scheduling.status_cap {
            self.scheduling.status_cap = other.scheduling.status_cap;
        }
        if other.scheduling.again_delay_minutes != default_scheduling.again_delay_minutes {
            self.scheduling.again_delay_minutes = other.scheduling.again_delay_minutes;
        }

        if other.day.utc_offset_minutes.is_some() {
            self.day.utc_offset_minutes = other.day.utc_offset_minutes;
        }

        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }
        if other.storage.catalog_dir.is_some() {
            self.storage.catalog_dir = other.storage.catalog_dir;
        }

        self
    }

    /// Resolved learner data directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(default_data_dir)
    }

    /// Resolved deck catalog directory.
    pub fn catalog_dir(&self) -> Option<PathBuf> {
        self.storage.catalog_dir.clone().or_else(default_catalog_dir)
    }
}

/// Get the Cadence home directory.
///
/// Checks `CADENCE_HOME` environment variable first, then falls back to
/// `~/.cadence`.
///
/// An empty `CADENCE_HOME` is ignored. A relative one is canonicalized when
/// it exists and used as-is otherwise.
pub fn cadence_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("CADENCE_HOME") {
        if home.is_empty() {
            tracing::warn!("CADENCE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("CADENCE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".cadence"));
    }

    // Containerized/minimal environments without HOME
    let fallback_path = fallback_cadence_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Get fallback cadence home path when HOME is unavailable.
#[cfg(unix)]
fn fallback_cadence_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/cadence-{}", uid))
}

/// Get fallback cadence home path when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_cadence_home() -> PathBuf {
    std::env::temp_dir().join("cadence")
}

/// Get the default learner data directory.
///
/// Returns `<cadence_home>/data/`.
pub fn default_data_dir() -> Option<PathBuf> {
    cadence_home().map(|h| h.join("data"))
}

/// Get the default deck catalog directory.
///
/// Returns `<cadence_home>/decks/`.
pub fn default_catalog_dir() -> Option<PathBuf> {
    cadence_home().map(|h| h.join("decks"))
}

/// Get the crash log path.
///
/// Returns `<cadence_home>/crash.log`.
pub fn crash_log_path() -> Option<PathBuf> {
    cadence_home().map(|h| h.join("crash.log"))
}

/// Get the project `.cadence` directory for a working directory.
///
/// Walks up from `cwd` to the nearest ancestor with a `.cadence/`
/// directory; falls back to `<cwd>/.cadence`.
pub fn project_cadence_dir(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .map(|ancestor| ancestor.join(".cadence"))
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| cwd.join(".cadence"))
}
