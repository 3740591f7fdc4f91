use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    #[serde(default)]
    pub restore: RestoreConfig,

    #[serde(default)]
    pub routes: RouteRules,
}

/// Timing and tolerance for restoration sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// How far short of the target the scrollable extent may be and still
    /// count as tall enough (layout rounding, sub-pixel heights)
    #[serde(default = "default_tolerance_px")]
    pub tolerance_px: f64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Polls before giving up and forcing the scroll
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long the guard stays armed after the restoring scroll lands
    #[serde(default = "default_grace_window")]
    pub grace_window_ms: u64,

    /// Upper bound on how long the guard may stay armed for one session
    #[serde(default = "default_guard_hard_cap")]
    pub guard_hard_cap_ms: u64,
}

fn default_tolerance_px() -> f64 {
    50.0
}

fn default_poll_interval() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    50
}

fn default_grace_window() -> u64 {
    200
}

fn default_guard_hard_cap() -> u64 {
    2000
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            tolerance_px: default_tolerance_px(),
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            grace_window_ms: default_grace_window(),
            guard_hard_cap_ms: default_guard_hard_cap(),
        }
    }
}

impl RestoreConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }

    pub fn guard_hard_cap(&self) -> Duration {
        Duration::from_millis(self.guard_hard_cap_ms)
    }

    /// Time the polling path needs to run out of attempts
    pub fn polling_budget(&self) -> Duration {
        self.poll_interval() * self.max_attempts
    }
}

/// Route pattern lists used by the classifier.
///
/// Patterns are regular expressions matched against the whole route
/// identity (path plus query). Anything matching neither list is scrollable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRules {
    /// Layers stacked over another page (modals, intercepted routes)
    #[serde(default = "default_overlay_patterns")]
    pub overlay: Vec<String>,

    /// Pages that own an internal scroller and never move the root viewport
    #[serde(default = "default_non_scrolling_patterns")]
    pub non_scrolling: Vec<String>,
}

fn default_overlay_patterns() -> Vec<String> {
    vec![
        r"^/(settings|create|notifications|help|privacy|terms|emergency-contacts)(/|\?|$)"
            .to_string(),
        r"^/post/[^/?]+".to_string(),
    ]
}

fn default_non_scrolling_patterns() -> Vec<String> {
    vec![
        r"^/watch(/|\?|$)".to_string(),
        r"^/map(/|\?|$)".to_string(),
        r"^/messages/[^/?]+".to_string(),
    ]
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            overlay: default_overlay_patterns(),
            non_scrolling: default_non_scrolling_patterns(),
        }
    }
}

impl ScrollConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: ScrollConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        tracing::debug!("Loaded scroll config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let restore = &self.restore;

        if !restore.tolerance_px.is_finite() || restore.tolerance_px < 0.0 {
            return Err(ConfigError::ValidationError(
                "tolerance_px must be a non-negative number".to_string(),
            ));
        }

        if restore.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if restore.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if restore.guard_hard_cap_ms == 0 {
            return Err(ConfigError::ValidationError(
                "guard_hard_cap_ms must be greater than 0".to_string(),
            ));
        }

        if restore.grace_window_ms > restore.guard_hard_cap_ms {
            return Err(ConfigError::ValidationError(
                "grace_window_ms must not exceed guard_hard_cap_ms".to_string(),
            ));
        }

        for pattern in self.routes.overlay.iter().chain(&self.routes.non_scrolling) {
            if let Err(e) = Regex::new(pattern) {
                return Err(ConfigError::ValidationError(format!(
                    "invalid route pattern {pattern:?}: {e}"
                )));
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
