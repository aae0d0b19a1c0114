//! Reasoning and telemetry configuration, persisted as TOML.
//!
//! Every field has a default, so a partial file (or none at all) is valid.
//!
//! ```toml
//! [reasoning]
//! visibility_threshold = 0.6
//!
//! [telemetry]
//! log_filter = "prospect_reasoning=debug"
//! json = true
//! ```

use std::fs;
use std::path::Path;

use prospect_types::ProspectError;
use prospect_world::WorldConfig;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Constants used by the reasoning queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Gravity applied during the stability test, m/s².
    pub gravity: [f64; 3],
    /// Simulated seconds the stability test runs for.
    pub stability_duration: f64,
    /// Decimal places positions are rounded to before comparison.
    pub stability_decimals: u32,
    /// Default share of an object's unoccluded pixels that must be seen.
    pub visibility_threshold: f64,
    /// Default end-effector distance, in metres, that still counts as reached.
    pub reachability_threshold: f64,
    /// Distance in front of the camera that rendering looks at.
    pub camera_target_distance: f64,
    /// Where bodies are parked to isolate an object in a render.
    pub out_of_frame_position: [f64; 3],
    /// Name of the body ignored by robot collision checks.
    pub floor_name: String,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.8],
            stability_duration: 2.0,
            stability_decimals: 3,
            visibility_threshold: 0.8,
            reachability_threshold: 0.01,
            camera_target_distance: 2.0,
            out_of_frame_position: [100.0, 100.0, 0.0],
            floor_name: "floor".to_string(),
        }
    }
}

/// Logging and span export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive string.
    pub log_filter: String,
    /// Emit newline-delimited JSON instead of compact text.
    pub json: bool,
    /// OTLP/HTTP collector base URL; span export is off when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            json: false,
            otlp_endpoint: None,
            service_name: "prospect".to_string(),
        }
    }
}

/// The complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProspectConfig {
    pub world: WorldConfig,
    pub reasoning: ReasoningConfig,
    pub telemetry: TelemetryConfig,
}

// ────────────────────────────────────────────────────────────────────────────
// Loading and saving
// ────────────────────────────────────────────────────────────────────────────

impl ProspectConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// [`ProspectError::InvalidConfig`] when the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, ProspectError> {
        toml::from_str(text).map_err(|e| ProspectError::InvalidConfig(e.to_string()))
    }

    /// Load the config from `path` and apply `PROSPECT_*` overrides.
    /// Returns `None` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ProspectError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let mut cfg = Self::from_toml_str(&raw)?;
        cfg.apply_env_overrides();
        Ok(Some(cfg))
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ProspectError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ProspectError::InvalidConfig(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Apply `PROSPECT_*` environment variable overrides.
    ///
    /// | Variable | Config field |
    /// |---|---|
    /// | `PROSPECT_LOG` | `telemetry.log_filter` |
    /// | `PROSPECT_LOG_FORMAT=json` | `telemetry.json` |
    /// | `PROSPECT_OTLP_ENDPOINT` | `telemetry.otlp_endpoint` |
    /// | `PROSPECT_VISIBILITY_THRESHOLD` | `reasoning.visibility_threshold` |
    /// | `PROSPECT_REACHABILITY_THRESHOLD` | `reasoning.reachability_threshold` |
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable numbers are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PROSPECT_LOG") {
            self.telemetry.log_filter = v;
        }
        if let Some(v) = lookup("PROSPECT_LOG_FORMAT") {
            self.telemetry.json = v == "json";
        }
        if let Some(v) = lookup("PROSPECT_OTLP_ENDPOINT") {
            self.telemetry.otlp_endpoint = Some(v);
        }
        if let Some(v) = lookup("PROSPECT_VISIBILITY_THRESHOLD")
            && let Ok(t) = v.parse::<f64>()
        {
            self.reasoning.visibility_threshold = t;
        }
        if let Some(v) = lookup("PROSPECT_REACHABILITY_THRESHOLD")
            && let Ok(t) = v.parse::<f64>()
        {
            self.reasoning.reachability_threshold = t;
        }
    }
}
