//! Tunables for matching and geocoding, deserializable from a config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::matcher::{DEFAULT_FUZZY_THRESHOLD, MatchEngine};

#[derive(thiserror::Error, Debug, PartialEq)]
/// Invalid settings value.
pub enum SettingsError {
    /// Fuzzy threshold outside `[0, 1]`.
    #[error("fuzzy_threshold must be within 0..=1, got {0}")]
    Threshold(f64),
    /// A value that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Match engine settings.
pub struct MatchSettings {
    /// Minimum similarity for a fuzzy match.
    pub fuzzy_threshold: f64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl MatchSettings {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Threshold`] when the threshold is outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if (0.0..=1.0).contains(&self.fuzzy_threshold) {
            Ok(())
        } else {
            Err(SettingsError::Threshold(self.fuzzy_threshold))
        }
    }

    /// Engine configured with these settings.
    #[must_use]
    pub fn engine(&self) -> MatchEngine {
        MatchEngine::new(self.fuzzy_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Geocoding service settings.
pub struct GeocodingSettings {
    /// Upper bound for a single provider call, in seconds.
    pub call_timeout_secs: u64,
    /// Emit batch progress after this many addresses.
    pub progress_every: usize,
    /// Pause between addresses of a batch, in milliseconds.
    pub batch_pause_ms: u64,
    /// User agent sent to every backend.
    pub user_agent: String,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            progress_every: 10,
            batch_pause_ms: 1000,
            user_agent: format!("sitematch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GeocodingSettings {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero timeout or progress interval.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.call_timeout_secs == 0 {
            return Err(SettingsError::Zero("call_timeout_secs"));
        }
        if self.progress_every == 0 {
            return Err(SettingsError::Zero("progress_every"));
        }
        Ok(())
    }

    /// Per-call timeout.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Pause between batch addresses.
    #[must_use]
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}
