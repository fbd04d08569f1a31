//! Configuration file loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sitematch_core::{GeocodingSettings, MatchSettings};
use sitematch_provider_geoapify::GeoapifySettings;
use sitematch_provider_mapbox::MapboxSettings;
use sitematch_provider_nominatim::NominatimSettings;

/// Root configuration; every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub matching: MatchSettings,
    pub geocoding: GeocodingSettings,
    pub providers: ProvidersConfig,
}

/// Per-backend settings, in rotation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ProvidersConfig {
    pub nominatim: NominatimSettings,
    pub geoapify: GeoapifySettings,
    pub mapbox: MapboxSettings,
}

impl AppConfig {
    /// Load and validate the file at `path`, or fall back to defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub(crate) fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill credentials given on the command line or through the environment.
    pub(crate) fn with_credentials(
        mut self,
        geoapify_key: Option<String>,
        mapbox_token: Option<String>,
    ) -> Self {
        if geoapify_key.is_some() {
            self.providers.geoapify.api_key = geoapify_key;
        }
        if mapbox_token.is_some() {
            self.providers.mapbox.access_token = mapbox_token;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.geocoding.validate()?;
        if self.providers.geoapify.daily_limit == 0 {
            bail!("providers.geoapify.daily_limit must be greater than zero");
        }
        if self.providers.mapbox.monthly_limit == 0 {
            bail!("providers.mapbox.monthly_limit must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let text = r#"
[matching]
fuzzy_threshold = 0.8

[geocoding]
call_timeout_secs = 5
progress_every = 25

[providers.nominatim]
email = "ops@example.com"
min_interval_ms = 1500

[providers.geoapify]
api_key = "from-file"
daily_limit = 1000

[providers.mapbox]
enabled = false
"#;
        let config = AppConfig::from_toml(text).unwrap();
        assert!((config.matching.fuzzy_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.geocoding.call_timeout_secs, 5);
        assert_eq!(config.geocoding.progress_every, 25);
        assert_eq!(config.geocoding.batch_pause_ms, 1000);
        assert_eq!(config.providers.nominatim.email.as_deref(), Some("ops@example.com"));
        assert_eq!(config.providers.nominatim.min_interval_ms, 1500);
        assert_eq!(config.providers.geoapify.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.providers.geoapify.daily_limit, 1000);
        assert!(!config.providers.mapbox.enabled);
        assert_eq!(config.providers.mapbox.monthly_limit, 100_000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(AppConfig::from_toml("[matching]\nfuzzy_threshold = 2.0").is_err());
        assert!(AppConfig::from_toml("[geocoding]\ncall_timeout_secs = 0").is_err());
        assert!(AppConfig::from_toml("[providers.geoapify]\ndaily_limit = 0").is_err());
        assert!(AppConfig::from_toml("[matching]\nfuzzy_threshold = \"high\"").is_err());
    }

    #[test]
    fn command_line_credentials_win() {
        let config = AppConfig::from_toml("[providers.geoapify]\napi_key = \"from-file\"")
            .unwrap()
            .with_credentials(Some("from-env".to_owned()), None);
        assert_eq!(config.providers.geoapify.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.providers.mapbox.access_token, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/no/such/sitematch.toml"))).is_err());
        assert!(AppConfig::load(None).is_ok());
    }
}
