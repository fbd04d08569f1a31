//! Provider implementation for the Geoapify geocoding API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sitematch_core::{
    model::{Coordinates, ProviderId, ProviderMeta},
    ports::{GeocodeError, GeocodePort, query_text, recover},
    quota::{ProviderState, QuotaPolicy, QuotaTracker},
};

const BASE_URL: &str = "https://api.geoapify.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Geoapify settings.
pub struct GeoapifySettings {
    /// Whether the provider joins the rotation.
    pub enabled: bool,
    /// API key; the provider is skipped when absent.
    pub api_key: Option<String>,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Requests allowed per UTC day (free tier: 3000).
    pub daily_limit: u32,
}

impl Default for GeoapifySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: BASE_URL.to_owned(),
            daily_limit: 3000,
        }
    }
}

/// Response from /v1/geocode/search?format=json
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
    // "query" echoes the parsed request, no need to model it
}

/// Single candidate from /v1/geocode/search
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: f64,
    lon: f64,
}

/// Geocoding port backed by Geoapify.
pub struct GeoapifyGeocodePort {
    client: Client,
    meta: ProviderMeta,
    api_key: String,
    base_url: String,
    quota: QuotaTracker,
}

impl GeoapifyGeocodePort {
    /// Create a new port bound to the given HTTP client and API key.
    #[must_use]
    pub fn new(client: Client, api_key: String, settings: &GeoapifySettings) -> Self {
        Self {
            client,
            meta: provider_meta(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            quota: QuotaTracker::new(
                "geoapify",
                QuotaPolicy::Daily {
                    limit: settings.daily_limit,
                },
            ),
        }
    }

    /// Copy of the request bookkeeping.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.quota.snapshot()
    }

    async fn lookup(&self, query: &str) -> Result<Coordinates, GeocodeError> {
        let req = self
            .client
            .get(format!("{}/v1/geocode/search", self.base_url))
            .query(&[
                ("text", query),
                ("format", "json"),
                ("limit", "1"),
                ("apiKey", self.api_key.as_str()),
            ]);

        let resp = fetch_json::<SearchResponse>(req).await?;
        let first = resp.results.into_iter().next().ok_or(GeocodeError::NoResult)?;

        GeocodeError::check(first.lat, first.lon)
    }
}

#[async_trait]
impl GeocodePort for GeoapifyGeocodePort {
    fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    fn has_quota(&self) -> bool {
        self.quota.has_quota()
    }

    async fn geocode(&self, address: &str, hint: Option<&str>) -> Option<Coordinates> {
        if !self.quota.has_quota() {
            debug!(provider = %self.meta.id, "daily quota exhausted");
            return None;
        }
        self.quota.record_attempt();

        let query = query_text(address, hint);
        debug!(provider = %self.meta.id, query = %query, "geoapify search");
        recover(&self.meta, self.lookup(&query).await)
    }
}

/// Build the geocoding port for Geoapify.
#[must_use]
pub fn plugin(
    client: Client,
    api_key: String,
    settings: &GeoapifySettings,
) -> Arc<dyn GeocodePort> {
    Arc::new(GeoapifyGeocodePort::new(client, api_key, settings))
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId(String::from("geoapify")),
        name: String::from("Geoapify"),
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, GeocodeError> {
    req.send()
        .await
        .map_err(GeocodeError::from)?
        .error_for_status()
        .map_err(GeocodeError::from)?
        .json()
        .await
        .map_err(GeocodeError::from)
}
