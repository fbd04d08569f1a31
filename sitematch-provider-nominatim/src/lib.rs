//! Provider implementation for OpenStreetMap Nominatim.
//!
//! Nominatim's usage policy allows at most one request per second and has no count quota, so this
//! adapter is rate-limited only.

use std::sync::Arc;
use std::time::Duration;

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

const BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Nominatim settings.
pub struct NominatimSettings {
    /// Whether the provider joins the rotation.
    pub enabled: bool,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Contact address sent with each request, as the usage policy asks.
    pub email: Option<String>,
    /// Minimum gap between requests, in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for NominatimSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: BASE_URL.to_owned(),
            email: None,
            min_interval_ms: 1000,
        }
    }
}

/// Single match from /search?format=jsonv2
#[derive(Debug, Deserialize)]
struct Place {
    // coordinates arrive as strings
    lat: String,
    lon: String,
}

/// Geocoding port backed by Nominatim.
pub struct NominatimGeocodePort {
    client: Client,
    meta: ProviderMeta,
    settings: NominatimSettings,
    quota: QuotaTracker,
}

impl NominatimGeocodePort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: NominatimSettings) -> Self {
        let interval = Duration::from_millis(settings.min_interval_ms);
        Self {
            client,
            meta: provider_meta(),
            quota: QuotaTracker::new("nominatim", QuotaPolicy::MinInterval(interval)),
            settings,
        }
    }

    /// Copy of the request bookkeeping.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.quota.snapshot()
    }

    async fn lookup(&self, query: &str) -> Result<Coordinates, GeocodeError> {
        let base_url = self.settings.base_url.trim_end_matches('/');
        let mut req = self.client.get(format!("{base_url}/search")).query(&[
            ("q", query),
            ("format", "jsonv2"),
            ("limit", "1"),
        ]);

        if let Some(email) = self.settings.email.as_deref() {
            req = req.query(&[("email", email)]);
        }

        let places = fetch_json::<Vec<Place>>(req).await?;
        let place = places.into_iter().next().ok_or(GeocodeError::NoResult)?;

        GeocodeError::check(place.lat.trim().parse()?, place.lon.trim().parse()?)
    }
}

#[async_trait]
impl GeocodePort for NominatimGeocodePort {
    fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    fn has_quota(&self) -> bool {
        self.quota.has_quota()
    }

    fn cooldown(&self) -> Option<Duration> {
        self.quota.cooldown()
    }

    async fn geocode(&self, address: &str, hint: Option<&str>) -> Option<Coordinates> {
        self.quota.wait_for_slot().await;
        self.quota.record_attempt();

        let query = query_text(address, hint);
        debug!(provider = %self.meta.id, query = %query, "nominatim search");
        recover(&self.meta, self.lookup(&query).await)
    }
}

/// Build the geocoding port for Nominatim.
#[must_use]
pub fn plugin(client: Client, settings: NominatimSettings) -> Arc<dyn GeocodePort> {
    Arc::new(NominatimGeocodePort::new(client, settings))
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId(String::from("nominatim")),
        name: String::from("OpenStreetMap Nominatim"),
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
