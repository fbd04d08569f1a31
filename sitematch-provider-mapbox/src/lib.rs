//! Provider implementation for Mapbox Geocoding v6 forward search.

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

const BASE_URL: &str = "https://api.mapbox.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Mapbox settings.
pub struct MapboxSettings {
    /// Whether the provider joins the rotation.
    pub enabled: bool,
    /// Access token; the provider is skipped when absent.
    pub access_token: Option<String>,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Requests allowed per UTC calendar month.
    pub monthly_limit: u32,
}

impl Default for MapboxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            access_token: None,
            base_url: BASE_URL.to_owned(),
            monthly_limit: 100_000,
        }
    }
}

/// GeoJSON FeatureCollection from /search/geocode/v6/forward
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    // "properties" carries the formatted address, we only need the point
}

/// Point geometry; coordinates are `[longitude, latitude]`.
#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Geocoding port backed by Mapbox.
pub struct MapboxGeocodePort {
    client: Client,
    meta: ProviderMeta,
    access_token: String,
    base_url: String,
    quota: QuotaTracker,
}

impl MapboxGeocodePort {
    /// Create a new port bound to the given HTTP client and access token.
    #[must_use]
    pub fn new(client: Client, access_token: String, settings: &MapboxSettings) -> Self {
        Self {
            client,
            meta: provider_meta(),
            access_token,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            quota: QuotaTracker::new(
                "mapbox",
                QuotaPolicy::Monthly {
                    limit: settings.monthly_limit,
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
            .get(format!("{}/search/geocode/v6/forward", self.base_url))
            .query(&[
                ("q", query),
                ("limit", "1"),
                ("access_token", self.access_token.as_str()),
            ]);

        let collection = fetch_json::<FeatureCollection>(req).await?;
        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or(GeocodeError::NoResult)?;

        match feature.geometry.coordinates.as_slice() {
            [longitude, latitude, ..] => GeocodeError::check(*latitude, *longitude),
            _ => Err(GeocodeError::Internal(
                "Point geometry without two coordinates".into(),
            )),
        }
    }
}

#[async_trait]
impl GeocodePort for MapboxGeocodePort {
    fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    fn has_quota(&self) -> bool {
        self.quota.has_quota()
    }

    async fn geocode(&self, address: &str, hint: Option<&str>) -> Option<Coordinates> {
        if !self.quota.has_quota() {
            debug!(provider = %self.meta.id, "monthly quota exhausted");
            return None;
        }
        self.quota.record_attempt();

        let query = query_text(address, hint);
        debug!(provider = %self.meta.id, query = %query, "mapbox forward search");
        recover(&self.meta, self.lookup(&query).await)
    }
}

/// Build the geocoding port for Mapbox.
#[must_use]
pub fn plugin(
    client: Client,
    access_token: String,
    settings: &MapboxSettings,
) -> Arc<dyn GeocodePort> {
    Arc::new(MapboxGeocodePort::new(client, access_token, settings))
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId(String::from("mapbox")),
        name: String::from("Mapbox"),
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
