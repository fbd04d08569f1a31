use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use sitematch_core::{
    Coordinates, GeocodePort, GeocodingService, MatchEngine, MatchRecord, ProviderRegistry,
    cancelled, enrich,
};
use sitematch_provider_geoapify as geoapify;
use sitematch_provider_mapbox as mapbox;
use sitematch_provider_nominatim as nominatim;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{AppConfig, ProvidersConfig};

/// Side maps supplied next to the address lists.
#[derive(Debug, Default)]
pub(crate) struct SideMaps {
    pub property_ids: HashMap<String, String>,
    pub tenants: HashMap<String, String>,
}

pub(crate) struct App {
    pub engine: MatchEngine,
    pub service: GeocodingService,
}

impl App {
    pub(crate) fn new(config: &AppConfig, client: &Client) -> Self {
        let registry = ProviderRegistry::new(provider_ports(client, &config.providers));
        info!(providers = registry.len(), "geocoding providers registered");

        Self {
            engine: config.matching.engine(),
            service: GeocodingService::from_settings(registry, &config.geocoding),
        }
    }

    pub(crate) fn compare(
        &self,
        source: &[String],
        target: &[String],
        side_maps: &SideMaps,
    ) -> Vec<MatchRecord> {
        let mut records = self.engine.match_lists(source, target);
        enrich(&mut records, &side_maps.property_ids, &side_maps.tenants);
        records
    }

    /// Geocode every address left without a counterpart, using its tenant as business hint.
    ///
    /// Flipping `cancel` to `true` stops the run and drops the in-flight lookup; addresses
    /// resolved so far are returned.
    pub(crate) async fn geocode_missing(
        &self,
        records: &[MatchRecord],
        mut cancel: watch::Receiver<bool>,
    ) -> HashMap<String, Option<Coordinates>> {
        let mut resolved = HashMap::new();
        for record in records {
            let Some(address) = record.unmatched_address() else {
                continue;
            };
            if resolved.contains_key(address) {
                continue;
            }
            if *cancel.borrow() {
                warn!(resolved = resolved.len(), "geocoding of leftovers cancelled");
                break;
            }

            let lookup = self
                .service
                .enhanced_geocode(address, record.tenant.as_deref());
            let coordinates = tokio::select! {
                coordinates = lookup => coordinates,
                () = cancelled(&mut cancel) => {
                    warn!(resolved = resolved.len(), "geocoding of leftovers cancelled");
                    break;
                }
            };
            if coordinates.is_none() {
                warn!(address, "needs manual resolution");
            }
            resolved.insert(address.to_owned(), coordinates);
        }
        resolved
    }
}

fn provider_ports(client: &Client, providers: &ProvidersConfig) -> Vec<Arc<dyn GeocodePort>> {
    let mut ports = Vec::new();

    if providers.nominatim.enabled {
        ports.push(nominatim::plugin(client.clone(), providers.nominatim.clone()));
    }

    if providers.geoapify.enabled {
        match credential(providers.geoapify.api_key.as_deref()) {
            Some(api_key) => {
                ports.push(geoapify::plugin(client.clone(), api_key, &providers.geoapify));
            }
            None => warn!("geoapify enabled without api_key, leaving it out"),
        }
    }

    if providers.mapbox.enabled {
        match credential(providers.mapbox.access_token.as_deref()) {
            Some(token) => ports.push(mapbox::plugin(client.clone(), token, &providers.mapbox)),
            None => warn!("mapbox enabled without access_token, leaving it out"),
        }
    }

    ports
}

fn credential(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|secret| !secret.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;

    fn config_with(geoapify_key: Option<&str>, mapbox_enabled: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.providers.geoapify.api_key = geoapify_key.map(str::to_owned);
        config.providers.mapbox.enabled = mapbox_enabled;
        config
    }

    fn provider_ids(config: &AppConfig) -> Vec<String> {
        provider_ports(&Client::new(), &config.providers)
            .iter()
            .map(|port| port.provider().id.0.clone())
            .collect()
    }

    #[test]
    fn providers_without_credentials_are_left_out() {
        assert_eq!(provider_ids(&config_with(None, true)), vec!["nominatim"]);
        assert_eq!(provider_ids(&config_with(Some("  "), true)), vec!["nominatim"]);
    }

    #[test]
    fn providers_keep_rotation_order() {
        let mut config = config_with(Some("key"), true);
        config.providers.mapbox.access_token = Some("pk.token".to_owned());
        assert_eq!(provider_ids(&config), vec!["nominatim", "geoapify", "mapbox"]);

        config.providers.nominatim.enabled = false;
        assert_eq!(provider_ids(&config), vec!["geoapify", "mapbox"]);
    }

    #[test]
    fn compare_attaches_side_maps() {
        let app = App::new(&AppConfig::default(), &Client::new());
        let side_maps = SideMaps {
            property_ids: HashMap::from([("1 Main Street".to_owned(), "P-1".to_owned())]),
            tenants: HashMap::from([("9 Elm Rd".to_owned(), "PetSmart".to_owned())]),
        };
        let records = app.compare(
            &["1 Main St".to_owned(), "9 Elm Rd".to_owned()],
            &["1 Main Street".to_owned()],
            &side_maps,
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].property_id.as_deref(), Some("P-1"));
        assert_eq!(records[1].tenant.as_deref(), Some("PetSmart"));
    }

    fn nominatim_only(server: &MockServer) -> AppConfig {
        let mut config = config_with(None, false);
        config.providers.nominatim.base_url = server.base_url();
        config.providers.nominatim.min_interval_ms = 10;
        config
    }

    fn leftovers(app: &App) -> Vec<MatchRecord> {
        app.compare(
            &["9 Elm Rd".to_owned(), "1 Main St".to_owned()],
            &["1 Main Street".to_owned(), "7 Pine Rd".to_owned()],
            &SideMaps::default(),
        )
    }

    #[tokio::test]
    async fn missing_addresses_are_geocoded() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).json_body(json!([{ "lat": "40.0", "lon": "-75.0" }]));
            })
            .await;
        let app = App::new(&nominatim_only(&server), &Client::new());
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let resolved = app.geocode_missing(&leftovers(&app), cancel_rx).await;

        mock.assert_calls_async(2).await;
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["9 Elm Rd"], Coordinates::checked(40.0, -75.0));
        assert_eq!(resolved["7 Pine Rd"], Coordinates::checked(40.0, -75.0));
        assert!(!resolved.contains_key("1 Main St"));
    }

    #[tokio::test]
    async fn cancelled_run_issues_no_lookups() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).json_body(json!([]));
            })
            .await;
        let app = App::new(&nominatim_only(&server), &Client::new());
        let (_cancel_tx, cancel_rx) = watch::channel(true);

        let resolved = app.geocode_missing(&leftovers(&app), cancel_rx).await;

        assert!(resolved.is_empty());
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn cancel_drops_the_in_flight_lookup() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .json_body(json!([{ "lat": "40.0", "lon": "-75.0" }]));
            })
            .await;
        let app = App::new(&nominatim_only(&server), &Client::new());
        let records = leftovers(&app);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let started = std::time::Instant::now();
        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel_tx.send_replace(true);
        };
        let (resolved, ()) = tokio::join!(app.geocode_missing(&records, cancel_rx), interrupt);

        assert!(resolved.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
