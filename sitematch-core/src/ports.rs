//! Traits describing geocoding provider capabilities and shared helper types.

use std::num::ParseFloatError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use tracing::{debug, warn};

use crate::model::{Coordinates, ProviderMeta};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to geocoding backends.
pub enum GeocodeError {
    /// Network layer failed or the backend answered with a non-success status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// A coordinate field could not be parsed as a number.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseFloatError),
    /// The backend answered but had no candidate for the query.
    #[error("No result")]
    NoResult,
    /// The first candidate carried coordinates outside the valid range.
    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinates {
        /// Reported latitude.
        latitude: f64,
        /// Reported longitude.
        longitude: f64,
    },
    /// The call did not finish within the per-call budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeocodeError {
    /// Validate a coordinate pair reported by a backend.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::InvalidCoordinates`] for non-finite or out-of-range values.
    pub fn check(latitude: f64, longitude: f64) -> Result<Coordinates, GeocodeError> {
        Coordinates::checked(latitude, longitude).ok_or(GeocodeError::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}

#[async_trait]
/// Trait for a single external geocoding backend.
///
/// Implementations own their credential and quota policy. Backend failures are reported as
/// `None`, never as an error escaping the adapter.
pub trait GeocodePort: Send + Sync {
    /// Metadata describing the backend.
    fn provider(&self) -> &ProviderMeta;

    /// Whether a call may be issued right now.
    fn has_quota(&self) -> bool;

    /// Time left before a rate-limited backend accepts the next call.
    ///
    /// `None` when the backend is not cooling down, including when a counted quota is spent.
    fn cooldown(&self) -> Option<Duration> {
        None
    }

    /// Resolve an address, optionally prefixed by a disambiguating hint.
    async fn geocode(&self, address: &str, hint: Option<&str>) -> Option<Coordinates>;
}

/// Query text sent to a backend: `"<hint> <address>"`, or the address alone.
#[must_use]
pub fn query_text(address: &str, hint: Option<&str>) -> String {
    let address = address.trim();
    match hint.map(str::trim).filter(|hint| !hint.is_empty()) {
        Some(hint) => format!("{hint} {address}"),
        None => address.to_owned(),
    }
}

/// Convert a provider outcome into the adapter contract, logging failures.
#[must_use]
pub fn recover(
    provider: &ProviderMeta,
    outcome: Result<Coordinates, GeocodeError>,
) -> Option<Coordinates> {
    match outcome {
        Ok(coordinates) => Some(coordinates),
        Err(GeocodeError::NoResult) => {
            debug!(provider = %provider.id, "no geocoding candidate");
            None
        }
        Err(err) => {
            warn!(provider = %provider.id, error = %err, "geocoding request failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderId;

    fn meta() -> ProviderMeta {
        ProviderMeta {
            id: ProviderId("test".to_owned()),
            name: "Test".to_owned(),
        }
    }

    #[test]
    fn query_text_prepends_hint() {
        assert_eq!(query_text("1 Test Way", Some("pet store")), "pet store 1 Test Way");
        assert_eq!(query_text(" 1 Test Way ", None), "1 Test Way");
        assert_eq!(query_text("1 Test Way", Some("  ")), "1 Test Way");
    }

    #[test]
    fn check_rejects_out_of_range() {
        assert!(GeocodeError::check(40.0, -75.0).is_ok());
        assert!(matches!(
            GeocodeError::check(f64::NAN, -75.0),
            Err(GeocodeError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn recover_turns_errors_into_absent() {
        let provider = meta();
        let found = Coordinates::checked(1.0, 2.0);
        assert_eq!(recover(&provider, GeocodeError::check(1.0, 2.0)), found);
        assert_eq!(recover(&provider, Err(GeocodeError::NoResult)), None);
        assert_eq!(
            recover(&provider, Err(GeocodeError::Internal("boom".to_owned()))),
            None
        );
    }
}
