//! Domain data structures for match results, coordinates, and provider metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Outcome of comparing one address against the opposite list.
pub enum MatchType {
    /// Canonical forms are equal.
    Exact,
    /// Similarity reached the fuzzy threshold without canonical equality.
    Fuzzy,
    /// No qualifying counterpart on the other side.
    Missing,
}

impl fmt::Display for MatchType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchType::Exact => "exact",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Missing => "missing",
        };
        write!(formatter, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One row of a comparison run.
pub struct MatchRecord {
    /// Original source-list address, empty for leftover target rows.
    pub source_address: String,
    /// Original target-list address, empty when the source row is missing.
    pub target_address: String,
    /// Similarity in `[0, 1]`.
    pub score: f64,
    /// Match classification.
    pub match_type: MatchType,
    /// Property identifier attached by the caller after matching.
    pub property_id: Option<String>,
    /// Tenant name attached by the caller after matching.
    pub tenant: Option<String>,
}

impl MatchRecord {
    /// Source row without a counterpart.
    #[must_use]
    pub fn missing_source(source: &str) -> Self {
        Self {
            source_address: source.to_owned(),
            target_address: String::new(),
            score: 0.0,
            match_type: MatchType::Missing,
            property_id: None,
            tenant: None,
        }
    }

    /// Target row never consumed by any source row.
    #[must_use]
    pub fn leftover_target(target: &str) -> Self {
        Self {
            source_address: String::new(),
            target_address: target.to_owned(),
            score: 0.0,
            match_type: MatchType::Missing,
            property_id: None,
            tenant: None,
        }
    }

    /// The address that still lacks a counterpart, if this row is missing.
    #[must_use]
    pub fn unmatched_address(&self) -> Option<&str> {
        if self.match_type != MatchType::Missing {
            return None;
        }
        if self.source_address.is_empty() {
            Some(&self.target_address)
        } else {
            Some(&self.source_address)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Counts per match type for a comparison run.
pub struct MatchSummary {
    /// Exact matches.
    pub exact: usize,
    /// Fuzzy matches.
    pub fuzzy: usize,
    /// Source rows without a counterpart.
    pub missing_source: usize,
    /// Target rows never consumed.
    pub missing_target: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Latitude/longitude pair in decimal degrees.
pub struct Coordinates {
    /// Latitude, `-90..=90`.
    pub latitude: f64,
    /// Longitude, `-180..=180`.
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting non-finite or out-of-range values.
    #[must_use]
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a geocoding backend.
pub struct ProviderId(pub String);

impl fmt::Display for ProviderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a geocoding backend.
pub struct ProviderMeta {
    /// Unique identifier.
    pub id: ProviderId,
    /// Human-friendly name.
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Progress of a batch geocoding run.
pub struct BatchProgress {
    /// Addresses handled so far.
    pub processed: usize,
    /// Addresses submitted.
    pub total: usize,
    /// Addresses that resolved to coordinates.
    pub succeeded: usize,
}

impl BatchProgress {
    /// Addresses handled without a result.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.processed.saturating_sub(self.succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_non_finite_and_out_of_range() {
        assert!(Coordinates::checked(40.0, -75.0).is_some());
        assert!(Coordinates::checked(f64::NAN, 0.0).is_none());
        assert!(Coordinates::checked(0.0, f64::INFINITY).is_none());
        assert!(Coordinates::checked(91.0, 0.0).is_none());
        assert!(Coordinates::checked(0.0, -180.5).is_none());
    }

    #[test]
    fn unmatched_address_picks_the_populated_side() {
        let source = MatchRecord::missing_source("789 Elm Rd");
        let target = MatchRecord::leftover_target("100 Pine Blvd");
        assert_eq!(source.unmatched_address(), Some("789 Elm Rd"));
        assert_eq!(target.unmatched_address(), Some("100 Pine Blvd"));

        let mut exact = MatchRecord::missing_source("1 A St");
        exact.match_type = MatchType::Exact;
        assert_eq!(exact.unmatched_address(), None);
    }

    #[test]
    fn progress_failed_count() {
        let progress = BatchProgress {
            processed: 10,
            total: 25,
            succeeded: 7,
        };
        assert_eq!(progress.failed(), 3);
    }
}
