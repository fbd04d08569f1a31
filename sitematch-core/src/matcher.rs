//! Greedy one-to-one matching between a source and a target address list.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{MatchRecord, MatchSummary, MatchType};
use crate::normalize::normalize;
use crate::similarity::similarity;

/// Minimum similarity for a fuzzy match (inclusive).
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

/// Similarity function applied to two canonical addresses.
pub type Scorer = fn(&str, &str) -> f64;

/// Matches every source address against the target list.
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine {
    threshold: f64,
    scorer: Scorer,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl MatchEngine {
    /// Engine using the blended similarity score and the given fuzzy threshold.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            scorer: similarity,
        }
    }

    /// Replace the similarity function.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Fuzzy threshold in use.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classification of a best non-exact score.
    #[must_use]
    pub fn classify(&self, score: f64) -> MatchType {
        if score >= self.threshold {
            MatchType::Fuzzy
        } else {
            MatchType::Missing
        }
    }

    /// Compare two lists.
    ///
    /// Produces one record per source address in source order, followed by one record per target
    /// address that no source address consumed, in target order. Exact lookups scan the whole
    /// target list, consumed entries included; fuzzy lookups only consider unconsumed entries.
    #[must_use]
    pub fn match_lists<S: AsRef<str>>(&self, source: &[S], target: &[S]) -> Vec<MatchRecord> {
        let source_normalized: Vec<String> =
            source.iter().map(|raw| normalize(raw.as_ref())).collect();
        let target_normalized: Vec<String> =
            target.iter().map(|raw| normalize(raw.as_ref())).collect();

        let mut consumed = vec![false; target.len()];
        let mut records = Vec::with_capacity(source.len() + target.len());

        for (raw_source, canonical) in source.iter().zip(&source_normalized) {
            let raw_source = raw_source.as_ref();

            let exact = target_normalized
                .iter()
                .position(|candidate| candidate == canonical);

            if let Some(index) = exact {
                if let Some(slot) = consumed.get_mut(index) {
                    *slot = true;
                }
                records.push(MatchRecord {
                    source_address: raw_source.to_owned(),
                    target_address: target_text(target, index),
                    score: 1.0,
                    match_type: MatchType::Exact,
                    property_id: None,
                    tenant: None,
                });
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (index, candidate) in target_normalized.iter().enumerate() {
                if consumed.get(index).copied().unwrap_or(true) {
                    continue;
                }
                let score = (self.scorer)(canonical, candidate);
                if best.is_none_or(|(_, best_score)| score > best_score) {
                    best = Some((index, score));
                }
            }

            match best {
                Some((index, score)) if self.classify(score) == MatchType::Fuzzy => {
                    if let Some(slot) = consumed.get_mut(index) {
                        *slot = true;
                    }
                    records.push(MatchRecord {
                        source_address: raw_source.to_owned(),
                        target_address: target_text(target, index),
                        score,
                        match_type: MatchType::Fuzzy,
                        property_id: None,
                        tenant: None,
                    });
                }
                _ => records.push(MatchRecord::missing_source(raw_source)),
            }
        }

        records.extend(
            target
                .iter()
                .zip(&consumed)
                .filter(|(_, used)| !**used)
                .map(|(raw_target, _)| MatchRecord::leftover_target(raw_target.as_ref())),
        );

        debug!(
            sources = source.len(),
            targets = target.len(),
            records = records.len(),
            "address lists compared"
        );

        records
    }
}

/// Compare two lists with the default engine.
#[must_use]
pub fn match_addresses<S: AsRef<str>>(source: &[S], target: &[S]) -> Vec<MatchRecord> {
    MatchEngine::default().match_lists(source, target)
}

/// Attach property identifiers and tenant names keyed by original address.
///
/// The target-side address is looked up first, then the source-side one.
pub fn enrich(
    records: &mut [MatchRecord],
    property_ids: &HashMap<String, String>,
    tenants: &HashMap<String, String>,
) {
    for record in records {
        let lookup = |side: &HashMap<String, String>| {
            side.get(&record.target_address)
                .or_else(|| side.get(&record.source_address))
                .cloned()
        };
        let property_id = lookup(property_ids);
        let tenant = lookup(tenants);

        record.property_id = property_id;
        record.tenant = tenant;
    }
}

/// Count records per match type.
#[must_use]
pub fn summarize(records: &[MatchRecord]) -> MatchSummary {
    records
        .iter()
        .fold(MatchSummary::default(), |mut summary, record| {
            match record.match_type {
                MatchType::Exact => summary.exact += 1,
                MatchType::Fuzzy => summary.fuzzy += 1,
                MatchType::Missing if record.source_address.is_empty() => {
                    summary.missing_target += 1;
                }
                MatchType::Missing => summary.missing_source += 1,
            }
            summary
        })
}

fn target_text<S: AsRef<str>>(target: &[S], index: usize) -> String {
    target
        .get(index)
        .map(|raw| raw.as_ref().to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_after_normalization() {
        let records = match_addresses(
            &["123 Main Street, Springfield, IL 62701"],
            &["123 Main St, Springfield, IL"],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].match_type, MatchType::Exact);
        assert!((records[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(records[0].target_address, "123 Main St, Springfield, IL");
    }

    #[test]
    fn source_without_targets_is_missing() {
        let records = match_addresses(&["789 Elm Rd"], &[]);
        assert_eq!(records, vec![MatchRecord::missing_source("789 Elm Rd")]);
        assert_eq!(records[0].target_address, "");
        assert!(records[0].score.abs() < f64::EPSILON);
    }

    #[test]
    fn target_without_sources_is_leftover() {
        let records = match_addresses::<&str>(&[], &["100 Pine Blvd"]);
        assert_eq!(records, vec![MatchRecord::leftover_target("100 Pine Blvd")]);
        assert_eq!(records[0].source_address, "");
    }

    #[test]
    fn empty_lists_produce_no_records() {
        assert!(match_addresses::<&str>(&[], &[]).is_empty());
    }

    #[test]
    fn fuzzy_match_consumes_target() {
        let records = match_addresses(
            &["1200 Pennsylvania Avenue NW, Washington, DC"],
            &["1200 Pennsylvania Ave NW, Washington"],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].match_type, MatchType::Fuzzy);
        assert!(records[0].score >= DEFAULT_FUZZY_THRESHOLD);
        assert!(records[0].score < 1.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let at_threshold = MatchEngine::default().with_scorer(|_, _| 0.7);
        let records = at_threshold.match_lists(&["1 A St"], &["2 B St"]);
        assert_eq!(records[0].match_type, MatchType::Fuzzy);
        assert!((records[0].score - 0.7).abs() < f64::EPSILON);

        let below = MatchEngine::default().with_scorer(|_, _| 0.6999);
        let records = below.match_lists(&["1 A St"], &["2 B St"]);
        assert_eq!(records[0].match_type, MatchType::Missing);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn fuzzy_ties_go_to_lowest_index() {
        let engine = MatchEngine::default().with_scorer(|_, _| 0.8);
        let records = engine.match_lists(&["1 A St"], &["first", "second"]);
        assert_eq!(records[0].target_address, "first");
        assert_eq!(records[1], MatchRecord::leftover_target("second"));
    }

    #[test]
    fn fuzzy_never_reuses_a_consumed_target() {
        let engine = MatchEngine::default().with_scorer(|_, _| 0.9);
        let records = engine.match_lists(&["a", "b"], &["only"]);
        assert_eq!(records[0].match_type, MatchType::Fuzzy);
        assert_eq!(records[1].match_type, MatchType::Missing);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn exact_match_may_reuse_a_consumed_target() {
        let records = match_addresses(&["5 Oak Street", "5 Oak St."], &["5 OAK ST"]);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| {
            record.match_type == MatchType::Exact && record.target_address == "5 OAK ST"
        }));
    }

    #[test]
    fn every_address_is_represented() {
        let source = ["10 First St", "22 Second Ave", "77 Unknown Way", "10 First Street"];
        let target = ["10 FIRST ST", "22 Second Avenue Suite 4", "900 Lonely Rd", "5 Other Pl"];
        let records = match_addresses(&source, &target);

        let source_rows: Vec<_> = records
            .iter()
            .filter(|record| !record.source_address.is_empty())
            .collect();
        assert_eq!(source_rows.len(), source.len());
        for (row, original) in source_rows.iter().zip(source) {
            assert_eq!(row.source_address, original);
        }

        let leftovers: Vec<_> = records
            .iter()
            .filter(|record| record.source_address.is_empty())
            .map(|record| record.target_address.as_str())
            .collect();
        assert_eq!(leftovers, vec!["900 Lonely Rd", "5 Other Pl"]);

        for address in target {
            let appearances = records
                .iter()
                .filter(|record| record.target_address == address)
                .count();
            assert!(appearances >= 1, "{address} missing from output");
        }
    }

    #[test]
    fn enrich_prefers_target_side() {
        let mut records = match_addresses(&["1 Main St", "9 Far Rd"], &["1 MAIN STREET"]);
        let property_ids = HashMap::from([
            ("1 MAIN STREET".to_owned(), "P-100".to_owned()),
            ("1 Main St".to_owned(), "P-source".to_owned()),
            ("9 Far Rd".to_owned(), "P-900".to_owned()),
        ]);
        let tenants = HashMap::from([("1 MAIN STREET".to_owned(), "Acme Pets".to_owned())]);

        enrich(&mut records, &property_ids, &tenants);

        assert_eq!(records[0].property_id.as_deref(), Some("P-100"));
        assert_eq!(records[0].tenant.as_deref(), Some("Acme Pets"));
        assert_eq!(records[1].property_id.as_deref(), Some("P-900"));
        assert_eq!(records[1].tenant, None);
    }

    #[test]
    fn summary_counts_each_bucket() {
        let records = match_addresses(
            &["1 Main St", "404 Nowhere Ln"],
            &["1 Main Street", "77 Leftover Ct"],
        );
        let summary = summarize(&records);
        assert_eq!(
            summary,
            MatchSummary {
                exact: 1,
                fuzzy: 0,
                missing_source: 1,
                missing_target: 1,
            }
        );
    }
}
