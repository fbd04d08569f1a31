//! Business-name hint rules.
//!
//! A [`HintBook`] is an ordered rule list evaluated top to bottom; the first rule whose matcher
//! accepts the business name supplies the hints. The default book lists curated business names
//! before the generic category patterns.

use regex::Regex;
use tracing::debug;

/// Curated business names (lower-case substrings) and their hint phrases.
const BUSINESS_HINTS: &[(&str, &[&str])] = &[
    ("petsmart", &["pet store", "pet supplies"]),
    ("petco", &["pet store", "pet supplies"]),
    ("walgreens", &["pharmacy", "drugstore"]),
    ("cvs", &["pharmacy", "drugstore"]),
    ("rite aid", &["pharmacy", "drugstore"]),
    ("starbucks", &["coffee shop", "cafe"]),
    ("dunkin", &["coffee shop", "donut shop"]),
    ("mcdonald", &["fast food restaurant"]),
    ("burger king", &["fast food restaurant"]),
    ("home depot", &["home improvement store", "hardware store"]),
    ("lowe's", &["home improvement store", "hardware store"]),
    ("walmart", &["supercenter", "department store"]),
    ("target", &["department store"]),
    ("kroger", &["grocery store", "supermarket"]),
    ("safeway", &["grocery store", "supermarket"]),
    ("whole foods", &["grocery store", "supermarket"]),
    ("dollar general", &["discount store"]),
    ("dollar tree", &["discount store"]),
    ("autozone", &["auto parts store"]),
    ("o'reilly", &["auto parts store"]),
    ("chase", &["bank"]),
    ("wells fargo", &["bank"]),
    ("bank of america", &["bank"]),
    ("marriott", &["hotel"]),
    ("hilton", &["hotel"]),
    ("holiday inn", &["hotel"]),
    ("shell", &["gas station"]),
    ("exxon", &["gas station"]),
    ("chevron", &["gas station"]),
    ("planet fitness", &["gym", "fitness center"]),
    ("ups store", &["shipping store"]),
    ("fedex", &["shipping store"]),
];

/// Generic category patterns consulted when no curated name matched.
const CATEGORY_HINTS: &[(&str, &[&str])] = &[
    (r"(?i)\b(restaurant|grill|diner|bistro|kitchen|eatery|pizza)\b", &["restaurant"]),
    (r"(?i)\b(store|shop|mart|outlet|boutique)\b", &["store", "retail store"]),
    (r"(?i)\b(hotel|motel|inn|suites|lodge)\b", &["hotel"]),
    (r"(?i)\b(bank|credit union|savings)\b", &["bank"]),
    (r"(?i)\b(gas|fuel|petroleum|station)\b", &["gas station"]),
    (r"(?i)\b(pharmacy|drug|drugs|rx)\b", &["pharmacy"]),
    (r"(?i)\b(grocery|groceries|market|supermarket|foods)\b", &["grocery store", "supermarket"]),
];

#[derive(Debug, Clone)]
/// Test applied to a business name.
pub enum HintMatcher {
    /// Case-insensitive substring; stored lower-case.
    Contains(String),
    /// Regular expression.
    Pattern(Regex),
}

impl HintMatcher {
    fn accepts(&self, business_name: &str) -> bool {
        match self {
            HintMatcher::Contains(needle) => business_name.to_lowercase().contains(needle.as_str()),
            HintMatcher::Pattern(pattern) => pattern.is_match(business_name),
        }
    }
}

#[derive(Debug, Clone)]
/// One rule: a matcher and the hints it yields, in retry order.
pub struct HintRule {
    /// Test applied to the business name.
    pub matcher: HintMatcher,
    /// Hint phrases prepended to the address, tried in order.
    pub hints: Vec<String>,
}

impl HintRule {
    /// Rule matching a case-insensitive substring.
    #[must_use]
    pub fn contains(needle: &str, hints: &[&str]) -> Self {
        Self {
            matcher: HintMatcher::Contains(needle.to_lowercase()),
            hints: hints.iter().map(|hint| (*hint).to_owned()).collect(),
        }
    }

    /// Rule matching a regular expression.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for an invalid pattern.
    pub fn pattern(pattern: &str, hints: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: HintMatcher::Pattern(Regex::new(pattern)?),
            hints: hints.iter().map(|hint| (*hint).to_owned()).collect(),
        })
    }
}

#[derive(Debug, Clone)]
/// Ordered hint rules; the first accepting rule wins.
pub struct HintBook {
    rules: Vec<HintRule>,
}

impl Default for HintBook {
    fn default() -> Self {
        let curated = BUSINESS_HINTS
            .iter()
            .map(|(needle, hints)| HintRule::contains(needle, hints));
        let categories = CATEGORY_HINTS.iter().filter_map(|(pattern, hints)| {
            HintRule::pattern(pattern, hints).ok()
        });
        Self::new(curated.chain(categories).collect())
    }
}

impl HintBook {
    /// Book with exactly these rules, in this order.
    #[must_use]
    pub fn new(rules: Vec<HintRule>) -> Self {
        Self { rules }
    }

    /// Book without any rules.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[HintRule] {
        &self.rules
    }

    /// Hints for a business name, in retry order. Blank names yield nothing.
    #[must_use]
    pub fn hints_for(&self, business_name: &str) -> Vec<String> {
        let name = business_name.trim();
        if name.is_empty() {
            return Vec::new();
        }

        let hints = self
            .rules
            .iter()
            .find(|rule| rule.matcher.accepts(name))
            .map(|rule| rule.hints.clone())
            .unwrap_or_default();

        debug!(business = name, hints = ?hints, "business hints resolved");
        hints
    }
}
