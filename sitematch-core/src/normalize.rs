//! Canonical address form used for exact comparisons.
//!
//! The rewriting runs in a fixed order: upper-casing, highway idioms, ZIP removal, secondary-unit
//! extraction, token abbreviation, and punctuation stripping. Highway rules run before token
//! abbreviation so route numbers are not mistaken for house numbers. The trailing ZIP check runs
//! again last, and the highway rules run again after a unit is cut out.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Standard street-type abbreviation followed by the spellings that map onto it.
const STREET_TYPES: &[(&str, &[&str])] = &[
    ("ST", &["STREET", "STR", "STRT", "ST"]),
    ("AVE", &["AVENUE", "AV", "AVEN", "AVENU", "AVN", "AVNUE", "AVE"]),
    ("BLVD", &["BOULEVARD", "BOUL", "BOULV", "BLVD"]),
    ("RD", &["ROAD", "RD"]),
    ("DR", &["DRIVE", "DRIV", "DRV", "DR"]),
    ("LN", &["LANE", "LN"]),
    ("CT", &["COURT", "CRT", "CT"]),
    ("PL", &["PLACE", "PL"]),
    ("PKWY", &["PARKWAY", "PARKWY", "PKWAY", "PKY", "PKWY"]),
    ("HWY", &["HIGHWAY", "HIGHWY", "HIWAY", "HIWY", "HWAY", "HWY"]),
    ("CIR", &["CIRCLE", "CIRC", "CIRCL", "CRCL", "CIR"]),
    ("TER", &["TERRACE", "TERR", "TER"]),
    ("TRL", &["TRAIL", "TRAILS", "TRLS", "TRL"]),
    ("SQ", &["SQUARE", "SQR", "SQ"]),
    ("EXPY", &["EXPRESSWAY", "EXPRESS", "EXPW", "EXPY"]),
    ("FWY", &["FREEWAY", "FREEWY", "FRWAY", "FWY"]),
    ("CTR", &["CENTER", "CENTRE", "CNTR", "CTR"]),
    ("PLZ", &["PLAZA", "PLZA", "PLZ"]),
];

const DIRECTIONS: &[(&str, &str)] = &[
    ("NORTH", "N"),
    ("SOUTH", "S"),
    ("EAST", "E"),
    ("WEST", "W"),
    ("NORTHEAST", "NE"),
    ("NORTHWEST", "NW"),
    ("SOUTHEAST", "SE"),
    ("SOUTHWEST", "SW"),
];

static TOKEN_REWRITES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut rewrites = HashMap::new();
    for (abbreviation, variants) in STREET_TYPES {
        for variant in *variants {
            rewrites.insert(*variant, *abbreviation);
        }
    }
    for (word, abbreviation) in DIRECTIONS {
        rewrites.insert(*word, *abbreviation);
    }
    rewrites
});

// Words count as separate once `,` and `.` are stripped only if whitespace sits between them.
const SEPARATOR: &str = r"[.,]*\s[.,\s]*";

static US_HIGHWAY: LazyLock<Regex> = LazyLock::new(|| {
    let (sep, highway) = (SEPARATOR, spellings("HWY"));
    Regex::new(&format!(
        r"\b(OLD{sep})?U[.,\s]*S(?:OUTH)?{sep}(?:(?:{highway}){sep})?(\d+[A-Z]?)\b"
    ))
    .expect("valid US highway pattern")
});

// Prefix and route words include every spelling the token pass turns into `ST`, `RD` or `HWY`.
static STATE_HIGHWAY: LazyLock<Regex> = LazyLock::new(|| {
    let sep = SEPARATOR;
    let (street, road, highway) = (spellings("ST"), spellings("RD"), spellings("HWY"));
    Regex::new(&format!(
        r"\b(?:STATE|{street}){sep}(?:RTE|ROUTE|{road}|{highway}){sep}(\d+[A-Z]?)\b"
    ))
    .expect("valid state highway pattern")
});

static TRAILING_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[\s,]+\d{5}(?:-\d{4})?)+$").expect("valid ZIP pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SECONDARY_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:^|[\s,]+)(?:#\s*[A-Z0-9][A-Z0-9-]*",
        r"|(?:STE|SUITE|UNIT|APT|APARTMENT|ROOM|RM|BUILDING|BLDG|FLOOR|FL)",
        r"\b\.?\s*#?\s*[A-Z0-9][A-Z0-9-]*)",
    ))
    .expect("valid secondary unit pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Canonical address plus the secondary-unit fragment removed while producing it.
pub struct NormalizedAddress {
    /// Canonical form; equality of two canonical forms is an exact match.
    pub canonical: String,
    /// Removed unit designator such as `SUITE 200`, kept for display only.
    pub unit: Option<String>,
}

impl NormalizedAddress {
    /// Canonical form as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

/// Canonical form of `raw`. Never fails; unrecognized tokens pass through unchanged.
#[must_use]
pub fn normalize(raw: &str) -> String {
    normalize_detailed(raw).canonical
}

/// Canonical form of `raw` together with the removed secondary-unit fragment.
#[must_use]
pub fn normalize_detailed(raw: &str) -> NormalizedAddress {
    let upper_raw = raw.trim().to_uppercase();
    let upper = upper_raw.strip_suffix('.').unwrap_or(upper_raw.as_str());

    let with_highways = rewrite_highways(upper);
    let tidy = collapse_whitespace(&strip_trailing_zip(&with_highways));

    let (remainder, unit) = extract_unit(&tidy);
    let street = if unit.is_some() {
        rewrite_highways(&remainder)
    } else {
        remainder
    };

    let rewritten = street
        .split_whitespace()
        .map(rewrite_token)
        .collect::<Vec<_>>()
        .join(" ");

    let stripped: String = rewritten
        .chars()
        .filter(|ch| !matches!(ch, ',' | '.' | '#'))
        .collect();

    NormalizedAddress {
        canonical: strip_trailing_zip(&collapse_whitespace(stripped.trim())),
        unit,
    }
}

/// Alternation of every spelling the token pass rewrites to `abbreviation`.
fn spellings(abbreviation: &str) -> String {
    STREET_TYPES
        .iter()
        .find(|(standard, _)| *standard == abbreviation)
        .map_or_else(|| abbreviation.to_owned(), |(_, variants)| variants.join("|"))
}

fn strip_trailing_zip(text: &str) -> String {
    TRAILING_ZIP
        .replace(text, "")
        .trim_end_matches(|ch: char| ch == ',' || ch.is_whitespace())
        .to_owned()
}

fn rewrite_highways(address: &str) -> String {
    let us_rewritten = US_HIGHWAY.replace_all(address, "${1}US HWY $2");
    STATE_HIGHWAY
        .replace_all(&us_rewritten, "STATE HWY $1")
        .into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

fn extract_unit(address: &str) -> (String, Option<String>) {
    let fragments: Vec<&str> = SECONDARY_UNIT
        .find_iter(address)
        .map(|found| found.as_str().trim_start_matches(|ch: char| ch == ',' || ch.is_whitespace()))
        .collect();

    if fragments.is_empty() {
        return (address.to_owned(), None);
    }

    let street = SECONDARY_UNIT.replace_all(address, "").into_owned();
    (street, Some(fragments.join(" ")))
}

// Trailing `,`/`.` stay attached to the token so the final strip sees them.
fn rewrite_token(token: &str) -> String {
    let core = token.trim_end_matches(['.', ',']);
    let suffix = token.get(core.len()..).unwrap_or_default();

    match TOKEN_REWRITES.get(core) {
        Some(abbreviation) => format!("{abbreviation}{suffix}"),
        None => token.to_owned(),
    }
}
