use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read an address list: one address per line, blank lines dropped.
pub(crate) fn read_addresses(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read address list {}", path.display()))?;
    Ok(parse_addresses(&text))
}

/// Read a side map of `address<TAB>value` lines keyed by the original address.
pub(crate) fn read_side_map(path: &Path) -> Result<HashMap<String, String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read side map {}", path.display()))?;
    Ok(parse_side_map(&text))
}

pub(crate) fn parse_addresses(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

// Lines without a tab or with an empty side are skipped.
pub(crate) fn parse_side_map(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(address, value)| (address.trim(), value.trim()))
        .filter(|(address, value)| !address.is_empty() && !value.is_empty())
        .map(|(address, value)| (address.to_owned(), value.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_dropped() {
        let text = "123 Main St\n\n   \n 9 Elm Rd \r\n";
        assert_eq!(parse_addresses(text), vec!["123 Main St", "9 Elm Rd"]);
    }

    #[test]
    fn side_map_needs_both_columns() {
        let text =
            "1 Main St\tAcme Pets\nno tab here\n\tOrphan\n2 Oak Ave\t\n3 Pine Rd\t  PetSmart ";
        let map = parse_side_map(text);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("1 Main St").map(String::as_str), Some("Acme Pets"));
        assert_eq!(map.get("3 Pine Rd").map(String::as_str), Some("PetSmart"));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = read_addresses(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
