//! Similarity score between two canonical addresses.
//!
//! The score blends token overlap (weight 0.7) with a character-bigram Dice coefficient
//! (weight 0.3). Token overlap counts the tokens of the first argument, so repeated tokens make the
//! score order-dependent: `similarity("MAIN MAIN ST", "MAIN ST X")` is `1.0` on the token side
//! while the reversed call is `2/3`.

use std::collections::{HashMap, HashSet};

const TOKEN_WEIGHT: f64 = 0.7;
const BIGRAM_WEIGHT: f64 = 0.3;

/// Similarity in `[0, 1]` between two already-normalized addresses.
#[must_use]
pub fn similarity(left: &str, right: &str) -> f64 {
    TOKEN_WEIGHT * token_overlap_ratio(left, right) + BIGRAM_WEIGHT * bigram_dice(left, right)
}

/// Share of `left` tokens that also occur in `right`, over the larger token count.
#[must_use]
pub fn token_overlap_ratio(left: &str, right: &str) -> f64 {
    let left_tokens: Vec<&str> = left.split_whitespace().collect();
    let right_tokens: HashSet<&str> = right.split_whitespace().collect();
    let right_count = right.split_whitespace().count();

    let denominator = left_tokens.len().max(right_count);
    if left_tokens.is_empty() || right_count == 0 {
        return 0.0;
    }

    let shared = left_tokens
        .iter()
        .filter(|token| right_tokens.contains(*token))
        .count();

    shared as f64 / denominator as f64
}

/// Dice coefficient over the character bigrams of both strings.
///
/// Bigrams are counted as multisets. Equal strings score `1.0`; strings shorter than two
/// characters score `0.0` against anything else.
#[must_use]
pub fn bigram_dice(left: &str, right: &str) -> f64 {
    if left == right {
        return 1.0;
    }

    let left_bigrams = bigrams(left);
    let right_bigrams = bigrams(right);
    if left_bigrams.is_empty() || right_bigrams.is_empty() {
        return 0.0;
    }

    let mut remaining: HashMap<(char, char), usize> = HashMap::new();
    for bigram in &left_bigrams {
        *remaining.entry(*bigram).or_default() += 1;
    }

    let mut shared = 0_usize;
    for bigram in &right_bigrams {
        if let Some(count) = remaining.get_mut(bigram)
            && *count > 0
        {
            *count -= 1;
            shared += 1;
        }
    }

    (2 * shared) as f64 / (left_bigrams.len() + right_bigrams.len()) as f64
}

fn bigrams(text: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(2)
        .filter_map(|pair| match pair {
            [first, second] => Some((*first, *second)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    #[test]
    fn identical_addresses_score_one() {
        assert!(close(similarity("123 MAIN ST", "123 MAIN ST"), 1.0));
    }

    #[test]
    fn disjoint_addresses_score_zero() {
        assert!(close(similarity("ABC", "XYZ"), 0.0));
    }

    #[test]
    fn empty_token_side_contributes_nothing() {
        assert!(close(token_overlap_ratio("", "123 MAIN ST"), 0.0));
        assert!(close(token_overlap_ratio("123 MAIN ST", ""), 0.0));
        assert!(close(similarity("", "123 MAIN ST"), 0.0));
    }

    #[test]
    fn short_strings_compare_by_equality() {
        assert!(close(bigram_dice("A", "A"), 1.0));
        assert!(close(bigram_dice("A", "B"), 0.0));
        assert!(close(bigram_dice("A", "AB"), 0.0));
    }

    #[test]
    fn blended_score_for_different_street_type() {
        // tokens 2/3; bigrams share 8 of 10 + 11
        let expected = 0.7 * (2.0 / 3.0) + 0.3 * (16.0 / 21.0);
        assert!(close(similarity("123 MAIN ST", "123 MAIN AVE"), expected));
        assert!(similarity("123 MAIN ST", "123 MAIN AVE") < 0.7);
    }

    #[test]
    fn repeated_bigrams_are_counted_once_per_occurrence() {
        // "AAA" has bigrams AA, AA; "AA" has one AA
        assert!(close(bigram_dice("AAA", "AA"), 2.0 / 3.0));
    }

    #[test]
    fn repeated_tokens_make_the_score_order_dependent() {
        assert!(close(token_overlap_ratio("MAIN MAIN ST", "MAIN ST X"), 1.0));
        assert!(close(token_overlap_ratio("MAIN ST X", "MAIN MAIN ST"), 2.0 / 3.0));
        assert!(close(
            bigram_dice("MAIN MAIN ST", "MAIN ST X"),
            bigram_dice("MAIN ST X", "MAIN MAIN ST")
        ));
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let pairs = [
            ("1 A ST", "1 A ST APT"),
            ("100 US HWY 1 N", "100 US HWY 1"),
            ("X", "X Y Z"),
        ];
        for (left, right) in pairs {
            let score = similarity(left, right);
            assert!((0.0..=1.0).contains(&score), "{left} vs {right}: {score}");
        }
    }
}
