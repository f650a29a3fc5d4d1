//! Weighted fuzzy string scoring on a 0-100 scale.
//!
//! The score blends a plain edit-distance ratio with token-order-insensitive and
//! substring-aware variants, so "jumbo bag red" still scores well against
//! "RED JUMBO BAG" and a short query scores well against a longer description it
//! is contained in.

use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

/// Length ratio at which partial (substring) scoring takes over.
const PARTIAL_LENGTH_RATIO: f64 = 1.5;
const LONG_PARTIAL_LENGTH_RATIO: f64 = 8.0;
const TOKEN_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.9;
const LONG_PARTIAL_SCALE: f64 = 0.6;

/// Best candidate for a query, together with its score.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuzzyMatch<'a> {
    pub candidate: &'a str,
    pub score: u8,
}

/// Lowercases, replaces anything that is not alphanumeric with a space and
/// collapses runs of whitespace.
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scores `query` against `candidate`. Both sides are normalized first; an empty
/// side scores zero.
pub fn weighted_ratio(query: &str, candidate: &str) -> u8 {
    let left = normalize(query);
    let right = normalize(candidate);
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let base = ratio(&left, &right);
    let left_len = left.chars().count() as f64;
    let right_len = right.chars().count() as f64;
    let length_ratio = left_len.max(right_len) / left_len.min(right_len);

    let token = token_sort_ratio(&left, &right).max(token_set_ratio(&left, &right));

    let best = if length_ratio < PARTIAL_LENGTH_RATIO {
        base.max(token * TOKEN_SCALE)
    } else {
        let scale =
            if length_ratio > LONG_PARTIAL_LENGTH_RATIO { LONG_PARTIAL_SCALE } else { PARTIAL_SCALE };
        let partial = partial_ratio(&left, &right) * scale;
        base.max(partial).max(token * TOKEN_SCALE * scale)
    };

    best.round().clamp(0.0, 100.0) as u8
}

/// Returns the highest scoring candidate. Earlier candidates win ties so the
/// result is stable for a given candidate order.
pub fn best_match<'a, I>(query: &str, candidates: I) -> Option<FuzzyMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<FuzzyMatch<'a>> = None;
    for candidate in candidates {
        let score = weighted_ratio(query, candidate);
        let better = match &best {
            Some(current) => score > current.score,
            None => true,
        };
        if better {
            best = Some(FuzzyMatch { candidate, score });
            if score == 100 {
                break;
            }
        }
    }
    best
}

fn ratio(left: &str, right: &str) -> f64 {
    (normalized_levenshtein(left, right) * 100.0).round()
}

fn token_sort_ratio(left: &str, right: &str) -> f64 {
    ratio(&sorted_tokens(left).join(" "), &sorted_tokens(right).join(" "))
}

fn token_set_ratio(left: &str, right: &str) -> f64 {
    let left_tokens: BTreeSet<&str> = left.split(' ').collect();
    let right_tokens: BTreeSet<&str> = right.split(' ').collect();

    let intersection = left_tokens.intersection(&right_tokens).copied().collect::<Vec<_>>().join(" ");
    let left_rest = left_tokens.difference(&right_tokens).copied().collect::<Vec<_>>().join(" ");
    let right_rest = right_tokens.difference(&left_tokens).copied().collect::<Vec<_>>().join(" ");

    let combined_left = join_non_empty(&intersection, &left_rest);
    let combined_right = join_non_empty(&intersection, &right_rest);

    let mut scores = vec![ratio(&combined_left, &combined_right)];
    if !intersection.is_empty() {
        scores.push(ratio(&intersection, &combined_left));
        scores.push(ratio(&intersection, &combined_right));
    }
    scores.into_iter().fold(0.0, f64::max)
}

fn partial_ratio(left: &str, right: &str) -> f64 {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();
    let (shorter, longer) = if left_chars.len() <= right_chars.len() {
        (left_chars, right_chars)
    } else {
        (right_chars, left_chars)
    };

    let needle: String = shorter.iter().collect();
    let mut best = 0.0_f64;
    for window in longer.windows(shorter.len()) {
        let haystack: String = window.iter().collect();
        best = best.max(ratio(&needle, &haystack));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn sorted_tokens(value: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = value.split(' ').filter(|token| !token.is_empty()).collect();
    tokens.sort_unstable();
    tokens
}

fn join_non_empty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_owned(),
        (_, true) => head.to_owned(),
        _ => format!("{head} {tail}"),
    }
}
