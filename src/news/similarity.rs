//! Headline similarity used to drop near-duplicate stories.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// ASCII word characters, whitespace and Hangul syllables survive; everything else is punctuation.
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z_\s가-힣]").expect("punctuation pattern is valid"));

fn word_set(text: &str) -> HashSet<String> {
    PUNCTUATION
        .replace_all(text, "")
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard index of the two headlines' normalized word sets, in `[0, 1]`.
///
/// Two headlines without any words score 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = word_set(a);
    let b = word_set(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    intersection as f64 / union as f64
}

/// Whether `candidate` tells the same story as `existing`: word overlap above
/// `threshold`, or one headline contained in the other (truncated and
/// expanded variants of a headline overlap poorly on words).
pub fn is_near_duplicate(existing: &str, candidate: &str, threshold: f64) -> bool {
    let existing_lower = existing.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    existing_lower.contains(&candidate_lower)
        || candidate_lower.contains(&existing_lower)
        || similarity(existing, candidate) > threshold
}
