//! Keyword relevance scoring of pattern descriptors against a free-text query.

use crate::patterns::PatternDescriptor;
use std::collections::{BTreeMap, HashSet};

const NAME_HIT: f64 = 10.0;
const NAME_WORD_BOUNDARY_BONUS: f64 = 5.0;
const DESCRIPTION_HIT: f64 = 5.0;
const TAG_HIT: f64 = 3.0;
const TAG_EXACT_BONUS: f64 = 2.0;
const EXTRACT_HIT: f64 = 2.0;

const WORD_MIN_CHARS: usize = 4;
const WORD_NAME_HIT: f64 = 2.0;
const WORD_DESCRIPTION_HIT: f64 = 1.0;
const WORD_ANY_TAG_HIT: f64 = 1.0;
const WORD_EXTRACT_HIT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub descriptor: &'a PatternDescriptor,
    pub score: f64,
}

/// Score of one descriptor. `query` must already be lowercased.
pub fn score_pattern(query: &str, descriptor: &PatternDescriptor, extract: Option<&str>) -> f64 {
    let name = descriptor.pattern_name.to_lowercase();
    let description = descriptor.description.to_lowercase();
    let tags: Vec<String> = descriptor.tags.iter().map(|tag| tag.to_lowercase()).collect();
    let extract = extract.map(str::to_lowercase).unwrap_or_default();

    let mut score = 0.0;
    if name.contains(query) {
        score += NAME_HIT;
        if query == name || format!(" {name} ").contains(&format!(" {query} ")) {
            score += NAME_WORD_BOUNDARY_BONUS;
        }
    }
    if description.contains(query) {
        score += DESCRIPTION_HIT;
    }
    for tag in &tags {
        if tag.contains(query) {
            score += TAG_HIT;
            if tag == query {
                score += TAG_EXACT_BONUS;
            }
        }
    }
    if !extract.is_empty() && extract.contains(query) {
        score += EXTRACT_HIT;
    }

    let mut seen = HashSet::new();
    for word in query.split_whitespace() {
        if !seen.insert(word) || word.chars().count() < WORD_MIN_CHARS {
            continue;
        }
        if name.contains(word) {
            score += WORD_NAME_HIT;
        }
        if description.contains(word) {
            score += WORD_DESCRIPTION_HIT;
        }
        if tags.iter().any(|tag| tag.contains(word)) {
            score += WORD_ANY_TAG_HIT;
        }
        if !extract.is_empty() && extract.contains(word) {
            score += WORD_EXTRACT_HIT;
        }
    }
    score
}

/// Extract keyed by `name`, falling back to a case-insensitive match.
fn extract_for<'e>(extracts: &'e BTreeMap<String, String>, name: &str) -> Option<&'e str> {
    extracts
        .get(name)
        .or_else(|| {
            extracts
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, extract)| extract)
        })
        .map(String::as_str)
}

/// Non-zero scores in descending order; equal scores keep catalog order.
pub fn rank_patterns<'a>(
    query: &str,
    catalog: &'a [PatternDescriptor],
    extracts: Option<&BTreeMap<String, String>>,
) -> Vec<MatchResult<'a>> {
    if query.is_empty() || catalog.is_empty() {
        return Vec::new();
    }
    let query = query.to_lowercase();

    let mut results: Vec<MatchResult<'a>> = catalog
        .iter()
        .map(|descriptor| {
            let extract =
                extracts.and_then(|extracts| extract_for(extracts, &descriptor.pattern_name));
            MatchResult {
                descriptor,
                score: score_pattern(&query, descriptor, extract),
            }
        })
        .filter(|result| result.score > 0.0)
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

pub fn match_patterns<'a>(
    query: &str,
    catalog: &'a [PatternDescriptor],
    extracts: Option<&BTreeMap<String, String>>,
) -> Vec<&'a PatternDescriptor> {
    rank_patterns(query, catalog, extracts)
        .into_iter()
        .map(|result| result.descriptor)
        .collect()
}
