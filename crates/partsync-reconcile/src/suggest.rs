//! Near-miss suggestions for records that stayed unmatched.
//!
//! Suggestions only end up in the run report. Nothing here links records.

use std::collections::HashSet;
use std::sync::LazyLock;

use partsync_core::{normalize_name, slugify};
use regex::Regex;
use serde::Serialize;

use crate::action::Tier;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid regex"));

/// Minimum normalized similarity for a candidate to be suggested.
pub const MIN_SIMILARITY: f64 = 0.8;

/// Most candidates listed per unmatched record.
pub const MAX_CANDIDATES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub tier: Tier,
    /// The unmatched source name.
    pub source: String,
    /// Catalog entities as `name [slug]`, best first.
    pub candidates: Vec<String>,
}

/// `1 - distance / longest`, on characters. Identical strings score 1.0.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

fn tokens(slug: &str) -> HashSet<&str> {
    TOKEN_RE.find_iter(slug).map(|m| m.as_str()).collect()
}

/// Up to [`MAX_CANDIDATES`] catalog entries that look like `source`.
///
/// `candidates` yields `(name, slug)` pairs. A candidate qualifies when its
/// normalized name scores at least [`MIN_SIMILARITY`] against the source
/// name, or when its slug tokens include every token of the source slug.
#[must_use]
pub fn suggest<'a, I>(source: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let source_name = normalize_name(source);
    let source_slug = slugify(source);
    let source_tokens = tokens(&source_slug);

    let mut scored: Vec<(f64, String)> = candidates
        .into_iter()
        .filter_map(|(name, slug)| {
            let score = similarity(&source_name, &normalize_name(name));
            let contains = !source_tokens.is_empty() && source_tokens.is_subset(&tokens(slug));
            (score >= MIN_SIMILARITY || contains).then(|| (score, format!("{name} [{slug}]")))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(MAX_CANDIDATES).map(|(_, label)| label).collect()
}
