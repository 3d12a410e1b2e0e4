//! Slug and name normalization.
//!
//! Every stage of the pipeline keys records on the output of these helpers,
//! so source records, catalog indices, and the alias table must all agree on
//! them.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turns a free-text name into a lowercase, ASCII, hyphen-separated slug.
///
/// Accents are decomposed and dropped (`CITROËN` → `citroen`), `&` reads as
/// "and", and every run of other non-alphanumeric characters collapses into a
/// single hyphen. Never starts or ends with a hyphen.
///
/// Returns an empty string for empty or whitespace-only input; callers treat
/// that as "unslugifiable" and skip the record.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    let chars = input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !is_combining_mark(*c));

    for c in chars {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else if c == '&' {
            if !out.is_empty() {
                out.push('-');
            }
            out.push_str("and");
            pending_hyphen = true;
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// Key for case-insensitive exact name matching: trimmed, inner whitespace
/// collapsed, lowercased.
#[must_use]
pub fn normalize_name(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Removes a leading brand name from a model name.
///
/// Handles both the plain and the hyphenated spelling of multi-word brands,
/// so `"ALFA-ROMEO GIULIA"` and `"Alfa Romeo Giulia"` both become `"GIULIA"`
/// / `"Giulia"` under brand `"Alfa Romeo"`. A name that is nothing but the
/// brand is returned unchanged.
#[must_use]
pub fn strip_brand_prefix<'a>(model_name: &'a str, brand_name: &str) -> &'a str {
    let trimmed = model_name.trim();
    let brand = brand_name.trim();
    if brand.is_empty() {
        return trimmed;
    }

    let hyphenated = brand.split_whitespace().collect::<Vec<_>>().join("-");
    for prefix in [brand.to_string(), hyphenated] {
        let Some(head) = trimmed.get(..prefix.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(&prefix) {
            continue;
        }
        let rest = &trimmed[prefix.len()..];
        if rest.starts_with(char::is_whitespace) {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    trimmed
}

/// Identity key of a product: `(ref, model, position)`.
///
/// References compare case-insensitively; an absent relation is `-`.
#[must_use]
pub fn product_key(reference: &str, model_id: Option<i64>, position_id: Option<i64>) -> String {
    let fmt = |id: Option<i64>| id.map_or_else(|| "-".to_string(), |v| v.to_string());
    format!(
        "{}|{}|{}",
        reference.trim().to_uppercase(),
        fmt(model_id),
        fmt(position_id)
    )
}
