//! Source attribution: every `sourceContext` entry must point at a page
//! actually retrieved for the row, with a snippet that provably contains
//! the value.
//!
//! Model-provided quotes are kept only when they contain the value and
//! occur in the cited page. Otherwise the snippet is rebuilt from the
//! page text around the first occurrence, or the entry is dropped.

use regex::Regex;
use std::collections::{HashMap, HashSet};

use super::content::{is_blocked_platform, normalize_url};
use crate::types::field::{format_number, FieldValue};
use crate::types::result::{EnrichmentResult, SourceContext};
use crate::types::retrieval::RetrievalResult;

/// Characters kept on each side of a fallback match.
pub const SNIPPET_RADIUS: usize = 200;

/// String values longer than this may match by word overlap.
pub const LONG_VALUE_CHARS: usize = 20;

/// Share of significant words a long value needs in the snippet.
pub const WORD_OVERLAP: f64 = 0.5;

/// Confidence multiplier for a value left with no verifiable source.
pub const UNSUPPORTED_PENALTY: f32 = 0.8;

/// Whether `snippet` supports `value`.
///
/// - numbers: any rendering ("1200", "1,200", "1.2k") between word boundaries
/// - strings: case-insensitive substring, or for long values at least half
///   of the significant (>3 char) words
/// - arrays: any item matches
/// - booleans: any non-empty snippet (the caller checks it occurs in the page)
pub fn value_matches(snippet: &str, value: &FieldValue) -> bool {
    match value {
        FieldValue::Number(n) => number_regex(*n).is_some_and(|re| re.is_match(snippet)),
        FieldValue::String(s) => string_matches(snippet, s),
        FieldValue::StringArray(items) => items.iter().any(|item| string_matches(snippet, item)),
        FieldValue::Boolean(_) => !snippet.trim().is_empty(),
    }
}

fn string_matches(snippet: &str, value: &str) -> bool {
    let snippet = collapse(snippet).to_lowercase();
    let value = collapse(value).to_lowercase();
    if value.is_empty() {
        return false;
    }
    if snippet.contains(&value) {
        return true;
    }
    if value.chars().count() <= LONG_VALUE_CHARS {
        return false;
    }

    let words = significant_words(&value);
    if words.is_empty() {
        return false;
    }
    let hits = words.iter().filter(|w| snippet.contains(w.as_str())).count();
    hits as f64 / words.len() as f64 >= WORD_OVERLAP
}

fn significant_words(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 3)
        .collect()
}

/// Renderings of `n` as it might appear in prose.
pub fn number_variants(n: f64) -> Vec<String> {
    let mut variants = vec![format_number(n)];
    if n.fract() == 0.0 && n.abs() >= 1_000.0 && n.abs() < 1e15 {
        variants.push(with_commas(n as i64));
    }
    for (scale, suffixes) in [
        (1e9, &["b", "bn", " billion"][..]),
        (1e6, &["m", "mm", " million"][..]),
        (1e3, &["k", " thousand"][..]),
    ] {
        if n.abs() >= scale {
            let scaled = format_number(n / scale);
            for suffix in suffixes {
                variants.push(format!("{}{}", scaled, suffix));
            }
        }
    }
    variants
}

fn with_commas(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

fn number_regex(n: f64) -> Option<Regex> {
    let alternatives = number_variants(n)
        .iter()
        .map(|v| regex::escape(v).replace(' ', r"\s*"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?i)(?:^|[^\w.,])(?:{})(?:$|[^\w.,]|[.,](?:\D|$))",
        alternatives
    ))
    .ok()
}

/// First occurrence of `value` in `text`, with up to [`SNIPPET_RADIUS`]
/// characters of context on each side, whitespace-collapsed.
///
/// Returns `None` when the value does not occur, and for booleans, which
/// have no textual form to search for.
pub fn find_occurrence(text: &str, value: &FieldValue) -> Option<String> {
    let (start, end) = match value {
        FieldValue::Number(n) => {
            let m = number_regex(*n)?.find(text)?;
            (m.start(), m.end())
        }
        FieldValue::String(s) => find_string(text, s)?,
        FieldValue::StringArray(items) => items
            .iter()
            .filter_map(|item| find_string(text, item))
            .min_by_key(|(start, _)| *start)?,
        FieldValue::Boolean(_) => return None,
    };

    let from = floor_char_boundary(text, start.saturating_sub(SNIPPET_RADIUS));
    let to = ceil_char_boundary(text, (end + SNIPPET_RADIUS).min(text.len()));
    let snippet = collapse(&text[from..to]);
    value_matches(&snippet, value).then_some(snippet)
}

fn find_string(text: &str, value: &str) -> Option<(usize, usize)> {
    let words: Vec<String> = value.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let exact = Regex::new(&format!("(?i){}", words.join(r"\s+"))).ok()?;
    if let Some(m) = exact.find(text) {
        return Some((m.start(), m.end()));
    }

    // Long values: anchor on the first significant word that occurs.
    if value.chars().count() <= LONG_VALUE_CHARS {
        return None;
    }
    significant_words(value).iter().find_map(|word| {
        let re = Regex::new(&format!("(?i){}", regex::escape(word))).ok()?;
        re.find(text).map(|m| (m.start(), m.end()))
    })
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate and repair the sources of `result` against `pages`.
///
/// Entries citing URLs that were not retrieved, or that live on a blocked
/// platform, are dropped. When no entry survives, the retrieved pages are
/// searched for the value directly. A value left with no source keeps its
/// place but has its confidence scaled by [`UNSUPPORTED_PENALTY`].
///
/// Returns the number of cited entries that were dropped.
pub fn attribute_sources(
    result: &mut EnrichmentResult,
    pages: &[RetrievalResult],
    max_sources: usize,
) -> usize {
    let by_url: HashMap<String, &RetrievalResult> = pages
        .iter()
        .filter(|p| !is_blocked_platform(&p.url))
        .map(|p| (normalize_url(&p.url), p))
        .collect();

    let cited = std::mem::take(&mut result.source_context);
    let cited_count = cited.len();
    let mut seen = HashSet::new();
    let mut sources: Vec<SourceContext> = Vec::new();

    for entry in cited {
        let key = normalize_url(&entry.url);
        let Some(page) = by_url.get(&key) else {
            tracing::debug!(
                field = %result.field,
                url = %entry.url,
                "Dropping source that was never retrieved"
            );
            continue;
        };
        if seen.contains(&key) {
            continue;
        }
        if let Some(snippet) = verify_snippet(&entry.snippet, page.text(), &result.value) {
            seen.insert(key);
            sources.push(SourceContext {
                url: page.url.clone(),
                snippet,
            });
        }
    }
    let dropped = cited_count.saturating_sub(sources.len());

    if sources.is_empty() {
        for page in pages.iter().filter(|p| !is_blocked_platform(&p.url)) {
            if sources.len() >= max_sources {
                break;
            }
            if !seen.insert(normalize_url(&page.url)) {
                continue;
            }
            if let Some(snippet) = find_occurrence(page.text(), &result.value) {
                sources.push(SourceContext {
                    url: page.url.clone(),
                    snippet,
                });
            }
        }
    }

    sources.truncate(max_sources);
    if sources.is_empty() {
        result.confidence *= UNSUPPORTED_PENALTY;
    }
    result.set_sources(sources);

    if let Some(corroboration) = result.corroboration.as_mut() {
        corroboration
            .evidence
            .retain(|e| by_url.contains_key(&normalize_url(&e.source_url)));
    }

    dropped
}

/// Keep the cited quote if it supports the value and occurs in the page;
/// otherwise rebuild a snippet from the page text.
fn verify_snippet(quote: &str, page_text: &str, value: &FieldValue) -> Option<String> {
    let quote = collapse(quote);
    if !quote.is_empty()
        && value_matches(&quote, value)
        && collapse(page_text).to_lowercase().contains(&quote.to_lowercase())
    {
        return Some(quote);
    }
    find_occurrence(page_text, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn page(url: &str, text: &str) -> RetrievalResult {
        RetrievalResult::new(url).with_markdown(text)
    }

    #[test]
    fn test_number_matching() {
        let value = FieldValue::Number(1200.0);
        assert!(value_matches("We have 1,200 employees", &value));
        assert!(value_matches("about 1200.", &value));
        assert!(value_matches("a team of 1.2k people", &value));
        assert!(!value_matches("founded 11200 years ago", &value));
        assert!(!value_matches("version 1200.5", &value));

        let value = FieldValue::Number(3_000_000.0);
        assert!(value_matches("revenue of $3M", &value));
        assert!(value_matches("3 million users", &value));
    }

    #[test]
    fn test_string_matching() {
        let value = FieldValue::String("Acme".into());
        assert!(value_matches("Welcome to ACME!", &value));
        assert!(!value_matches("Welcome to Globex", &value));

        let long = FieldValue::String("Rocket engines for small satellite launches".into());
        assert!(value_matches("We make engines for satellite launches.", &long));
        assert!(!value_matches("We make rockets.", &long));
    }

    #[test]
    fn test_number_variants() {
        let variants = number_variants(1_500_000.0);
        assert!(variants.contains(&"1500000".to_string()));
        assert!(variants.contains(&"1,500,000".to_string()));
        assert!(variants.contains(&"1.5m".to_string()));
        assert!(variants.contains(&"1500k".to_string()));
    }

    #[test]
    fn test_find_occurrence_window() {
        let text = format!("{} Acme has 250 employees. {}", "x ".repeat(300), "y ".repeat(300));
        let snippet = find_occurrence(&text, &FieldValue::Number(250.0)).unwrap();
        assert!(snippet.contains("250 employees"));
        assert!(snippet.len() <= 2 * SNIPPET_RADIUS + 20);
        assert!(find_occurrence(&text, &FieldValue::Number(999.0)).is_none());
    }

    #[test]
    fn test_hallucinated_url_is_dropped() {
        let pages = vec![page("https://acme.io/about", "Acme has 250 employees.")];
        let mut result = EnrichmentResult::new("employeeCount", FieldValue::Number(250.0), 0.8)
            .with_source("https://made-up.io/team", "250 employees");

        let dropped = attribute_sources(&mut result, &pages, 3);
        assert_eq!(dropped, 1);
        assert_eq!(result.source_urls(), vec!["https://acme.io/about"]);
        assert!(result.source_context[0].snippet.contains("250"));
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_bad_quote_is_replaced_from_page() {
        let pages = vec![page("https://acme.io", "Our team: 250 employees across 3 offices.")];
        let mut result = EnrichmentResult::new("employeeCount", FieldValue::Number(250.0), 0.8)
            .with_source("https://www.acme.io/", "a large team");

        attribute_sources(&mut result, &pages, 3);
        assert_eq!(result.source_context.len(), 1);
        assert_eq!(result.source_context[0].url, "https://acme.io");
        assert!(result.source_context[0].snippet.contains("250 employees"));
    }

    #[test]
    fn test_blocked_platform_never_attributed() {
        let pages = vec![page("https://www.linkedin.com/company/acme", "Acme 250 employees")];
        let mut result = EnrichmentResult::new("employeeCount", FieldValue::Number(250.0), 0.8)
            .with_source("https://www.linkedin.com/company/acme", "Acme 250 employees");

        attribute_sources(&mut result, &pages, 3);
        assert!(result.source_context.is_empty());
        assert!((result.confidence - 0.8 * UNSUPPORTED_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_boolean_quote_must_occur_in_page() {
        let pages = vec![page("https://acme.io", "Acme is hiring engineers.")];
        let mut result = EnrichmentResult::new("isHiring", FieldValue::Boolean(true), 0.7)
            .with_source("https://acme.io", "Acme is hiring engineers.")
            .with_source("https://acme.io/jobs", "We are hiring");

        attribute_sources(&mut result, &pages, 3);
        assert_eq!(result.source_urls(), vec!["https://acme.io"]);
    }

    #[test]
    fn test_sources_capped() {
        let pages: Vec<_> = (0..5)
            .map(|i| page(&format!("https://site{}.io", i), "Acme was founded in 2015."))
            .collect();
        let mut result = EnrichmentResult::new("foundedYear", FieldValue::Number(2015.0), 0.9);
        attribute_sources(&mut result, &pages, 3);
        assert_eq!(result.source_context.len(), 3);
        assert_eq!(result.source, "https://site0.io, https://site1.io, https://site2.io");
    }

    proptest! {
        #[test]
        fn prop_found_snippet_contains_value(
            words in prop::collection::vec("[a-z]{2,10}", 1..80),
            pick in any::<prop::sample::Index>(),
        ) {
            let text = words.join(" ");
            let value = FieldValue::String(pick.get(&words).clone());
            let snippet = find_occurrence(&text, &value);
            prop_assert!(snippet.is_some());
            let snippet = snippet.unwrap();
            prop_assert!(snippet.to_lowercase().contains(&value.display().to_lowercase()));
            prop_assert!(value_matches(&snippet, &value));
        }
    }
}
