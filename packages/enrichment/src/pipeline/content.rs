//! Content hygiene for retrieved pages.
//!
//! HTML to text, URL normalization, parked-page and blocked-platform
//! filters, and proportional trimming against the extraction budget.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::html::html_to_markdown;
use crate::types::retrieval::RetrievalResult;

/// Appended to a source whose text was cut to fit the budget.
pub const TRUNCATION_MARKER: &str = "[... content truncated ...]";

/// Phrases that mark a placeholder, for-sale or error page.
pub const PARKED_INDICATORS: &[&str] = &[
    "domain for sale",
    "this domain is for sale",
    "buy this domain",
    "domain may be for sale",
    "domain is parked",
    "parked domain",
    "parked free",
    "under construction",
    "coming soon",
    "404 not found",
    "page not found",
    "website coming soon",
    "godaddy",
    "sedoparking",
    "hugedomains",
];

/// Social networks: fine as content, never as attribution sources.
pub const BLOCKED_PLATFORMS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "youtube.com",
];

// =============================================================================
// HTML
// =============================================================================

static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").unwrap());

static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Reduce HTML to readable Markdown text with tidied whitespace.
pub fn strip_html(html: &str) -> String {
    let markdown = html_to_markdown(html);
    let text = RE_SPACES.replace_all(&markdown, " ");
    let text = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

// =============================================================================
// URLs
// =============================================================================

/// Canonical form used for deduplication and membership checks.
///
/// Lower-cases the host, drops `www.`, the fragment and a trailing slash.
/// Unparseable input falls back to a trimmed, lower-cased string.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed
                .host_str()
                .unwrap_or_default()
                .trim_start_matches("www.")
                .to_lowercase();
            let path = parsed.path().trim_end_matches('/');
            match parsed.query() {
                Some(query) => format!("{}{}?{}", host, path, query),
                None => format!("{}{}", host, path),
            }
        }
        Err(_) => raw
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("www.")
            .trim_end_matches('/')
            .to_lowercase(),
    }
}

/// Host of `raw` without `www.`, lower-cased.
pub fn host_of(raw: &str) -> Option<String> {
    url::Url::parse(raw.trim())
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
}

/// Whether `url` lives on a blocked social platform (or a subdomain of one).
pub fn is_blocked_platform(url: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    BLOCKED_PLATFORMS
        .iter()
        .any(|platform| host == *platform || host.ends_with(&format!(".{}", platform)))
}

// =============================================================================
// Filtering
// =============================================================================

/// Whether a page is a parked, placeholder or error page.
pub fn is_parked(title: &str, content: &str) -> bool {
    let title = title.to_lowercase();
    let content = content.to_lowercase();
    PARKED_INDICATORS
        .iter()
        .any(|indicator| title.contains(indicator) || content.contains(indicator))
}

/// Keep the first result per normalized URL.
pub fn dedupe_results(results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(normalize_url(&r.url)))
        .collect()
}

/// Dedupe, then drop parked pages and hits with no usable text.
pub fn clean_results(results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    dedupe_results(results)
        .into_iter()
        .filter(|r| {
            let parked = is_parked(&r.title, r.text());
            if parked {
                tracing::debug!(url = %r.url, "Dropping parked page");
            }
            !parked && !r.text().trim().is_empty()
        })
        .collect()
}

// =============================================================================
// Budget
// =============================================================================

/// Combine sources into one extraction document within `budget` characters.
///
/// Each source is introduced by a `## Source: <url>` header. When the full
/// text fits, nothing is cut. Otherwise every source keeps `floor`
/// characters plus a share of the remaining budget proportional to its
/// length, and cut sources end with [`TRUNCATION_MARKER`]. When the floors
/// alone exceed the budget, each source gets an equal `budget / n` share.
/// Headers are not counted against the budget.
pub fn trim_content(sources: &[RetrievalResult], budget: usize, floor: usize) -> String {
    let texts: Vec<&str> = sources.iter().map(|s| s.text().trim()).collect();
    let lengths: Vec<usize> = texts.iter().map(|t| t.chars().count()).collect();
    let total: usize = lengths.iter().sum();
    let n = sources.len();

    let allowances: Vec<usize> = if total <= budget || n == 0 {
        lengths.clone()
    } else if floor.saturating_mul(n) >= budget {
        vec![budget / n; n]
    } else {
        let spare = budget - floor * n;
        let excess_total: usize = lengths.iter().map(|l| l.saturating_sub(floor)).sum();
        lengths
            .iter()
            .map(|&len| {
                if len <= floor {
                    return len;
                }
                let excess = len - floor;
                let share = (spare as f64 * excess as f64 / excess_total.max(1) as f64) as usize;
                floor + share.min(excess)
            })
            .collect()
    };

    sources
        .iter()
        .zip(texts)
        .zip(lengths.iter().zip(&allowances))
        .map(|((source, text), (&len, &allowed))| {
            let mut section = format!("## Source: {}\n", source.url);
            if !source.title.is_empty() {
                section.push_str(&format!("Title: {}\n", source.title));
            }
            section.push('\n');
            if len > allowed {
                section.push_str(truncate_chars(text, allowed));
                section.push('\n');
                section.push_str(TRUNCATION_MARKER);
            } else {
                section.push_str(text);
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Longest prefix of `s` with at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
