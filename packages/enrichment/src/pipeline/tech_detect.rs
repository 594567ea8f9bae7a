//! Heuristic technology detection from raw homepage HTML.
//!
//! Runs before any LLM call; its findings are passed to extraction as
//! trusted facts.

use std::collections::BTreeSet;

use super::html::HtmlDocument;

/// Where in the HTML a signature looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Substring of a `<script src>` / `<link href>` URL
    ScriptSrc,
    /// Substring of `<meta name="generator">`
    Generator,
    /// Substring anywhere in the markup
    Markup,
    /// Prefix of a `class` token
    CssPrefix,
}

/// One detection rule.
#[derive(Debug)]
pub struct TechSignature {
    pub technology: &'static str,
    pub kind: SignatureKind,
    pub pattern: &'static str,
}

const fn sig(
    technology: &'static str,
    kind: SignatureKind,
    pattern: &'static str,
) -> TechSignature {
    TechSignature {
        technology,
        kind,
        pattern,
    }
}

use SignatureKind::*;

pub const TECH_SIGNATURES: &[TechSignature] = &[
    // Frameworks
    sig("Next.js", Markup, "__NEXT_DATA__"),
    sig("Next.js", ScriptSrc, "/_next/"),
    sig("React", Markup, "data-reactroot"),
    sig("React", ScriptSrc, "react.production"),
    sig("React", ScriptSrc, "react-dom"),
    sig("Nuxt", Markup, "__NUXT__"),
    sig("Nuxt", ScriptSrc, "/_nuxt/"),
    sig("Vue.js", Markup, "data-v-"),
    sig("Vue.js", ScriptSrc, "vue.min.js"),
    sig("Vue.js", ScriptSrc, "vue.global"),
    sig("Angular", Markup, "ng-version"),
    sig("Angular", Markup, "ng-app"),
    sig("Gatsby", Markup, "___gatsby"),
    sig("Gatsby", CssPrefix, "gatsby-"),
    sig("Svelte", CssPrefix, "svelte-"),
    sig("jQuery", ScriptSrc, "jquery"),
    sig("Bootstrap", ScriptSrc, "bootstrap"),
    sig("Tailwind CSS", ScriptSrc, "tailwind"),
    // CMS and site builders
    sig("WordPress", Generator, "wordpress"),
    sig("WordPress", ScriptSrc, "/wp-content/"),
    sig("Shopify", ScriptSrc, "cdn.shopify.com"),
    sig("Wix", Generator, "wix.com"),
    sig("Wix", ScriptSrc, "static.parastorage.com"),
    sig("Squarespace", ScriptSrc, "squarespace.com"),
    sig("Webflow", Generator, "webflow"),
    sig("Webflow", CssPrefix, "w-nav"),
    sig("Drupal", Generator, "drupal"),
    sig("Ghost", Generator, "ghost"),
    sig("Hugo", Generator, "hugo"),
    sig("Framer", Generator, "framer"),
    // Marketing, analytics and payments
    sig("HubSpot", ScriptSrc, "js.hs-scripts.com"),
    sig("HubSpot", ScriptSrc, "hubspot"),
    sig("Google Analytics", ScriptSrc, "google-analytics.com"),
    sig("Google Analytics", ScriptSrc, "gtag/js"),
    sig("Google Tag Manager", ScriptSrc, "googletagmanager.com/gtm.js"),
    sig("Segment", ScriptSrc, "cdn.segment.com"),
    sig("Intercom", ScriptSrc, "widget.intercom.io"),
    sig("Stripe", ScriptSrc, "js.stripe.com"),
    sig("Hotjar", ScriptSrc, "static.hotjar.com"),
    sig("Cloudflare", ScriptSrc, "cdnjs.cloudflare.com"),
    sig("Vercel", ScriptSrc, "/_vercel/"),
];

/// Terms too generic to be useful in a technology list.
pub const GENERIC_TECH_TERMS: &[&str] = &[
    "software",
    "platform",
    "technology",
    "technologies",
    "tech",
    "cloud",
    "saas",
    "web",
    "website",
    "internet",
    "online",
    "digital",
    "app",
    "apps",
    "application",
    "applications",
    "mobile",
    "data",
    "api",
    "apis",
    "it",
    "ai",
    "tools",
    "other",
];

/// Technologies evidenced by `html`, sorted and deduplicated.
pub fn detect_technologies(html: &str) -> BTreeSet<String> {
    let doc = HtmlDocument::parse(html);
    let lower = |values: Vec<String>| -> Vec<String> {
        values.into_iter().map(|v| v.to_lowercase()).collect()
    };
    let mut script_srcs = lower(doc.attr_values("script[src]", "src"));
    script_srcs.extend(lower(doc.attr_values("link[href]", "href")));
    let generators = lower(doc.attr_values(r#"meta[name="generator"]"#, "content"));
    let class_tokens = doc.class_tokens();

    TECH_SIGNATURES
        .iter()
        .filter(|sig| match sig.kind {
            ScriptSrc => script_srcs.iter().any(|src| src.contains(sig.pattern)),
            Generator => generators.iter().any(|g| g.contains(sig.pattern)),
            Markup => html.contains(sig.pattern),
            CssPrefix => class_tokens.iter().any(|t| t.starts_with(sig.pattern)),
        })
        .map(|sig| sig.technology.to_string())
        .collect()
}

pub fn is_generic_tech_term(term: &str) -> bool {
    GENERIC_TECH_TERMS.contains(&term.trim().to_lowercase().as_str())
}

/// Drop generic terms from a technology list.
pub fn filter_generic_terms(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| !item.trim().is_empty() && !is_generic_tech_term(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_next_and_analytics() {
        let html = r#"<html><head>
            <script src="https://www.googletagmanager.com/gtm.js?id=GTM-1"></script>
            <script src="/_next/static/chunks/main.js"></script>
            </head><body><div id="__next"></div>
            <script id="__NEXT_DATA__" type="application/json">{}</script>
            <script src="https://js.stripe.com/v3"></script></body></html>"#;
        let detected = detect_technologies(html);
        assert!(detected.contains("Next.js"));
        assert!(detected.contains("Google Tag Manager"));
        assert!(detected.contains("Stripe"));
        assert!(!detected.contains("WordPress"));
    }

    #[test]
    fn test_generator_meta_either_order() {
        let a = r#"<meta name="generator" content="WordPress 6.4">"#;
        let b = r#"<meta content="Webflow" name="generator">"#;
        assert!(detect_technologies(a).contains("WordPress"));
        assert!(detect_technologies(b).contains("Webflow"));
    }

    #[test]
    fn test_css_prefix_and_angular_markup() {
        let html = r#"<div class="layout Gatsby-image-wrapper"></div>
            <app-root ng-version="17.0.0"></app-root>"#;
        let detected = detect_technologies(html);
        assert!(detected.contains("Gatsby"));
        assert!(detected.contains("Angular"));
    }

    #[test]
    fn test_plain_page_detects_nothing() {
        assert!(detect_technologies("<html><body><p>Hello</p></body></html>").is_empty());
    }

    #[test]
    fn test_filter_generic_terms() {
        let items = vec!["React".into(), "Software".into(), " cloud ".into(), "Rust".into()];
        assert_eq!(filter_generic_terms(items), vec!["React".to_string(), "Rust".to_string()]);
    }
}
