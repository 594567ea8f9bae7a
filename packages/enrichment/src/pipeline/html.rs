//! HTML parsing over `scraper`, and HTML to Markdown via `htmd`.
//!
//! `scraper::Html` is not `Send`: parse, read what you need, and drop the
//! document before the next `.await`.

use htmd::HtmlToMarkdown;
use scraper::{Html, Selector};

/// Elements whose content never reaches extracted text.
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "noscript", "svg", "template"];

/// A parsed HTML document.
pub struct HtmlDocument {
    document: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Trimmed `<title>` text, entities decoded.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// First non-blank `content` attribute among elements matching `selector`.
    pub fn meta_content(&self, selector: &str) -> Option<String> {
        self.attr_values(selector, "content")
            .into_iter()
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }

    /// Values of `attr` on every element matching `selector`, in document order.
    pub fn attr_values(&self, selector: &str, attr: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect()
    }

    /// Every class token in the document, lower-cased.
    pub fn class_tokens(&self) -> Vec<String> {
        let Ok(selector) = Selector::parse("[class]") else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .flat_map(|el| el.value().classes())
            .map(str::to_lowercase)
            .collect()
    }
}

/// Convert HTML to Markdown, falling back to the document's plain text.
pub fn html_to_markdown(html: &str) -> String {
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build()
        .convert(html)
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Markdown conversion failed, using plain text");
            Html::parse_document(html)
                .root_element()
                .text()
                .collect::<String>()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_content_keeps_apostrophes() {
        let doc = HtmlDocument::parse(
            r#"<html><head><meta property="og:site_name" content="Joe's Pizza"></head></html>"#,
        );
        assert_eq!(
            doc.meta_content(r#"meta[property="og:site_name"]"#).as_deref(),
            Some("Joe's Pizza")
        );

        let doc = HtmlDocument::parse(r#"<meta content='Say "hi"' name="description">"#);
        assert_eq!(
            doc.meta_content(r#"meta[name="description"]"#).as_deref(),
            Some(r#"Say "hi""#)
        );
    }

    #[test]
    fn test_title_decodes_entities() {
        let doc = HtmlDocument::parse("<title>  Acme &amp; Co | Home </title>");
        assert_eq!(doc.title().as_deref(), Some("Acme & Co | Home"));
        assert_eq!(HtmlDocument::parse("<p>no title</p>").title(), None);
    }

    #[test]
    fn test_attr_values_and_classes() {
        let doc = HtmlDocument::parse(
            r#"<script src="/a.js"></script><script>inline()</script>
            <div class="Hero gatsby-image"><span class="w-nav"></span></div>"#,
        );
        assert_eq!(doc.attr_values("script[src]", "src"), vec!["/a.js".to_string()]);
        let classes = doc.class_tokens();
        assert!(classes.contains(&"hero".to_string()));
        assert!(classes.contains(&"gatsby-image".to_string()));
        assert!(classes.contains(&"w-nav".to_string()));
    }

    #[test]
    fn test_markdown_skips_scripts() {
        let md = html_to_markdown(
            "<html><head><title>T</title></head><body><h1>Acme</h1>\
             <script>var secret = 1;</script><p>Rockets.</p></body></html>",
        );
        assert!(md.contains("Acme"));
        assert!(md.contains("Rockets."));
        assert!(!md.contains("secret"));
    }
}
