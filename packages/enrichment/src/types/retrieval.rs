//! Ephemeral content produced by a `RetrievalGateway`. Never persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One search hit, optionally with scraped page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub url: String,
    pub title: String,
    pub description: String,
    pub markdown: Option<String>,
    pub html: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl RetrievalResult {
    /// Create a result with just a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            description: String::new(),
            markdown: None,
            html: None,
            metadata: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Best available text: markdown, then description.
    pub fn text(&self) -> &str {
        match self.markdown.as_deref() {
            Some(md) if !md.trim().is_empty() => md,
            _ => &self.description,
        }
    }
}

/// Options for `RetrievalGateway::search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum hits to return
    pub limit: usize,

    /// Ask the gateway to scrape each hit's page content
    pub scrape_content: bool,
}

impl SearchOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            scrape_content: true,
        }
    }

    pub fn without_content(mut self) -> Self {
        self.scrape_content = false;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Result of a direct fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub title: Option<String>,
}

impl ScrapedPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            markdown: None,
            html: None,
            title: None,
        }
    }

    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Readable text: markdown when present, otherwise tag-stripped HTML.
    pub fn text(&self) -> String {
        match (&self.markdown, &self.html) {
            (Some(md), _) if !md.trim().is_empty() => md.clone(),
            (_, Some(html)) => crate::pipeline::content::strip_html(html),
            _ => String::new(),
        }
    }

    /// View this page as a retrieval result so it can join search hits.
    pub fn into_retrieval_result(self) -> RetrievalResult {
        let markdown = Some(self.text());
        RetrievalResult {
            url: self.url,
            title: self.title.unwrap_or_default(),
            description: String::new(),
            markdown,
            html: self.html,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prefers_markdown() {
        let hit = RetrievalResult::new("https://acme.io")
            .with_description("Acme, the rocket company")
            .with_markdown("# Acme\n\nWe build rockets.");
        assert!(hit.text().starts_with("# Acme"));

        let bare = RetrievalResult::new("https://acme.io").with_description("Snippet only");
        assert_eq!(bare.text(), "Snippet only");
    }

    #[test]
    fn test_scraped_page_falls_back_to_html() {
        let page = ScrapedPage::new("https://acme.io")
            .with_html("<html><body><h1>Acme</h1><p>We build rockets.</p></body></html>");
        let text = page.text();
        assert!(text.contains("Acme"));
        assert!(text.contains("We build rockets."));
        assert!(!text.contains("<h1>"));
    }
}
