//! Skip list: emails and domains that must never be researched.
//!
//! The file format and its loading belong to the application. This module
//! only defines the predicate and two in-memory holders: one built up
//! front, one populated once on first use and read-only afterwards.

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::OnceCell;

/// Predicate checked before any retrieval for a row.
#[async_trait]
pub trait SkipList: Send + Sync {
    /// Whether the row for `email` must be skipped.
    async fn should_skip(&self, email: &str) -> bool;

    /// Human-readable reason, used as the row's error text.
    async fn reason(&self, email: &str) -> String {
        format!("{} is on the skip list", email)
    }
}

/// Immutable set of skipped addresses and domains.
///
/// Matching is case-insensitive. A domain entry matches every address at
/// that domain.
#[derive(Debug, Clone, Default)]
pub struct MemorySkipList {
    emails: HashSet<String>,
    domains: HashSet<String>,
}

impl MemorySkipList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from mixed entries: anything containing `@` is an address,
    /// everything else a domain. Blank entries are ignored.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .fold(Self::new(), |list, entry| {
                let entry = entry.as_ref().trim();
                if entry.is_empty() {
                    list
                } else if entry.contains('@') {
                    list.with_email(entry)
                } else {
                    list.with_domain(entry)
                }
            })
    }

    pub fn with_email(mut self, email: impl AsRef<str>) -> Self {
        self.emails.insert(email.as_ref().trim().to_lowercase());
        self
    }

    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        let domain = domain.as_ref().trim().trim_start_matches('@').to_lowercase();
        self.domains.insert(domain);
        self
    }

    pub fn len(&self) -> usize {
        self.emails.len() + self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matched(&self, email: &str) -> Option<String> {
        let email = email.trim().to_lowercase();
        if self.emails.contains(&email) {
            return Some(format!("email {} is on the skip list", email));
        }
        let domain = email.rsplit_once('@').map(|(_, d)| d)?;
        self.domains
            .contains(domain)
            .then(|| format!("domain {} is on the skip list", domain))
    }
}

#[async_trait]
impl SkipList for MemorySkipList {
    async fn should_skip(&self, email: &str) -> bool {
        self.matched(email).is_some()
    }

    async fn reason(&self, email: &str) -> String {
        self.matched(email)
            .unwrap_or_else(|| format!("{} is on the skip list", email))
    }
}

type Loader =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = MemorySkipList> + Send>> + Send + Sync>;

/// Skip list populated on first use, then read-only.
///
/// Concurrent first callers wait on a single load.
pub struct LazySkipList {
    cell: OnceCell<MemorySkipList>,
    loader: Loader,
}

impl LazySkipList {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MemorySkipList> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(move || Box::pin(loader())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    async fn list(&self) -> &MemorySkipList {
        self.cell
            .get_or_init(|| async {
                let list = (self.loader)().await;
                tracing::debug!(entries = list.len(), "Skip list loaded");
                list
            })
            .await
    }
}

#[async_trait]
impl SkipList for LazySkipList {
    async fn should_skip(&self, email: &str) -> bool {
        self.list().await.should_skip(email).await
    }

    async fn reason(&self, email: &str) -> String {
        self.list().await.reason(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_skip_list_matches_email_and_domain() {
        let list = MemorySkipList::from_entries(["Boss@Acme.io", "gmail.com", "  "]);
        assert_eq!(list.len(), 2);

        assert!(list.should_skip("boss@acme.io").await);
        assert!(list.should_skip("someone@GMAIL.com").await);
        assert!(!list.should_skip("jane@acme.io").await);

        assert_eq!(
            list.reason("user@gmail.com").await,
            "domain gmail.com is on the skip list"
        );
    }

    #[tokio::test]
    async fn test_lazy_skip_list_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let list = LazySkipList::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { MemorySkipList::new().with_domain("gmail.com") }
        });

        assert!(!list.is_loaded());
        assert!(list.should_skip("user@gmail.com").await);
        assert!(!list.should_skip("jane@acme.io").await);
        assert!(list.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
