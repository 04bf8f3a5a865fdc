use super::listing::{ListingPage, PageFetcher};
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::ProviderResult;
use crate::identity::{RepositoryIdentity, RepositoryRef};
use ohno::app_err;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

const LOG_TARGET: &str = "dependents";

/// Collects the repositories that depend on a target by walking its dependents listing.
#[derive(Debug)]
pub struct DependentsCollector<F> {
    fetcher: Arc<F>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    web_base: Url,
}

impl<F: PageFetcher + 'static> DependentsCollector<F> {
    #[must_use]
    pub fn new(fetcher: F, limiter: RateLimiter, retry: RetryPolicy, web_base: Url) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            limiter: Arc::new(limiter),
            retry,
            web_base,
        }
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// First page of the dependents listing for `target`.
    pub fn listing_url(&self, target: &RepositoryIdentity) -> crate::Result<Url> {
        let RepositoryRef::Resolved { org, name } = target.reference() else {
            return Err(app_err!("'{target}' is not a repository and has no dependents listing"));
        };

        let mut url = self.web_base.clone();
        let _ = url
            .path_segments_mut()
            .map_err(|()| app_err!("'{}' cannot be used as a base URL", self.web_base))?
            .pop_if_empty()
            .extend([org.as_ref(), name.as_ref(), "network", "dependents"]);

        Ok(url)
    }

    /// Collect every dependent of `target` across all listing pages.
    ///
    /// A failure on the first page is returned as an error. A failure on any later page ends
    /// pagination and the dependents gathered so far are returned.
    pub async fn collect(&self, target: &RepositoryIdentity) -> ProviderResult<HashSet<RepositoryIdentity>> {
        let first = match self.listing_url(target) {
            Ok(url) => url,
            Err(e) => return ProviderResult::Error(Arc::new(e)),
        };

        let mut dependents = HashSet::new();
        let mut pages = 0usize;
        let mut next = Some(first);

        while let Some(url) = next.take() {
            pages += 1;
            log::info!(target: LOG_TARGET, "Loading '{url}'");

            let failure = match self.fetch_page(&url).await {
                ProviderResult::Found(page) => {
                    dependents.extend(page.references.iter().map(|r| RepositoryIdentity::from_full_name(r)));
                    next = page.next_page.filter(|n| *n != url);
                    continue;
                }
                ProviderResult::NotFound => Arc::new(app_err!("dependents listing '{url}' was not found")),
                ProviderResult::Error(e) => e,
            };

            if pages == 1 {
                return ProviderResult::Error(failure);
            }

            log::warn!(
                target: LOG_TARGET,
                "Stopping pagination of '{target}' after {} page(s), keeping {} dependent(s): {failure}",
                pages - 1,
                dependents.len()
            );
            break;
        }

        log::debug!(target: LOG_TARGET, "Found {} dependent(s) of '{target}' in {pages} page(s)", dependents.len());
        ProviderResult::Found(dependents)
    }

    async fn fetch_page(&self, url: &Url) -> ProviderResult<ListingPage> {
        let fetcher = Arc::clone(&self.fetcher);
        self.retry
            .run("dependents page", &self.limiter, url.clone(), move |url: Url| {
                let fetcher = Arc::clone(&fetcher);
                async move { ProviderResult::from(fetcher.fetch(&url).await) }
            })
            .await
    }
}
