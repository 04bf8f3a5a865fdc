use super::manifests::{Manifest, ManifestQueryClient};
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::ProviderResult;
use crate::identity::{RepositoryIdentity, RepositoryRef};
use std::collections::HashSet;
use std::sync::Arc;

const LOG_TARGET: &str = "dependency";

/// Manifests under this directory describe CI tooling, not product dependencies.
const CI_MANIFEST_DIR: &str = ".github/workflows";

/// Collects the repositories a target declares as dependencies.
#[derive(Debug)]
pub struct DependencyCollector<Q> {
    client: Arc<Q>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl<Q: ManifestQueryClient + 'static> DependencyCollector<Q> {
    #[must_use]
    pub fn new(client: Q, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            client: Arc::new(client),
            limiter: Arc::new(limiter),
            retry,
        }
    }

    #[must_use]
    pub fn client(&self) -> &Q {
        &self.client
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Query the manifests of `target` and turn their declared dependencies into identities.
    ///
    /// Returns `NotFound` when the endpoint cannot resolve `target`, and without asking when
    /// `target` is not an `org/name` repository at all.
    pub async fn collect(&self, target: &RepositoryIdentity) -> ProviderResult<HashSet<RepositoryIdentity>> {
        let RepositoryRef::Resolved { org, name } = target.reference() else {
            log::debug!(target: LOG_TARGET, "'{target}' is not a repository, nothing to query");
            return ProviderResult::NotFound;
        };

        log::info!(target: LOG_TARGET, "Querying dependencies for '{target}'");

        let client = Arc::clone(&self.client);
        self.retry
            .run(
                "dependency query",
                &self.limiter,
                (Arc::clone(org), Arc::clone(name)),
                move |(org, name): (Arc<str>, Arc<str>)| {
                    let client = Arc::clone(&client);
                    async move { client.query(&org, &name).await }
                },
            )
            .await
            .map(|manifests| dependencies_from_manifests(&manifests))
    }
}

/// Flatten declared dependencies into a set, skipping CI manifests.
#[must_use]
pub fn dependencies_from_manifests(manifests: &[Manifest]) -> HashSet<RepositoryIdentity> {
    manifests
        .iter()
        .filter(|m| !is_ci_manifest(&m.path))
        .flat_map(|m| &m.dependencies)
        .map(|d| RepositoryIdentity::from_package_name(&d.package_name, &d.requirement).with_language(&d.package_manager))
        .collect()
}

fn is_ci_manifest(path: &str) -> bool {
    path.contains(CI_MANIFEST_DIR)
}
