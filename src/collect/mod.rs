//! Collection of graph edges from the two upstream sources.
//!
//! Dependents come from the paginated HTML "network/dependents" listing of a repository, walked
//! page by page by the [`DependentsCollector`]. Dependencies come from a single GraphQL query for
//! the repository's dependency manifests, issued by the [`DependencyCollector`].
//!
//! # Implementation Model
//!
//! Each collector owns its own [`RateLimiter`], a rolling-window request budget driven by a
//! [`tick::Clock`], and a [`RetryPolicy`] whose every attempt passes through that limiter.
//! The network side sits behind the [`PageFetcher`] and [`ManifestQueryClient`] traits so the
//! collectors can be exercised against scripted sources.
//!
//! Outcomes are reported as a [`ProviderResult`]: `Found` with a set of identities, `NotFound`
//! when the source cannot resolve the target, or `Error` when it could not be reached.

mod dependencies;
mod dependents;
mod listing;
mod manifests;
mod provider_result;
mod rate_limiter;
mod retry;

pub use dependencies::{DependencyCollector, dependencies_from_manifests};
pub use dependents::DependentsCollector;
pub use listing::{HttpPageFetcher, ListingPage, PageFetcher, parse_listing};
pub use manifests::{DeclaredDependency, GitHubManifestClient, Manifest, ManifestQueryClient};
pub use provider_result::ProviderResult;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
