use super::backend::{GraphBackend, GraphStats, StoredNode};
use super::window::Window;
use crate::Result;
use crate::identity::RepositoryIdentity;
use chrono::Utc;

const LOG_TARGET: &str = "     graph";

/// Decides which untargeted names may be selected as the next crawl target.
///
/// A name is eligible unless its lower-cased key contains one of the exclusion substrings, compared
/// without regard to case. The default excludes
/// names containing `.`, which mostly belong to package registries rather than repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierFilter {
    exclusions: Vec<String>,
}

impl FrontierFilter {
    #[must_use]
    pub fn new(exclusions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            exclusions: exclusions.into_iter().map(Into::into).filter(|e: &String| !e.is_empty()).collect(),
        }
    }

    #[must_use]
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }
}

impl Default for FrontierFilter {
    fn default() -> Self {
        Self::new(["."])
    }
}

/// The persistent dependency graph.
#[derive(Debug)]
pub struct GraphStore<B> {
    backend: B,
    frontier: FrontierFilter,
}

impl<B: GraphBackend> GraphStore<B> {
    pub const fn new(backend: B, frontier: FrontierFilter) -> Self {
        Self { backend, frontier }
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub const fn frontier(&self) -> &FrontierFilter {
        &self.frontier
    }

    /// Merge `window` and stamp its center as targeted now.
    ///
    /// Saving the same window again adds no nodes or edges and only refreshes the stamp.
    pub fn save_window(&mut self, window: &Window) -> Result<()> {
        log::debug!(
            target: LOG_TARGET,
            "Saving window of '{}' with {} dependencies and {} dependents",
            window.center,
            window.dependencies.len(),
            window.dependents.len()
        );

        self.backend.merge_window(window, Utc::now())
    }

    /// One node that has never been a crawl center and passes the frontier filter.
    ///
    /// `None` means the frontier is exhausted.
    pub fn next_untargeted_node(&self) -> Result<Option<RepositoryIdentity>> {
        Ok(self
            .backend
            .find_untargeted(self.frontier.exclusions())?
            .map(|node| identity_of(&node)))
    }

    pub fn stats(&self) -> Result<GraphStats> {
        self.backend.stats(self.frontier.exclusions())
    }
}

fn identity_of(node: &StoredNode) -> RepositoryIdentity {
    RepositoryIdentity::from_stored(&node.key, &node.full_name, &node.org, &node.name, node.opaque)
        .with_source_url(&node.source_url)
        .with_language(&node.language)
}
