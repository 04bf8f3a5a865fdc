use crate::identity::RepositoryIdentity;
use std::collections::HashSet;

/// One crawl's center node plus its immediate neighbors, persisted as a unit.
#[derive(Debug, Clone)]
pub struct Window {
    pub center: RepositoryIdentity,

    /// Repositories the center depends on.
    pub dependencies: HashSet<RepositoryIdentity>,

    /// Repositories that depend on the center.
    pub dependents: HashSet<RepositoryIdentity>,
}

impl Window {
    #[must_use]
    pub const fn new(
        center: RepositoryIdentity,
        dependencies: HashSet<RepositoryIdentity>,
        dependents: HashSet<RepositoryIdentity>,
    ) -> Self {
        Self {
            center,
            dependencies,
            dependents,
        }
    }

    /// A window with no neighbors, which only marks `center` as targeted.
    #[must_use]
    pub fn empty(center: RepositoryIdentity) -> Self {
        Self::new(center, HashSet::new(), HashSet::new())
    }

    /// Number of edges this window describes.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.dependencies.len() + self.dependents.len()
    }
}
