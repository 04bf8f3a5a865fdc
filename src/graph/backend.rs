use super::window::Window;
use crate::Result;
use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};

/// A node as persisted in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNode {
    /// Primary key, the lower-cased `full_name` of the identity that created the node.
    pub key: String,

    /// The name as first discovered.
    pub full_name: String,
    pub org: String,
    pub name: String,
    pub source_url: String,
    pub language: String,

    /// Whether the name could not be mapped to a platform repository.
    pub opaque: bool,

    /// When the node was last used as a crawl center, `None` for frontier nodes.
    pub last_targeted: Option<DateTime<Utc>>,
}

/// A persisted `DEPENDS_ON` edge, keyed by the lower-cased names of its ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEdge {
    pub dependent: String,
    pub dependency: String,
    pub requirement: String,
}

/// Size of the stored graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: u64,
    pub edges: u64,

    /// Nodes that have been used as a crawl center.
    pub targeted: u64,

    /// Untargeted nodes eligible for frontier selection.
    pub frontier: u64,
}

impl Display for GraphStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} node(s), {} edge(s), {} targeted, {} in the frontier",
            self.nodes, self.edges, self.targeted, self.frontier
        )
    }
}

/// Persistence for the dependency graph.
///
/// Nodes are keyed by the lower-cased `full_name` of their identity and edges by the keys of
/// their two ends; every write merges on those keys. Implementations perform no retries.
pub trait GraphBackend {
    /// Merge `window` in a single transaction.
    ///
    /// The center is upserted and stamped with `targeted_at`. Every dependency is upserted with
    /// an edge from the center to it, and every dependent is upserted with an edge from it to the
    /// center. Existing edges are left untouched. Existing nodes only gain metadata they lack.
    fn merge_window(&mut self, window: &Window, targeted_at: DateTime<Utc>) -> Result<()>;

    /// One untargeted node whose `full_name` contains none of `exclusions`.
    fn find_untargeted(&self, exclusions: &[String]) -> Result<Option<StoredNode>>;

    /// Look up a node by key.
    fn node(&self, key: &str) -> Result<Option<StoredNode>>;

    /// Edges with the node `key` at either end.
    fn edges_of(&self, key: &str) -> Result<Vec<StoredEdge>>;

    fn stats(&self, exclusions: &[String]) -> Result<GraphStats>;
}
