//! Persistent storage of the dependency graph.
//!
//! The graph is made of repository nodes and directed `DEPENDS_ON` edges from a dependent to its
//! dependency. It only ever grows through [`Window`] merges: one crawl center together with the
//! neighbors discovered for it, written in a single transaction.
//!
//! A node's `last_targeted` stamp is the only "already visited" marker of a crawl. Nodes without
//! it form the frontier, from which [`GraphStore::next_untargeted_node`] picks the next target.
//!
//! ## Module Structure
//!
//! - `backend` - The [`GraphBackend`] storage contract and its record types
//! - `sqlite` - [`SqliteBackend`], the `SQLite` implementation
//! - `store` - [`GraphStore`] and the [`FrontierFilter`]
//! - `window` - The [`Window`] unit of persistence

mod backend;
mod sqlite;
mod store;
mod window;

pub use backend::{GraphBackend, GraphStats, StoredEdge, StoredNode};
pub use sqlite::SqliteBackend;
pub use store::{FrontierFilter, GraphStore};
pub use window::Window;
