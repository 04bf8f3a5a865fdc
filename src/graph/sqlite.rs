//! `SQLite` graph backend.

use super::backend::{GraphBackend, GraphStats, StoredEdge, StoredNode};
use super::window::Window;
use crate::Result;
use crate::identity::RepositoryIdentity;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};

const LOG_TARGET: &str = "    sqlite";

const SCHEMA: &str = r"
-- Graph nodes, keyed by the lower-cased full name
CREATE TABLE IF NOT EXISTS repositories (
    key TEXT PRIMARY KEY NOT NULL,
    full_name TEXT NOT NULL,
    org TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL DEFAULT '',
    source_url TEXT NOT NULL DEFAULT '',
    language TEXT NOT NULL DEFAULT '',
    opaque INTEGER NOT NULL DEFAULT 0,
    last_targeted INTEGER
);

-- Frontier selection only ever looks at untargeted nodes
CREATE INDEX IF NOT EXISTS idx_repositories_frontier ON repositories(last_targeted) WHERE last_targeted IS NULL;

-- DEPENDS_ON edges, from dependent to dependency
CREATE TABLE IF NOT EXISTS depends_on (
    dependent TEXT NOT NULL REFERENCES repositories(key),
    dependency TEXT NOT NULL REFERENCES repositories(key),
    requirement TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (dependent, dependency)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_depends_on_dependency ON depends_on(dependency);
";

const UPSERT_NODE: &str = "
INSERT INTO repositories (key, full_name, org, name, source_url, language, opaque)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT(key) DO UPDATE SET
    org = CASE WHEN repositories.org = '' THEN excluded.org ELSE repositories.org END,
    name = CASE WHEN repositories.name = '' THEN excluded.name ELSE repositories.name END,
    source_url = CASE WHEN repositories.source_url = '' THEN excluded.source_url ELSE repositories.source_url END,
    language = CASE WHEN repositories.language = '' THEN excluded.language ELSE repositories.language END,
    opaque = repositories.opaque AND excluded.opaque";

const MERGE_EDGE: &str = "
INSERT INTO depends_on (dependent, dependency, requirement)
VALUES (?1, ?2, ?3)
ON CONFLICT(dependent, dependency) DO NOTHING";

const STAMP_NODE: &str = "UPDATE repositories SET last_targeted = ?2 WHERE key = ?1";

const NODE_COLUMNS: &str = "key, full_name, org, name, source_url, language, opaque, last_targeted";

/// [`GraphBackend`] over a single `SQLite` database.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create the graph database at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            std::fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
        }

        let conn = Connection::open(path).into_app_err_with(|| format!("opening graph database '{path}'"))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .into_app_err_with(|| format!("enabling WAL on '{path}'"))?;

        log::debug!(target: LOG_TARGET, "Opened graph database '{path}'");
        Self::with_connection(conn)
    }

    /// A transient database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().into_app_err("opening in-memory graph database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .into_app_err("enabling foreign keys")?;
        conn.execute_batch(SCHEMA).into_app_err("applying the graph schema")?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str, exclusions: &[String]) -> Result<u64> {
        self.conn
            .query_row(sql, params_from_iter(exclusions), |row| row.get(0))
            .into_app_err_with(|| format!("counting with '{sql}'"))
    }
}

impl GraphBackend for SqliteBackend {
    fn merge_window(&mut self, window: &Window, targeted_at: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.transaction().into_app_err("starting a window transaction")?;

        let center = window.center.key();
        upsert_node(&tx, &window.center)?;
        let _ = tx
            .prepare_cached(STAMP_NODE)
            .and_then(|mut stmt| stmt.execute(params![center, targeted_at.timestamp_millis()]))
            .into_app_err_with(|| format!("stamping '{}'", window.center))?;

        for dependency in &window.dependencies {
            upsert_node(&tx, dependency)?;
            merge_edge(&tx, center, dependency.key(), dependency.version_constraint())?;
        }

        for dependent in &window.dependents {
            upsert_node(&tx, dependent)?;
            merge_edge(&tx, dependent.key(), center, "")?;
        }

        tx.commit()
            .into_app_err_with(|| format!("committing the window of '{}'", window.center))
    }

    fn find_untargeted(&self, exclusions: &[String]) -> Result<Option<StoredNode>> {
        let exclusions = effective_exclusions(exclusions);
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM repositories WHERE {} ORDER BY rowid LIMIT 1",
            frontier_clause(exclusions.len())
        );

        self.conn
            .query_row(&sql, params_from_iter(&exclusions), row_to_node)
            .optional()
            .into_app_err("selecting the next frontier node")
    }

    fn node(&self, key: &str) -> Result<Option<StoredNode>> {
        self.conn
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM repositories WHERE key = ?1"),
                [key],
                row_to_node,
            )
            .optional()
            .into_app_err_with(|| format!("looking up node '{key}'"))
    }

    fn edges_of(&self, key: &str) -> Result<Vec<StoredEdge>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT dependent, dependency, requirement FROM depends_on
                 WHERE dependent = ?1 OR dependency = ?1
                 ORDER BY dependent, dependency",
            )
            .into_app_err("preparing the edge query")?;

        let edges = stmt
            .query_map([key], |row| {
                Ok(StoredEdge {
                    dependent: row.get(0)?,
                    dependency: row.get(1)?,
                    requirement: row.get(2)?,
                })
            })
            .and_then(Iterator::collect)
            .into_app_err_with(|| format!("listing edges of '{key}'"))?;

        Ok(edges)
    }

    fn stats(&self, exclusions: &[String]) -> Result<GraphStats> {
        let exclusions = effective_exclusions(exclusions);

        Ok(GraphStats {
            nodes: self.count("SELECT COUNT(*) FROM repositories", &[])?,
            edges: self.count("SELECT COUNT(*) FROM depends_on", &[])?,
            targeted: self.count("SELECT COUNT(*) FROM repositories WHERE last_targeted IS NOT NULL", &[])?,
            frontier: self.count(
                &format!("SELECT COUNT(*) FROM repositories WHERE {}", frontier_clause(exclusions.len())),
                &exclusions,
            )?,
        })
    }
}

fn upsert_node(tx: &Transaction<'_>, identity: &RepositoryIdentity) -> Result<()> {
    let _ = tx
        .prepare_cached(UPSERT_NODE)
        .and_then(|mut stmt| {
            stmt.execute(params![
                identity.key(),
                identity.full_name(),
                identity.org(),
                identity.name(),
                identity.source_url(),
                identity.language(),
                identity.is_opaque(),
            ])
        })
        .into_app_err_with(|| format!("merging node '{identity}'"))?;
    Ok(())
}

fn merge_edge(tx: &Transaction<'_>, dependent: &str, dependency: &str, requirement: &str) -> Result<()> {
    let _ = tx
        .prepare_cached(MERGE_EDGE)
        .and_then(|mut stmt| stmt.execute(params![dependent, dependency, requirement]))
        .into_app_err_with(|| format!("merging edge '{dependent}' -> '{dependency}'"))?;
    Ok(())
}

/// Exclusions are matched against the lower-cased key. An empty exclusion would match every name.
fn effective_exclusions(exclusions: &[String]) -> Vec<String> {
    exclusions.iter().filter(|e| !e.is_empty()).map(|e| e.to_lowercase()).collect()
}

fn frontier_clause(exclusion_count: usize) -> String {
    let mut clause = String::from("last_targeted IS NULL");
    for i in 1..=exclusion_count {
        clause.push_str(&format!(" AND instr(key, ?{i}) = 0"));
    }
    clause
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<StoredNode> {
    let last_targeted: Option<i64> = row.get(7)?;
    Ok(StoredNode {
        key: row.get(0)?,
        full_name: row.get(1)?,
        org: row.get(2)?,
        name: row.get(3)?,
        source_url: row.get(4)?,
        language: row.get(5)?,
        opaque: row.get(6)?,
        last_targeted: last_targeted.and_then(DateTime::from_timestamp_millis),
    })
}
