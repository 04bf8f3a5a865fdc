//! Dependency manifests from the GitHub GraphQL API.

use super::ProviderResult;
use crate::Result;
use octocrab::Octocrab;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;
use std::sync::Arc;

const LOG_TARGET: &str = " manifests";

/// Preview needed for `dependencyGraphManifests`.
const DEPENDENCY_GRAPH_PREVIEW: &str = "hawkgirl";

const DEPENDENCIES_QUERY: &str = r"
query GetDependencies($org: String!, $name: String!) {
    repository(owner: $org, name: $name) {
        dependencyGraphManifests(first: 100) {
            pageInfo {
                hasNextPage
            }
            edges {
                node {
                    blobPath
                    dependencies(first: 100) {
                        pageInfo {
                            hasNextPage
                        }
                        nodes {
                            packageName
                            packageManager
                            requirements
                        }
                    }
                }
            }
        }
    }
}";

/// A file from which the platform builds a repository's dependency graph (`go.mod`, `Cargo.toml`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub path: String,
    pub dependencies: Vec<DeclaredDependency>,
}

/// One dependency declared in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub package_name: String,
    pub requirement: String,
    pub package_manager: String,
}

impl DeclaredDependency {
    #[must_use]
    pub fn new(package_name: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            requirement: requirement.into(),
            package_manager: String::new(),
        }
    }
}

/// Answers "which manifests does `org/name` declare".
///
/// Returns `ProviderResult::NotFound` when the endpoint cannot resolve the repository.
pub trait ManifestQueryClient: Send + Sync {
    fn query(&self, org: &str, name: &str) -> impl Future<Output = ProviderResult<Vec<Manifest>>> + Send;
}

/// [`ManifestQueryClient`] over the GitHub GraphQL endpoint.
///
/// The response envelope is read as a whole so that a `NOT_FOUND` error can be told apart from
/// other failures.
#[derive(Debug, Clone)]
pub struct GitHubManifestClient {
    octocrab: Octocrab,
}

impl GitHubManifestClient {
    /// Create a client authenticating with `token` against `api_base` (e.g. `https://api.github.com`).
    pub fn new(token: &str, api_base: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token)
            .add_preview(DEPENDENCY_GRAPH_PREVIEW)
            .base_uri(api_base)
            .into_app_err_with(|| format!("invalid API base URL '{api_base}'"))?
            .build()
            .into_app_err("building the GitHub API client")?;

        Ok(Self { octocrab })
    }
}

impl ManifestQueryClient for GitHubManifestClient {
    async fn query(&self, org: &str, name: &str) -> ProviderResult<Vec<Manifest>> {
        let payload = serde_json::json!({
            "query": DEPENDENCIES_QUERY,
            "variables": { "org": org, "name": name },
        });

        let response: GraphQlResponse = match self.octocrab.post("/graphql", Some(&payload)).await {
            Ok(response) => response,
            Err(e) => {
                return ProviderResult::Error(Arc::new(app_err!("querying dependency manifests of '{org}/{name}': {e}")));
            }
        };

        response.into_manifests(org, name)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    dependency_graph_manifests: Edges<ManifestNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Edges<T> {
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Nodes<T> {
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestNode {
    blob_path: String,
    dependencies: Option<Nodes<DependencyNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyNode {
    package_name: String,
    #[serde(default)]
    package_manager: Option<String>,
    #[serde(default)]
    requirements: Option<String>,
}

impl GraphQlResponse {
    fn into_manifests(self, org: &str, name: &str) -> ProviderResult<Vec<Manifest>> {
        let repository = self.data.and_then(|d| d.repository);

        if self.errors.iter().any(|e| e.kind.as_deref() == Some("NOT_FOUND")) {
            log::debug!(target: LOG_TARGET, "'{org}/{name}' could not be resolved: {}", self.errors[0].message);
            return ProviderResult::NotFound;
        }

        let Some(repository) = repository else {
            if self.errors.is_empty() {
                return ProviderResult::NotFound;
            }

            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return ProviderResult::Error(Arc::new(app_err!(
                "querying dependency manifests of '{org}/{name}' failed: {}",
                messages.join("; ")
            )));
        };

        for note in truncation_notes(&repository) {
            log::warn!(target: LOG_TARGET, "Dependencies of '{org}/{name}' are incomplete: {note}");
        }

        let manifests = repository
            .dependency_graph_manifests
            .edges
            .into_iter()
            .map(|edge| Manifest {
                path: edge.node.blob_path,
                dependencies: edge
                    .node
                    .dependencies
                    .map(|d| d.nodes)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| DeclaredDependency {
                        package_name: d.package_name,
                        requirement: d.requirements.unwrap_or_default(),
                        package_manager: d.package_manager.unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        ProviderResult::Found(manifests)
    }
}

/// Connections that had more entries than one query returns.
fn truncation_notes(repository: &RepositoryNode) -> Vec<String> {
    let manifests = &repository.dependency_graph_manifests;
    let mut notes = Vec::new();

    if manifests.page_info.has_next_page {
        notes.push(format!("only the first {} manifests were listed", manifests.edges.len()));
    }

    for edge in &manifests.edges {
        if let Some(dependencies) = &edge.node.dependencies
            && dependencies.page_info.has_next_page
        {
            notes.push(format!(
                "'{}' lists more than {} dependencies",
                edge.node.blob_path,
                dependencies.nodes.len()
            ));
        }
    }

    notes
}
