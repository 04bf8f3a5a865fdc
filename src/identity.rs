//! Canonical repository identities.
//!
//! A [`RepositoryIdentity`] names a node of the dependency graph. Identities compare and hash on
//! their lower-cased `full_name` only, so the same repository discovered several times with
//! different partial metadata collapses to a single node.

use core::fmt::{Display, Formatter};
use core::hash::{Hash, Hasher};
use std::sync::Arc;

/// Host whose paths encode `org/name` repository pairs.
pub const PLATFORM_HOST: &str = "github.com";

/// Whether a name decomposes into an `org/name` repository pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryRef {
    /// A platform repository with a known owner and name.
    Resolved { org: Arc<str>, name: Arc<str> },

    /// A reference that could not be mapped to a repository, such as a registry-only package name.
    Opaque,
}

/// A repository, or an unresolved dependency reference, as a graph node.
#[derive(Debug, Clone)]
pub struct RepositoryIdentity {
    full_name: Arc<str>,
    key: Arc<str>,
    reference: RepositoryRef,
    source_url: Arc<str>,
    version_constraint: Arc<str>,
    language: Arc<str>,
}

impl RepositoryIdentity {
    /// Build an identity from a stored or listed name.
    ///
    /// Names with exactly two non-empty `/`-separated segments become resolved `org/name`
    /// identities, a leading `/` (as found in listing hrefs) is ignored, and URL-shaped names
    /// pointing at the platform host resolve to their trailing two segments. Anything else is opaque.
    #[must_use]
    pub fn from_full_name(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches('/').trim_end_matches('/');
        if let Some((org, name)) = split_pair(trimmed) {
            return Self::resolved(org, name);
        }

        Self::from_package_name(trimmed, "")
    }

    /// Build an identity from a declared dependency's package name.
    ///
    /// Package names may carry arbitrarily deep prefixes (`github.com/org/name`,
    /// `https://github.com/org/group/name`); when the name points at the platform host, only the
    /// trailing two segments form the `org/name` pair. Other names are kept verbatim as opaque
    /// identities. The declared requirement is retained in both cases.
    #[must_use]
    pub fn from_package_name(package_name: &str, requirement: &str) -> Self {
        let package_name = package_name.trim();
        let identity = platform_pair(package_name).map_or_else(
            || Self::opaque(package_name),
            |(org, name)| Self::resolved(org, name).with_source_url(package_name),
        );

        identity.with_version_constraint(requirement)
    }

    /// Parse a crawl target given as `org/name`.
    ///
    /// Unlike [`Self::from_full_name`], anything but exactly two non-empty segments is rejected.
    pub fn parse_target(s: &str) -> Result<Self, String> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("expected a repository in the form org/name, got '{s}'"));
        }

        Ok(Self::resolved(parts[0].trim(), parts[1].trim()))
    }

    /// Rebuild an identity from its persisted columns.
    ///
    /// Nothing is re-parsed: the identity keeps `key` verbatim and is opaque when it was stored
    /// as opaque or without an `org/name` pair.
    #[must_use]
    pub fn from_stored(key: &str, full_name: &str, org: &str, name: &str, opaque: bool) -> Self {
        let reference = if opaque || org.is_empty() || name.is_empty() {
            RepositoryRef::Opaque
        } else {
            RepositoryRef::Resolved {
                org: Arc::from(org),
                name: Arc::from(name),
            }
        };

        Self {
            full_name: Arc::from(full_name),
            key: Arc::from(key),
            reference,
            source_url: Arc::from(""),
            version_constraint: Arc::from(""),
            language: Arc::from(""),
        }
    }

    fn resolved(org: &str, name: &str) -> Self {
        let full_name: Arc<str> = Arc::from(format!("{org}/{name}"));
        Self {
            key: Arc::from(full_name.to_lowercase()),
            source_url: Arc::from(format!("https://{PLATFORM_HOST}/{full_name}")),
            full_name,
            reference: RepositoryRef::Resolved {
                org: Arc::from(org),
                name: Arc::from(name),
            },
            version_constraint: Arc::from(""),
            language: Arc::from(""),
        }
    }

    fn opaque(raw: &str) -> Self {
        Self {
            full_name: Arc::from(raw),
            key: Arc::from(raw.to_lowercase()),
            reference: RepositoryRef::Opaque,
            source_url: Arc::from(""),
            version_constraint: Arc::from(""),
            language: Arc::from(""),
        }
    }

    #[must_use]
    pub fn with_source_url(mut self, url: impl AsRef<str>) -> Self {
        let url = url.as_ref();
        if !url.is_empty() {
            self.source_url = Arc::from(url);
        }
        self
    }

    #[must_use]
    pub fn with_version_constraint(mut self, constraint: impl AsRef<str>) -> Self {
        self.version_constraint = Arc::from(constraint.as_ref().trim());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl AsRef<str>) -> Self {
        self.language = Arc::from(language.as_ref());
        self
    }

    /// The name as discovered, e.g. `Offset64/EOS`.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The lower-cased `full_name`, used as the storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn reference(&self) -> &RepositoryRef {
        &self.reference
    }

    /// Owner of the repository, empty for opaque identities.
    #[must_use]
    pub fn org(&self) -> &str {
        match &self.reference {
            RepositoryRef::Resolved { org, .. } => org,
            RepositoryRef::Opaque => "",
        }
    }

    /// Repository name without its owner, empty for opaque identities.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.reference {
            RepositoryRef::Resolved { name, .. } => name,
            RepositoryRef::Opaque => "",
        }
    }

    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        matches!(self.reference, RepositoryRef::Opaque)
    }

    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    #[must_use]
    pub fn version_constraint(&self) -> &str {
        &self.version_constraint
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl PartialEq for RepositoryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RepositoryIdentity {}

impl Hash for RepositoryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Display for RepositoryIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

/// `org/name` with both parts non-empty and an owner that does not look like a host.
fn split_pair(s: &str) -> Option<(&str, &str)> {
    let (org, name) = s.split_once('/')?;
    if org.is_empty() || name.is_empty() || name.contains('/') || org.contains('.') || org.contains(':') {
        return None;
    }
    Some((org, name))
}

/// Trailing `org/name` of a path that goes through the platform host.
fn platform_pair(package_name: &str) -> Option<(&str, &str)> {
    let path = package_name
        .strip_prefix("https://")
        .or_else(|| package_name.strip_prefix("http://"))
        .unwrap_or(package_name)
        .trim_end_matches('/');

    let segments: Vec<&str> = path.split('/').collect();
    let host_index = segments.iter().position(|s| s.eq_ignore_ascii_case(PLATFORM_HOST))?;

    // at least an org and a name after the host
    if segments.len() < host_index + 3 {
        return None;
    }

    let name = segments[segments.len() - 1].trim_end_matches(".git");
    let org = segments[segments.len() - 2];
    if org.is_empty() || name.is_empty() {
        return None;
    }

    Some((org, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::hash::DefaultHasher;

    fn hash_of(identity: &RepositoryIdentity) -> u64 {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_case_and_metadata() {
        let a = RepositoryIdentity::from_full_name("Org/Name").with_language("Rust");
        let b = RepositoryIdentity::from_full_name("org/name").with_version_constraint("= 1.0");

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_set_dedupes_partial_metadata() {
        let mut set = HashSet::new();
        let _ = set.insert(RepositoryIdentity::from_full_name("offset64/EOS"));
        let _ = set.insert(RepositoryIdentity::from_package_name("github.com/Offset64/eos", "v1.2.0"));

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_package_name_on_platform_host() {
        let identity = RepositoryIdentity::from_package_name("github.com/offset64/eos", "v0.3.1");

        assert_eq!(identity.org(), "offset64");
        assert_eq!(identity.name(), "eos");
        assert_eq!(identity.full_name(), "offset64/eos");
        assert_eq!(identity.version_constraint(), "v0.3.1");
        assert_eq!(identity.source_url(), "github.com/offset64/eos");
        assert!(!identity.is_opaque());
    }

    #[test]
    fn test_package_name_uses_trailing_two_segments() {
        let identity = RepositoryIdentity::from_package_name("https://github.com/org/group/name", "");

        assert_eq!(identity.org(), "group");
        assert_eq!(identity.name(), "name");
        assert_eq!(identity.full_name(), "group/name");
    }

    #[test]
    fn test_registry_package_is_opaque() {
        let identity = RepositoryIdentity::from_package_name("left-pad", "^1.3.0");

        assert_eq!(identity.org(), "");
        assert_eq!(identity.name(), "");
        assert_eq!(identity.full_name(), "left-pad");
        assert_eq!(identity.version_constraint(), "^1.3.0");
        assert!(identity.is_opaque());
        assert_eq!(identity.reference(), &RepositoryRef::Opaque);
    }

    #[test]
    fn test_scoped_registry_package_is_opaque() {
        let identity = RepositoryIdentity::from_package_name("@types/node", "");
        assert!(identity.is_opaque());
        assert_eq!(identity.full_name(), "@types/node");
    }

    #[test]
    fn test_other_hosts_are_opaque() {
        assert!(RepositoryIdentity::from_package_name("golang.org/x/net", "").is_opaque());
        assert!(RepositoryIdentity::from_package_name("gopkg.in/yaml.v3", "").is_opaque());
        assert!(RepositoryIdentity::from_package_name("github.com/only-org", "").is_opaque());
    }

    #[test]
    fn test_from_full_name_strips_href_slash() {
        let identity = RepositoryIdentity::from_full_name("/tokio-rs/tokio");

        assert_eq!(identity.full_name(), "tokio-rs/tokio");
        assert_eq!(identity.key(), "tokio-rs/tokio");
        assert_eq!(identity.source_url(), "https://github.com/tokio-rs/tokio");
    }

    #[test]
    fn test_from_full_name_accepts_platform_url() {
        let identity = RepositoryIdentity::from_full_name("https://github.com/Offset64/Dependagraph");

        assert_eq!(identity.org(), "Offset64");
        assert_eq!(identity.key(), "offset64/dependagraph");
    }

    #[test]
    fn test_from_full_name_single_segment_is_opaque() {
        let identity = RepositoryIdentity::from_full_name("left-pad");
        assert!(identity.is_opaque());
        assert_eq!(identity.key(), "left-pad");
    }

    #[test]
    fn test_parse_target() {
        let target = RepositoryIdentity::parse_target("Offset64/EOS").unwrap();
        assert_eq!(target.org(), "Offset64");
        assert_eq!(target.name(), "EOS");
        assert_eq!(target.key(), "offset64/eos");
    }

    #[test]
    fn test_parse_target_rejects_malformed() {
        let _ = RepositoryIdentity::parse_target("offset64").unwrap_err();
        let _ = RepositoryIdentity::parse_target("a/b/c").unwrap_err();
        let _ = RepositoryIdentity::parse_target("/eos").unwrap_err();
        let _ = RepositoryIdentity::parse_target("offset64/").unwrap_err();
    }

    #[test]
    fn test_from_stored_keeps_opaque_scoped_package() {
        let identity = RepositoryIdentity::from_stored("@types/node", "@types/node", "", "", true);

        assert!(identity.is_opaque());
        assert_eq!(identity.key(), "@types/node");
        assert_eq!(identity.org(), "");
    }

    #[test]
    fn test_from_stored_keeps_key_verbatim() {
        let identity = RepositoryIdentity::from_stored("left-pad/", "left-pad/", "", "", true);
        assert_eq!(identity.key(), "left-pad/");
        assert_eq!(identity.full_name(), "left-pad/");

        let resolved = RepositoryIdentity::from_stored("offset64/eos", "Offset64/EOS", "Offset64", "EOS", false);
        assert!(!resolved.is_opaque());
        assert_eq!(resolved.key(), "offset64/eos");
        assert_eq!(resolved.name(), "EOS");
    }

    #[test]
    fn test_display_uses_discovered_case() {
        let identity = RepositoryIdentity::from_full_name("Offset64/EOS");
        assert_eq!(identity.to_string(), "Offset64/EOS");
    }
}
