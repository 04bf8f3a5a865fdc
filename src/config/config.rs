use crate::Result;
use camino::Utf8Path;
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// The default configuration, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up when none is given explicitly
pub const CONFIG_FILE_NAME: &str = "dependagraph.toml";

const fn default_dependents_page_limit() -> usize {
    120
}

const fn default_dependency_query_limit() -> usize {
    60
}

const fn default_window_secs() -> u64 {
    60
}

const fn default_retry_attempts() -> u32 {
    2
}

const fn default_retry_base_delay_ms() -> u64 {
    1000
}

const fn default_request_timeout_secs() -> u64 {
    60
}

fn default_web_base_url() -> String {
    "https://github.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_frontier_exclusions() -> Vec<String> {
    vec![".".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum dependents listing pages per window
    #[serde(default = "default_dependents_page_limit")]
    pub dependents_page_limit: usize,

    /// Length of the dependents listing window, in seconds
    #[serde(default = "default_window_secs")]
    pub dependents_window_secs: u64,

    /// Maximum dependency manifest queries per window
    #[serde(default = "default_dependency_query_limit")]
    pub dependency_query_limit: usize,

    /// Length of the dependency query window, in seconds
    #[serde(default = "default_window_secs")]
    pub dependency_window_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Substrings that keep an untargeted name out of frontier selection
    #[serde(default = "default_frontier_exclusions")]
    pub frontier_exclusions: Vec<String>,

    /// Cap on targets crawled in one coalesce run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_targets: Option<usize>,
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit `config_path`, `dependagraph.toml` in `dir` is used when it exists.
    /// Returns the configuration together with any validation warnings.
    pub fn load(dir: &Utf8Path, config_path: Option<&Utf8Path>) -> Result<(Self, Vec<String>)> {
        let (path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration from {path}"))?;
            (path.to_path_buf(), text)
        } else {
            let path = dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Self::default(), Vec::new())),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration from {path}")),
            }
        };

        let config = Self::parse(&text, &path)?;
        let mut warnings = Vec::new();
        config.validate(&mut warnings);

        Ok((config, warnings))
    }

    fn parse(text: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(text).into_app_err_with(|| format!("parsing TOML configuration from {path}"))
    }

    /// Write the default configuration, comments included
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))
    }

    #[must_use]
    pub const fn dependents_window(&self) -> Duration {
        Duration::from_secs(self.dependents_window_secs)
    }

    #[must_use]
    pub const fn dependency_window(&self) -> Duration {
        Duration::from_secs(self.dependency_window_secs)
    }

    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn web_base(&self) -> Result<Url> {
        Url::parse(&self.web_base_url).into_app_err_with(|| format!("invalid web_base_url '{}'", self.web_base_url))
    }

    fn validate(&self, warnings: &mut Vec<String>) {
        if self.dependents_page_limit == 0 {
            warnings.push("dependents_page_limit must be greater than zero".to_string());
        }

        if self.dependency_query_limit == 0 {
            warnings.push("dependency_query_limit must be greater than zero".to_string());
        }

        if self.dependents_window_secs == 0 {
            warnings.push("dependents_window_secs must be greater than zero".to_string());
        }

        if self.dependency_window_secs == 0 {
            warnings.push("dependency_window_secs must be greater than zero".to_string());
        }

        if self.request_timeout_secs == 0 {
            warnings.push("request_timeout_secs must be greater than zero".to_string());
        }

        for (key, value) in [("web_base_url", &self.web_base_url), ("api_base_url", &self.api_base_url)] {
            match Url::parse(value) {
                Ok(url) if url.cannot_be_a_base() => warnings.push(format!("{key} '{value}' cannot be used as a base URL")),
                Ok(_) => {}
                Err(e) => warnings.push(format!("{key} '{value}' is not a valid URL: {e}")),
            }
        }

        if self.frontier_exclusions.iter().any(String::is_empty) {
            warnings.push("frontier_exclusions must not contain empty strings".to_string());
        }

        if self.max_targets == Some(0) {
            warnings.push("max_targets must be greater than zero when set".to_string());
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn write(dir: &Utf8Path, name: &str, text: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let mut warnings = Vec::new();
        config.validate(&mut warnings);

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.dependents_page_limit, 120);
        assert_eq!(config.dependents_window(), Duration::from_secs(60));
        assert_eq!(config.dependency_query_limit, 60);
        assert_eq!(config.dependency_window(), Duration::from_secs(60));
        assert_eq!(config.frontier_exclusions, vec![".".to_string()]);
        assert_eq!(config.max_targets, None);
    }

    #[test]
    fn test_embedded_defaults_match_field_defaults() {
        let from_fields: Config = toml::from_str("").unwrap();
        assert_eq!(from_fields, Config::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let (_guard, dir) = temp_dir();
        let (config, warnings) = Config::load(&dir, None).unwrap();

        assert_eq!(config, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_file_in_directory_is_picked_up() {
        let (_guard, dir) = temp_dir();
        let _ = write(&dir, CONFIG_FILE_NAME, "dependents_page_limit = 10\nmax_targets = 50\n");

        let (config, _) = Config::load(&dir, None).unwrap();

        assert_eq!(config.dependents_page_limit, 10);
        assert_eq!(config.max_targets, Some(50));
        assert_eq!(config.dependency_query_limit, 60);
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let (_guard, dir) = temp_dir();
        let missing = dir.join("nope.toml");
        let _ = Config::load(&dir, Some(missing.as_path())).unwrap_err();
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let (_guard, dir) = temp_dir();
        let path = write(&dir, "custom.toml", "page_limit = 10\n");

        let _ = Config::load(&dir, Some(path.as_path())).unwrap_err();
    }

    #[test]
    fn test_validation_warnings() {
        let (_guard, dir) = temp_dir();
        let path = write(
            &dir,
            "custom.toml",
            "dependents_page_limit = 0\ndependency_window_secs = 0\nweb_base_url = \"not a url\"\nfrontier_exclusions = [\"\"]\n",
        );

        let (_, warnings) = Config::load(&dir, Some(path.as_path())).unwrap();

        assert_eq!(warnings.len(), 4, "{warnings:?}");
        assert!(warnings.iter().any(|w| w.contains("dependents_page_limit")));
        assert!(warnings.iter().any(|w| w.contains("web_base_url")));
    }

    #[test]
    fn test_save_default_round_trips() {
        let (_guard, dir) = temp_dir();
        let path = dir.join("init.toml");

        Config::save_default(&path).unwrap();
        let (config, warnings) = Config::load(&dir, Some(path.as_path())).unwrap();

        assert_eq!(config, Config::default());
        assert!(warnings.is_empty());
        assert!(fs::read_to_string(&path).unwrap().contains("# dependagraph configuration"));
    }
}
