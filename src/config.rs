use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Sentinel project name requesting expansion to all projects owned by the
/// configured token.
pub const WILDCARD: &str = "*";

/// Configuration file structure for cipulse.
///
/// Declares the GitLab endpoint to poll, how often to poll it, and the set
/// of project/ref pairs to monitor. A configuration file is required; the
/// exporter refuses to start without at least one project entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// GitLab endpoint and credential
    pub gitlab: GitLabConfig,

    /// Seconds between polling cycles
    pub polling_interval_seconds: u64,

    /// Project/ref pairs to monitor
    #[serde(default)]
    pub projects: Vec<Target>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,

    /// GitLab personal access token
    pub token: Option<String>,
}

/// A monitored project/ref pair.
///
/// `name` is either a project path (e.g. `group/project`) or the `"*"`
/// wildcard. Per-target state is keyed by `(name, ref)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Target {
    pub name: String,

    /// Git ref (branch or tag) whose pipelines are monitored
    #[serde(rename = "ref")]
    pub ref_: String,
}

impl Target {
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }

    pub fn key(&self) -> (String, String) {
        (self.name.clone(), self.ref_.clone())
    }
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cipulse.yml, ./cipulse.yaml, ./cipulse.toml, ./cipulse.json
    /// 3. ~/.cipulse.yml
    ///
    /// Unlike tools that can fall back to defaults, a missing configuration
    /// is an error here: there is nothing to poll without project entries.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["cipulse.yml", "cipulse.yaml", "cipulse.toml", "cipulse.json"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".cipulse.yml");
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        bail!("no configuration file found; pass --config or create cipulse.yml")
    }

    /// Load and validate configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            _ => {
                // Try YAML first, then TOML, then JSON
                serde_yaml::from_str(&contents)
                    .or_else(|_| toml::from_str(&contents))
                    .or_else(|_| serde_json::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gitlab.url.is_empty() {
            bail!("gitlab.url must not be empty");
        }
        if self.polling_interval_seconds < 1 {
            bail!("polling_interval_seconds must be at least 1");
        }
        if self.projects.is_empty() {
            bail!("you need to configure at least one project/ref to poll, none given");
        }
        Ok(())
    }
}
