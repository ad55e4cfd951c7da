//! Chart source configuration
//!
//! Stored in `~/.config/kdm/config.yaml`; every field is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};

/// Default chart list location; `{product}` and `{ref}` are substituted
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/rancher/{product}/{ref}/charts/chart_versions.yaml";

pub const DEFAULT_REPO_LABEL: &str = "rancher-rke2-charts";

pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Chart source configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Chart list URL template
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Repository label recorded on every fetched chart
    #[serde(default = "default_repo_label")]
    pub repo_label: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Environment variable holding a bearer token for the chart list origin
    #[serde(default = "default_token_env")]
    pub token_env: Option<String>,
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_repo_label() -> String {
    DEFAULT_REPO_LABEL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_token_env() -> Option<String> {
    Some(DEFAULT_TOKEN_ENV.to_string())
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            repo_label: default_repo_label(),
            timeout_seconds: default_timeout(),
            token_env: default_token_env(),
        }
    }
}

impl SourceConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("kdm").join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.url_template.contains("{ref}") {
            return Err(RepoError::InvalidConfig {
                message: format!(
                    "urlTemplate must contain a {{ref}} placeholder: {}",
                    self.url_template
                ),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(RepoError::InvalidConfig {
                message: "timeoutSeconds must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Chart list URL for a release ref of `product`
    pub fn chart_list_url(&self, product: &str, release_ref: &str) -> Result<url::Url> {
        let raw = self
            .url_template
            .replace("{product}", product)
            .replace("{ref}", release_ref);
        url::Url::parse(&raw).map_err(|e| RepoError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// Token read from the configured environment variable, if set
    pub fn token(&self) -> Option<String> {
        let var = self.token_env.as_deref()?;
        std::env::var(var).ok().filter(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();
        assert_eq!(config.repo_label, "rancher-rke2-charts");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.token_env.as_deref(), Some("GITHUB_TOKEN"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chart_list_url() {
        let url = SourceConfig::default()
            .chart_list_url("rke2", "v1.33.2+rke2r1")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/rancher/rke2/v1.33.2+rke2r1/charts/chart_versions.yaml"
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SourceConfig =
            serde_yaml::from_str("repoLabel: rancher-k3s-charts\ntimeoutSeconds: 5\n").unwrap();
        assert_eq!(config.repo_label, "rancher-k3s-charts");
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.url_template, DEFAULT_URL_TEMPLATE);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "urlTemplate: http://127.0.0.1:8080/{product}/{ref}.yaml\ntokenEnv: null\n",
        )
        .unwrap();

        let loaded = SourceConfig::load_from(&path).unwrap();
        assert_eq!(
            loaded,
            SourceConfig {
                url_template: "http://127.0.0.1:8080/{product}/{ref}.yaml".to_string(),
                token_env: None,
                ..SourceConfig::default()
            }
        );
    }

    #[test]
    fn test_load_rejects_template_without_ref() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "urlTemplate: https://example.com/charts.yaml\n").unwrap();

        let result = SourceConfig::load_from(&path);
        assert!(matches!(result, Err(RepoError::InvalidConfig { .. })));
    }
}
