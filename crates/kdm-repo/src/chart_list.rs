//! `charts/chart_versions.yaml` as published in a distribution's source tree
//!
//! ```yaml
//! charts:
//!   - version: v3.29.0-build2025040800
//!     filename: /charts/rke2-canal.yaml
//!     bootstrap: true
//! ```

use serde::Deserialize;

use kdm_core::{ChartRecord, ChartSet};

use crate::error::{RepoError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ChartList {
    #[serde(default)]
    pub charts: Vec<ChartListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartListEntry {
    pub version: String,
    /// Path of the chart manifest, e.g. `/charts/rke2-canal.yaml`
    pub filename: String,
}

impl ChartListEntry {
    /// Chart name derived from the manifest path
    pub fn name(&self) -> &str {
        let name = self.filename.strip_suffix(".yaml").unwrap_or(&self.filename);
        name.strip_prefix("/charts/").unwrap_or(name)
    }
}

impl ChartList {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_yaml::from_slice(data).map_err(|e| RepoError::InvalidChartList {
            message: e.to_string(),
        })
    }

    /// Chart set with every chart attributed to `repo_label`
    pub fn into_chart_set(self, repo_label: &str) -> Result<ChartSet> {
        let mut set = ChartSet::new();
        for entry in self.charts {
            let name = entry.name();
            if name.is_empty() {
                return Err(RepoError::InvalidChartList {
                    message: format!("cannot derive a chart name from '{}'", entry.filename),
                });
            }
            if let Some(previous) = set.insert(
                name.to_string(),
                ChartRecord::new(repo_label, entry.version.clone()),
            ) {
                tracing::debug!(
                    "chart {} listed twice, {} replaces {}",
                    name,
                    entry.version,
                    previous.version
                );
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_VERSIONS: &str = r#"charts:
  - version: v3.29.0-build2025040800
    filename: /charts/rke2-canal.yaml
    bootstrap: true
  - version: 1.42.000
    filename: /charts/rke2-coredns.yaml
    bootstrap: true
  - version: 34.2.1
    filename: /charts/rke2-traefik.yaml
    bootstrap: false
"#;

    #[test]
    fn test_parse_chart_list() {
        let set = ChartList::from_bytes(CHART_VERSIONS.as_bytes())
            .unwrap()
            .into_chart_set("rancher-rke2-charts")
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.get("rke2-canal"),
            Some(&ChartRecord::new("rancher-rke2-charts", "v3.29.0-build2025040800"))
        );
        // versions stay strings even when they look numeric
        assert_eq!(set["rke2-coredns"].version, "1.42.000");
    }

    #[test]
    fn test_chart_name_from_filename() {
        let entry = |filename: &str| ChartListEntry {
            version: "1".to_string(),
            filename: filename.to_string(),
        };
        assert_eq!(entry("/charts/rke2-canal.yaml").name(), "rke2-canal");
        assert_eq!(entry("rke2-canal.yaml").name(), "rke2-canal");
        assert_eq!(entry("/charts/.yaml").name(), "");
    }

    #[test]
    fn test_empty_chart_name_rejected() {
        let list = ChartList::from_bytes(b"charts:\n  - version: '1'\n    filename: /charts/.yaml\n")
            .unwrap();
        assert!(matches!(
            list.into_chart_set("repo"),
            Err(RepoError::InvalidChartList { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let result = ChartList::from_bytes(b"charts: [unclosed");
        assert!(matches!(result, Err(RepoError::InvalidChartList { .. })));
    }
}
