//! Core error types

use thiserror::Error;

/// Boxed error returned by external collaborators such as chart sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed version '{version}': {reason}")]
    MalformedVersion { version: String, reason: String },

    #[error("No predecessor for {version}: {reason}")]
    NoPredecessor { version: String, reason: String },

    /// `line` is 1-based; 0 for document-level problems
    #[error("Invalid manifest{}: {message}", at_line(.line))]
    ManifestParse { line: usize, message: String },

    #[error("Release not found in manifest: {version}")]
    ReleaseNotFound { version: String },

    #[error("Release already present in manifest: {version}")]
    DuplicateRelease { version: String },

    #[error("Invalid release entry {version}: {message}")]
    InvalidRelease { version: String, message: String },

    #[error("Reference name already used in manifest: {name}")]
    DuplicateAnchor { name: String },

    #[error("Failed to fetch charts for {reference}: {source}")]
    ChartFetch {
        reference: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to encode manifest: {message}")]
    Encode { message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ManifestParse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(version: &str, reason: impl Into<String>) -> Self {
        Self::MalformedVersion {
            version: version.to_string(),
            reason: reason.into(),
        }
    }
}

fn at_line(line: &usize) -> String {
    match line {
        0 => String::new(),
        n => format!(" (line {})", n),
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
