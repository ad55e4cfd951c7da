//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of categories, each with its
//! own process exit code.

use miette::Diagnostic;
use thiserror::Error;

use kdm_core::CoreError;
use kdm_repo::RepoError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Bad user input: version strings, flags, configuration
    #[error("Invalid input: {message}")]
    #[diagnostic(code(kdm::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Manifest content or structure problem
    #[error("Manifest error: {message}")]
    #[diagnostic(code(kdm::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kdm::cli::io))]
    Io { message: String },

    /// Chart list retrieval failed
    #[error("Network error: {message}")]
    #[diagnostic(code(kdm::cli::network))]
    Network {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(kdm::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Network { .. } => exit_codes::NETWORK_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    fn manifest(message: impl Into<String>, help: Option<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help,
        }
    }

    fn network(message: impl Into<String>, help: Option<String>) -> Self {
        Self::Network {
            message: message.into(),
            help,
        }
    }

    /// Create an IO error for a file operation on `path`
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::MalformedVersion { .. } => CliError::input_with_help(
                message,
                "release versions look like v1.33.2+rke2r1 (see --product)",
            ),
            CoreError::ReleaseNotFound { .. } => CliError::manifest(
                message,
                Some(
                    "list releases in the order they were published so each one's predecessor \
                     is added first"
                        .to_string(),
                ),
            ),
            CoreError::DuplicateRelease { .. } => CliError::manifest(
                message,
                Some("the release is already in the manifest".to_string()),
            ),
            CoreError::NoPredecessor { .. }
            | CoreError::ManifestParse { .. }
            | CoreError::InvalidRelease { .. }
            | CoreError::DuplicateAnchor { .. }
            | CoreError::Yaml(_) => CliError::manifest(message, None),
            CoreError::ChartFetch { source, .. } => {
                let help = source
                    .downcast_ref::<RepoError>()
                    .and_then(network_help);
                CliError::network(message, help)
            }
            CoreError::Io(e) => CliError::from(e),
            CoreError::Encode { .. } => CliError::internal(message),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match &err {
            RepoError::InvalidUrl { .. }
            | RepoError::InvalidConfig { .. }
            | RepoError::Serialization(_) => CliError::input(message),
            RepoError::Io(_) => CliError::Io { message },
            _ => {
                let help = network_help(&err);
                CliError::network(message, help)
            }
        }
    }
}

fn network_help(err: &RepoError) -> Option<String> {
    match err {
        RepoError::RateLimited { .. } | RepoError::AuthRequired { .. } => Some(
            "set GITHUB_TOKEN (or the variable named by tokenEnv in the config) to authenticate"
                .to_string(),
        ),
        RepoError::ChartListNotFound { .. } => {
            Some("check that the release has been tagged upstream".to_string())
        }
        _ => None,
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_exit_codes() {
        let malformed = CliError::from(CoreError::MalformedVersion {
            version: "1.33.0".to_string(),
            reason: "missing 'v' prefix".to_string(),
        });
        assert_eq!(malformed.exit_code(), exit_codes::INPUT_ERROR);

        let missing = CliError::from(CoreError::ReleaseNotFound {
            version: "v1.33.1+rke2r1".to_string(),
        });
        assert_eq!(missing.exit_code(), exit_codes::MANIFEST_ERROR);

        let fetch = CliError::from(CoreError::ChartFetch {
            reference: "v1.33.1+rke2r1".to_string(),
            source: Box::new(RepoError::RateLimited { retry_after: 60 }),
        });
        assert_eq!(fetch.exit_code(), exit_codes::NETWORK_ERROR);
        assert!(matches!(fetch, CliError::Network { help: Some(_), .. }));

        let io = CliError::from(CoreError::Io(std::io::Error::other("denied")));
        assert_eq!(io.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_repo_error_exit_codes() {
        let config = CliError::from(RepoError::InvalidConfig {
            message: "bad".to_string(),
        });
        assert_eq!(config.exit_code(), exit_codes::INPUT_ERROR);

        let timeout = CliError::from(RepoError::Timeout { seconds: 30 });
        assert_eq!(timeout.exit_code(), exit_codes::NETWORK_ERROR);
    }
}
