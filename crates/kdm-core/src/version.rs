//! Release version scheme: `vMAJOR.MINOR.PATCH+<product>rBUILD`
//!
//! Distribution releases carry an upstream Kubernetes semver plus a build
//! counter in the metadata, e.g. `v1.33.2+rke2r1`. This module parses and
//! formats that scheme and resolves the release a new version follows.

use std::fmt;

use crate::error::{CoreError, Result};

/// Product used when none is configured
pub const DEFAULT_PRODUCT: &str = "rke2";

/// A parsed distribution release version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Product tag in the build metadata (`rke2`, `k3s`)
    pub product: String,
    /// Build counter within one upstream patch
    pub build: u64,
}

impl ReleaseVersion {
    pub fn new(major: u64, minor: u64, patch: u64, product: impl Into<String>, build: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            product: product.into(),
            build,
        }
    }

    /// Parse a version string for the given product.
    ///
    /// The input must be exactly `v<major>.<minor>.<patch>+<product>r<build>`
    /// with no pre-release part, no leading zeros and nothing trailing.
    pub fn parse(input: &str, product: &str) -> Result<Self> {
        let core = input
            .strip_prefix('v')
            .ok_or_else(|| CoreError::malformed(input, "missing 'v' prefix"))?;

        let parsed =
            semver::Version::parse(core).map_err(|e| CoreError::malformed(input, e.to_string()))?;

        if !parsed.pre.is_empty() {
            return Err(CoreError::malformed(
                input,
                format!("unexpected pre-release '{}'", parsed.pre),
            ));
        }

        let metadata = parsed.build.as_str();
        let build = metadata
            .strip_prefix(product)
            .and_then(|rest| rest.strip_prefix('r'))
            .and_then(parse_build_number)
            .ok_or_else(|| {
                CoreError::malformed(
                    input,
                    format!("expected '+{}r<build>' suffix, got '+{}'", product, metadata),
                )
            })?;

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            product: product.to_string(),
            build,
        })
    }

    /// Resolve the release this version follows.
    ///
    /// Builds within a patch and first builds of a patch are resolved
    /// arithmetically. The first build of a new minor line (`vX.Y.0+...r1`)
    /// follows the newest `vX.(Y-1).*` entry in `history`, which is ordered
    /// oldest first.
    pub fn predecessor<S: AsRef<str>>(&self, history: &[S]) -> Result<Self> {
        if self.build > 1 {
            return Ok(Self {
                build: self.build - 1,
                ..self.clone()
            });
        }

        if self.patch > 0 {
            return Ok(Self {
                patch: self.patch - 1,
                build: 1,
                ..self.clone()
            });
        }

        let Some(prev_minor) = self.minor.checked_sub(1) else {
            return Err(CoreError::NoPredecessor {
                version: self.to_string(),
                reason: "no earlier minor line exists".to_string(),
            });
        };

        history
            .iter()
            .rev()
            .filter_map(|entry| {
                let entry = entry.as_ref();
                match Self::parse(entry, &self.product) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::debug!("skipping history entry {}: {}", entry, e);
                        None
                    }
                }
            })
            .find(|v| v.major == self.major && v.minor == prev_minor)
            .ok_or_else(|| CoreError::NoPredecessor {
                version: self.to_string(),
                reason: format!(
                    "no v{}.{} release recorded in manifest",
                    self.major, prev_minor
                ),
            })
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{}.{}.{}+{}r{}",
            self.major, self.minor, self.patch, self.product, self.build
        )
    }
}

fn parse_build_number(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}
