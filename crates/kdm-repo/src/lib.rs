//! Remote chart lists for kdm
//!
//! Every distribution release publishes `charts/chart_versions.yaml` in its
//! source tree. [`HttpChartSource`] downloads that file for a release ref and
//! implements [`kdm_core::ChartSource`] on top of it.
//!
//! Features:
//! - Configurable URL template and repository label
//! - Bearer token sent to the chart list origin only
//! - Manual redirect handling and rate-limit reporting

pub mod chart_list;
pub mod client;
pub mod config;
pub mod error;
pub mod source;

pub use chart_list::{ChartList, ChartListEntry};
pub use client::{ScopedToken, SecureHttpClient, same_origin};
pub use config::{DEFAULT_REPO_LABEL, DEFAULT_TOKEN_ENV, DEFAULT_URL_TEMPLATE, SourceConfig};
pub use error::{RepoError, Result};
pub use source::HttpChartSource;
