//! Remote chart source
//!
//! Downloads the chart list a release publishes in its source tree and
//! turns it into a [`ChartSet`] for the manifest editor.

use std::time::Duration;

use async_trait::async_trait;
use kdm_core::{BoxError, ChartSet, ChartSource};

use crate::chart_list::ChartList;
use crate::client::{ScopedToken, SecureHttpClient};
use crate::config::SourceConfig;
use crate::error::{RepoError, Result};

/// Chart source backed by the distribution's published chart lists
#[derive(Debug)]
pub struct HttpChartSource {
    config: SourceConfig,
    product: String,
    client: SecureHttpClient,
}

impl HttpChartSource {
    /// Create a source for `product`, picking up the configured token
    pub fn new(config: SourceConfig, product: impl Into<String>) -> Result<Self> {
        let token = config.token();
        Self::with_token(config, product, token)
    }

    /// Create a source with an explicit token (or none)
    pub fn with_token(
        config: SourceConfig,
        product: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self> {
        config.validate()?;
        let product = product.into();

        let scoped = match token {
            Some(token) => {
                let origin = config.chart_list_url(&product, "")?;
                Some(ScopedToken::new(&origin, token))
            }
            None => None,
        };
        let client =
            SecureHttpClient::new(scoped, Duration::from_secs(config.timeout_seconds))?;

        Ok(Self {
            config,
            product,
            client,
        })
    }

    /// Fetch and decode the chart list of `release_ref`
    pub async fn chart_set(&self, release_ref: &str) -> Result<ChartSet> {
        let url = self.config.chart_list_url(&self.product, release_ref)?;

        let data = match self.client.get_bytes(&url).await {
            Err(RepoError::HttpError { status: 404, .. }) => {
                return Err(RepoError::ChartListNotFound {
                    reference: release_ref.to_string(),
                    url: url.to_string(),
                });
            }
            other => other?,
        };

        let set = ChartList::from_bytes(&data)?.into_chart_set(&self.config.repo_label)?;
        tracing::debug!("fetched {} charts for {}", set.len(), release_ref);
        Ok(set)
    }
}

#[async_trait]
impl ChartSource for HttpChartSource {
    async fn fetch_chart_set(&self, release_ref: &str) -> std::result::Result<ChartSet, BoxError> {
        Ok(self.chart_set(release_ref).await?)
    }
}
