//! HTTP client with origin-scoped authentication
//!
//! Key security features:
//! - The token is only ever sent to the origin it was configured for
//! - Redirects are followed manually so credentials never leak cross-origin

use std::time::Duration;

use url::Url;

use crate::error::{RepoError, Result};

const MAX_REDIRECTS: u32 = 10;

/// Bearer token bound to one origin
#[derive(Clone)]
pub struct ScopedToken {
    origin: Url,
    token: String,
}

impl ScopedToken {
    pub fn new(origin: &Url, token: impl Into<String>) -> Self {
        Self {
            origin: origin.clone(),
            token: token.into(),
        }
    }

    fn header_for(&self, url: &Url) -> Option<String> {
        same_origin(&self.origin, url).then(|| format!("Bearer {}", self.token))
    }
}

impl std::fmt::Debug for ScopedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedToken")
            .field("origin", &self.origin.origin().ascii_serialization())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Check whether two URLs share scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host() == b.host()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Secure HTTP client wrapper with redirect protection
#[derive(Debug)]
pub struct SecureHttpClient {
    client: reqwest::Client,
    token: Option<ScopedToken>,
    timeout: Duration,
}

impl SecureHttpClient {
    /// Create a new secure HTTP client
    pub fn new(token: Option<ScopedToken>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            // redirects are handled manually to keep the token on its origin
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent(concat!("kdm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            token,
            timeout,
        })
    }

    /// Fetch a URL, following up to ten redirects
    pub async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let mut current = url.clone();
        let mut redirects = 0;

        loop {
            let mut request = self.client.get(current.clone());

            match self.token.as_ref().map(|t| t.header_for(&current)) {
                Some(Some(auth)) => request = request.header("Authorization", auth),
                Some(None) => tracing::warn!(
                    "Cross-origin request to {} - credentials not forwarded",
                    current
                ),
                None => {}
            }

            tracing::debug!("GET {}", current);
            let response = request.send().await.map_err(|e| self.map_error(e))?;
            let status = response.status();

            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(RepoError::NetworkError {
                        message: format!("Too many redirects (max {})", MAX_REDIRECTS),
                    });
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RepoError::NetworkError {
                        message: "Redirect without Location header".to_string(),
                    })?;

                current = current.join(location)?;
                continue;
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                return Err(RepoError::RateLimited { retry_after });
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(RepoError::AuthRequired {
                    url: current.to_string(),
                });
            }
            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(RepoError::AuthFailed {
                    message: format!("Access denied to {}", current),
                });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RepoError::HttpError {
                    status: status.as_u16(),
                    message: format!("Request to {} failed: {}", current, body.trim()),
                });
            }

            return Ok(response);
        }
    }

    /// Fetch bytes from URL
    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok(bytes.to_vec())
    }

    fn map_error(&self, e: reqwest::Error) -> RepoError {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            RepoError::from(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(
            &url("https://example.com/foo"),
            &url("https://example.com/bar")
        ));
        assert!(same_origin(
            &url("https://example.com:443/foo"),
            &url("https://example.com/bar")
        ));
        assert!(!same_origin(
            &url("https://example.com/foo"),
            &url("https://other.com/bar")
        ));
        assert!(!same_origin(
            &url("https://example.com/foo"),
            &url("http://example.com/bar")
        ));
        assert!(!same_origin(
            &url("https://example.com/foo"),
            &url("https://example.com:8443/bar")
        ));
    }

    #[test]
    fn test_token_scoped_to_origin() {
        let token = ScopedToken::new(&url("https://raw.githubusercontent.com/rancher"), "secret");

        assert_eq!(
            token
                .header_for(&url("https://raw.githubusercontent.com/rancher/rke2/x"))
                .as_deref(),
            Some("Bearer secret")
        );
        assert!(token.header_for(&url("https://objects.example.com/x")).is_none());
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let token = ScopedToken::new(&url("https://example.com"), "secret");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("https://example.com"));
    }
}
