use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Why a sheet fetch produced no text. Callers keep whatever posts they
/// already had when they see one of these.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to sheet export failed")]
    Network(#[source] reqwest::Error),
    #[error("sheet export answered with status {0}")]
    Status(StatusCode),
    #[error("failed to read sheet export body")]
    Body(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_agent: format!("recruit-board/{}", crate::VERSION),
            timeout: DEFAULT_TIMEOUT,
            http_client: None,
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("sheet client user agent required");
        }
        let url = Url::parse(config.url.trim())
            .with_context(|| format!("parse sheet url {:?}", config.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("sheet url must use http or https, got {}", url.scheme());
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("build sheet HTTP client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Downloads the CSV export as text.
    pub fn fetch_csv(&self) -> Result<String, FetchError> {
        debug!(url = %self.url, "fetching sheet export");
        let response = self
            .http
            .get(self.url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/csv, text/plain;q=0.9, */*;q=0.1")
            .send()
            .map_err(|err| {
                warn!(error = %err, "sheet request failed");
                FetchError::Network(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "sheet export returned non-success status");
            return Err(FetchError::Status(status));
        }

        let text = response.text().map_err(FetchError::Body)?;
        info!(bytes = text.len(), "fetched sheet export");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        let err = Client::new(ClientConfig {
            url: "file:///etc/passwd".into(),
            ..ClientConfig::default()
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(Client::new(ClientConfig {
            url: "not a url".into(),
            ..ClientConfig::default()
        })
        .is_err());
    }

    #[test]
    fn rejects_blank_user_agent() {
        assert!(Client::new(ClientConfig {
            url: "https://example.com/pub?output=csv".into(),
            user_agent: "  ".into(),
            ..ClientConfig::default()
        })
        .is_err());
    }

    #[test]
    fn accepts_published_sheet_url() {
        let client = Client::new(ClientConfig {
            url: " https://docs.google.com/spreadsheets/d/e/x/pub?output=csv ".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.url().host_str(), Some("docs.google.com"));
    }

    #[test]
    fn status_error_is_distinguishable() {
        let err = FetchError::Status(StatusCode::NOT_FOUND);
        assert!(matches!(err, FetchError::Status(code) if code == StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("404"));
    }
}
