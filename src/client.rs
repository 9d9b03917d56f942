//! Transport to the external search endpoint.
//!
//! The controller talks to the endpoint through the [`SearchClient`] trait so
//! that hosts and tests can substitute their own transport. The production
//! implementation, [`HttpSearchClient`], sends the raw term as the body of a
//! `POST` and decodes the JSON reply according to the endpoint kind.
//!
//! There is no retry logic here: a failed request is reported once and the
//! controller shows it on the page.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::models::{EndpointKind, SearchResponse};

/// Something that can answer a search term with a [`SearchResponse`].
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Send `term` to the endpoint and decode the reply.
    ///
    /// `term` is never empty; the controller filters empty terms out.
    async fn search(&self, term: &str) -> Result<SearchResponse>;
}

/// [`SearchClient`] backed by `reqwest`.
pub struct HttpSearchClient {
    client: reqwest::Client,
    url: Url,
    kind: EndpointKind,
}

impl HttpSearchClient {
    /// Create a client for the configured endpoint.
    ///
    /// The endpoint path (`predict` or `search`) is resolved against
    /// `endpoint.base_url` when set, otherwise against `page_url`.
    pub fn new(endpoint: &EndpointConfig, page_url: &Url) -> Result<Self> {
        let base = match &endpoint.base_url {
            Some(base) => Url::parse(base)
                .with_context(|| format!("Invalid endpoint base URL: {}", base))?,
            None => page_url.clone(),
        };
        let url = base
            .join(endpoint.kind.path())
            .with_context(|| format!("Cannot resolve '{}' against {}", endpoint.kind, base))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url,
            kind: endpoint.kind,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, term: &str) -> Result<SearchResponse> {
        debug!(url = %self.url, term, "POST search term");

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(term.to_string())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Search endpoint error {}: {}", status, body_text.trim());
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response from {}", self.url))?;

        SearchResponse::parse(self.kind, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base_url: Option<&str>, kind: EndpointKind) -> EndpointConfig {
        EndpointConfig {
            base_url: base_url.map(str::to_string),
            kind,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_resolves_against_page_url() {
        let page = Url::parse("http://localhost:8080/whence/?search=cat").unwrap();
        let client = HttpSearchClient::new(&endpoint(None, EndpointKind::Search), &page).unwrap();
        assert_eq!(client.url().as_str(), "http://localhost:8080/whence/search");
        assert_eq!(client.kind(), EndpointKind::Search);
    }

    #[test]
    fn test_resolves_against_base_url() {
        let page = Url::parse("http://localhost/ignored/").unwrap();
        let client = HttpSearchClient::new(
            &endpoint(Some("https://snerge.example/predict/"), EndpointKind::Predict),
            &page,
        )
        .unwrap();
        assert_eq!(client.url().as_str(), "https://snerge.example/predict/predict");
    }

    #[test]
    fn test_invalid_base_url() {
        let page = Url::parse("http://localhost/").unwrap();
        let result = HttpSearchClient::new(&endpoint(Some("::nope"), EndpointKind::Search), &page);
        assert!(result.is_err());
    }
}
