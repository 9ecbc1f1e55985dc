use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use uast_dev_mappings::MappingSource;
use uast_dev_protocol::{
    baseline_path, BaselinePayload, CatalogPayload, ParseRequest, ParseResponse, QueryRequest,
    QueryResponse, TransportError, CATALOG_PATH, PARSE_PATH, QUERY_PATH,
};
use uast_dev_session::{ParserService, QueryService};

pub const DEFAULT_SERVER: &str = "http://localhost:8080";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Development server client. One instance serves as mapping source, parser and query engine.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::new(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, TransportError> {
        let url = self.url(path);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| request_failed(&url, &err))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(|err| status_error(&err))?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|err| TransportError::new(format!("Invalid response from {url}: {err}")))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {url}");
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| request_failed(&url, &err))?
            .error_for_status()
            .map_err(|err| status_error(&err))?
            .json()
            .await
            .map_err(|err| TransportError::new(format!("Invalid response from {url}: {err}")))
    }
}

fn request_failed(url: &str, err: &reqwest::Error) -> TransportError {
    TransportError::new(format!("Request to {url} failed: {err}"))
}

fn status_error(err: &reqwest::Error) -> TransportError {
    match err.status() {
        Some(status) => TransportError::new(format!("HTTP error! status: {}", status.as_u16())),
        None => TransportError::new(err.to_string()),
    }
}

#[async_trait]
impl MappingSource for HttpBackend {
    async fn fetch_catalog(&self) -> Result<CatalogPayload, TransportError> {
        self.get_json(CATALOG_PATH)
            .await?
            .ok_or_else(|| TransportError::new("HTTP error! status: 404"))
    }

    async fn fetch_baseline(&self, language: &str) -> Result<Option<BaselinePayload>, TransportError> {
        self.get_json(&baseline_path(language)).await
    }
}

#[async_trait]
impl ParserService for HttpBackend {
    async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, TransportError> {
        self.post_json(PARSE_PATH, &request).await
    }
}

#[async_trait]
impl QueryService for HttpBackend {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, TransportError> {
        self.post_json(QUERY_PATH, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:8080/").unwrap();
        assert_eq!(backend.base_url(), DEFAULT_SERVER);
        assert_eq!(backend.url(PARSE_PATH), "http://localhost:8080/api/parse");
    }
}
