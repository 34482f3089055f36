//! Transport client: the single seam between orchestration and the network.
//!
//! Every backend call goes through [`HttpBackend::send`], which attaches the
//! JSON content type, maps non-2xx statuses to a detail-carrying
//! [`TransportError`], and reports unparseable bodies as malformed.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use newsdesk_core::config::BackendConfig;
use newsdesk_core::error::TransportError;
use newsdesk_core::types::{
    AutocompleteRequest, AutocompleteResponse, ChatRequest, ChatResponse, ClearSessionResponse,
    ErrorDetail, HealthReport, SearchRequest, SearchResults, SessionId,
};

/// The retrieval backend as seen by the orchestration layer.
///
/// Implemented over HTTP by [`HttpBackend`]; tests substitute scripted
/// implementations to control response timing.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn autocomplete(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<AutocompleteResponse, TransportError>;

    async fn search(&self, query: &str, top_k: usize) -> Result<SearchResults, TransportError>;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    async fn clear_session(&self, id: &SessionId) -> Result<ClearSessionResponse, TransportError>;

    async fn health(&self) -> Result<HealthReport, TransportError>;
}

/// JSON-over-HTTP implementation of [`Backend`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client bounded by the configured request timeout.
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and decode the JSON response body.
    pub async fn send<T, B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                TransportError::malformed(format!("failed to encode request for {endpoint}: {e}"))
            })?;
            request = request.body(bytes);
        }

        tracing::trace!(%method, %url, "Sending backend request");

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("request to {endpoint} timed out")
            } else {
                format!("request to {endpoint} failed: {e}")
            };
            tracing::debug!(endpoint, error = %e, "Backend unreachable");
            TransportError::network(message)
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorDetail>()
                .await
                .ok()
                .and_then(|d| d.detail);
            tracing::debug!(endpoint, status = status.as_u16(), "Backend returned error status");
            return Err(TransportError::backend(status.as_u16(), detail));
        }

        let bytes = response.bytes().await.map_err(|e| {
            TransportError::network(format!("failed to read response from {endpoint}: {e}"))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TransportError::malformed(format!("unexpected response from {endpoint}: {e}"))
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn autocomplete(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<AutocompleteResponse, TransportError> {
        let body = AutocompleteRequest {
            query: query.to_string(),
            top_k: Some(top_k),
        };
        self.send("/autocomplete", Method::POST, Some(&body)).await
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<SearchResults, TransportError> {
        let body = SearchRequest {
            query: query.to_string(),
            top_k: Some(top_k),
        };
        self.send("/search", Method::POST, Some(&body)).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        self.send("/chat", Method::POST, Some(request)).await
    }

    async fn clear_session(&self, id: &SessionId) -> Result<ClearSessionResponse, TransportError> {
        let endpoint = format!("/clear_session/{id}");
        self.send(&endpoint, Method::DELETE, None::<&()>).await
    }

    async fn health(&self) -> Result<HealthReport, TransportError> {
        self.send("/health", Method::GET, None::<&()>).await
    }
}
