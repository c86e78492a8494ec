//! The reqwest-backed transport.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, header};
use tracing::{debug, warn};
use url::Url;

use wireql_protocol::{ClientError, Request, Response, Transport, TransportError};

/// HTTP transport configuration.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// The GraphQL endpoint URL (e.g. `http://localhost:8000/graphql`).
    pub endpoint: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Headers applied to every request. Per-call request headers override
    /// these on collision.
    pub headers: HashMap<String, String>,

    /// User agent string (set to `None` to disable the User-Agent header).
    pub user_agent: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/graphql".to_string(),
            timeout: Duration::from_secs(30),
            headers: HashMap::new(),
            user_agent: Some(format!("wireql/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// HTTP request/response transport.
///
/// Sends each operation as `POST {query, variables?}` and decodes the
/// standard envelope. Non-2xx statuses and connection failures surface as
/// distinguished [`TransportError`] variants; the `errors` field of a
/// decoded envelope is never inspected here.
pub struct HttpTransport {
    config: HttpTransportConfig,
    endpoint: Url,
    http: ReqwestClient,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the endpoint URL is
    /// invalid or the HTTP client cannot be constructed.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ClientError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ClientError::Configuration(format!("invalid endpoint `{}`: {e}", config.endpoint))
        })?;

        let mut builder = ReqwestClient::builder().timeout(config.timeout);
        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("building HTTP client: {e}")))?;

        Ok(Self {
            config,
            endpoint,
            http,
        })
    }

    /// Create a transport for `endpoint` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the endpoint URL is
    /// invalid.
    pub fn for_endpoint(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(HttpTransportConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Assemble headers for one call: configured headers first, then
    /// per-call headers. Invalid names/values are skipped rather than
    /// failing the call.
    fn build_headers(&self, request_headers: &HashMap<String, String>) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        for (key, value) in self.config.headers.iter().chain(request_headers) {
            match (
                header::HeaderName::from_bytes(key.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("skipping invalid header `{key}`"),
            }
        }
        headers
    }

    async fn post_envelope<B, T>(&self, operation: &str, body: &B, headers: header::HeaderMap) -> Result<T, TransportError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                message: truncate(message, 512),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }

    fn map_send_error(&self, operation: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                operation: operation.to_string(),
                timeout: self.config.timeout,
            }
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else if err.is_request() || err.is_body() {
            TransportError::SendFailed(err.to_string())
        } else {
            TransportError::ReceiveFailed(err.to_string())
        }
    }
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let cut = (0..=max).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        debug!(endpoint = %self.config.endpoint, "executing GraphQL operation");
        let headers = self.build_headers(&request.headers);
        self.post_envelope("execute", request, headers).await
    }

    async fn send_batch(&self, requests: &[Request]) -> Result<Vec<Response>, TransportError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            endpoint = %self.config.endpoint,
            count = requests.len(),
            "executing GraphQL batch"
        );

        let headers = self.build_headers(&HashMap::new());
        let responses: Vec<Response> = self.post_envelope("execute_batch", requests, headers).await?;

        if responses.len() != requests.len() {
            return Err(TransportError::MalformedResponse(format!(
                "batch of {} requests answered with {} envelopes",
                requests.len(),
                responses.len()
            )));
        }
        Ok(responses)
    }
}
