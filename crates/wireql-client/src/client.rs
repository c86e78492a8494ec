//! The client facade: composition of transport, cache, retry, and
//! subscriptions.

use std::sync::Arc;

use tracing::{debug, warn};

use wireql_http::HttpTransport;
use wireql_protocol::{
    ClientError, ExecutionError, Request, Response, Transport, TransportError,
};
use wireql_websocket::{SubscriptionConfig, SubscriptionSession};

use crate::cache::{CacheConfig, CacheStats, ResultCache};
use crate::documents;
use crate::entities::{
    Book, book_from_response, books_from_response, created_book_from_response,
};
use crate::retry::RetryPolicy;

/// Inner client state shared by clones.
struct ClientInner<T: Transport> {
    transport: T,
    cache: ResultCache,
    retry: RetryPolicy,
    subscription: Option<SubscriptionConfig>,
}

/// A GraphQL client over any [`Transport`].
///
/// `Client<T>` is cheaply cloneable; all clones share the same transport and
/// result cache. Operations come in three execution flavors (plain,
/// cached, and retried) plus wire-level batching and subscriptions.
///
/// Errors surface unchanged in kind: transport failures as
/// [`TransportError`], semantic GraphQL failures as
/// [`ExecutionError`], and so on. [`execute`](Self::execute) returns the
/// raw envelope even when it carries errors, so callers can observe partial
/// data.
///
/// ```rust,no_run
/// use wireql_client::Client;
/// use wireql_protocol::Request;
///
/// # async fn example() -> wireql_protocol::Result<()> {
/// let client = Client::http("http://localhost:8000/graphql")?;
/// let response = client.execute(&Request::new("{ books { id title } }")).await?;
/// println!("{:?}", response.data);
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client<HttpTransport> {
    /// A client over HTTP with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the endpoint URL is
    /// invalid.
    pub fn http(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self::new(HttpTransport::for_endpoint(endpoint)?))
    }
}

impl<T: Transport> Client<T> {
    /// A client over `transport` with default settings.
    pub fn new(transport: T) -> Self {
        Self::builder(transport).build()
    }

    /// Start configuring a client over `transport`.
    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder {
            transport,
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            subscription: None,
        }
    }

    /// Execute one operation and return the raw envelope.
    ///
    /// The envelope is returned as-is even when `errors` is non-empty, so
    /// partial data stays observable.
    ///
    /// # Errors
    ///
    /// [`TransportError`] when no usable envelope was produced.
    pub async fn execute(&self, request: &Request) -> Result<Response, ClientError> {
        Ok(self.inner.transport.send(request).await?)
    }

    /// Execute one operation through the result cache.
    ///
    /// On a hit the cached envelope is returned without touching the
    /// transport. On a miss the transport is called and the full envelope,
    /// including any GraphQL `errors`, is stored. Nothing is stored when
    /// the transport fails. Concurrent misses for the same key are not
    /// coalesced; they may each reach the transport.
    ///
    /// # Errors
    ///
    /// [`TransportError`] when no usable envelope was produced.
    pub async fn execute_cached(&self, request: &Request) -> Result<Response, ClientError> {
        let key = request.fingerprint();
        if let Some(cached) = self.inner.cache.get(&key) {
            debug!(%key, "result cache hit");
            return Ok(cached);
        }
        debug!(%key, "result cache miss");
        let response = self.inner.transport.send(request).await?;
        self.inner.cache.put(key, response.clone());
        Ok(response)
    }

    /// Execute one operation with up to `max_attempts` transport attempts.
    ///
    /// Only transport-level failures are retried; a received envelope with
    /// non-empty `errors` surfaces immediately as an [`ExecutionError`]
    /// (carrying any partial data) because a semantic server-side error is
    /// not expected to resolve by repetition. On exhaustion the *last*
    /// transport failure is re-raised. Delays between attempts follow the
    /// configured [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// [`ClientError::Configuration`] when `max_attempts` is zero,
    /// [`ExecutionError`] on a semantic failure, or the final
    /// [`TransportError`] once attempts are exhausted.
    pub async fn execute_with_retry(
        &self,
        request: &Request,
        max_attempts: u32,
    ) -> Result<Response, ClientError> {
        if max_attempts == 0 {
            return Err(ClientError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let mut last_error = None;
        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.inner.retry.delay(attempt - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            match self.inner.transport.send(request).await {
                Ok(response) if response.has_errors() => {
                    return Err(ExecutionError::from_envelope(response).into());
                }
                Ok(response) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "transport attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| TransportError::SendFailed("all attempts failed".to_string()))
            .into())
    }

    /// Execute an ordered sequence of operations as one wire-level batch.
    ///
    /// Responses align positionally with `requests`. Requires server-side
    /// batching support; a transport-level failure fails the whole batch
    /// atomically.
    ///
    /// # Errors
    ///
    /// [`TransportError`] when the batch call failed.
    pub async fn execute_batch(&self, requests: &[Request]) -> Result<Vec<Response>, ClientError> {
        Ok(self.inner.transport.send_batch(requests).await?)
    }

    /// Open a subscription session for `request`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Configuration`] when no subscription endpoint is
    /// configured; otherwise whatever
    /// [`SubscriptionSession::connect`] surfaces.
    pub async fn subscribe(&self, request: &Request) -> Result<SubscriptionSession, ClientError> {
        let config = self.inner.subscription.clone().ok_or_else(|| {
            ClientError::Configuration("no subscription endpoint configured".to_string())
        })?;
        SubscriptionSession::connect(config, request).await
    }

    /// Fetch every book with its author.
    ///
    /// # Errors
    ///
    /// [`ExecutionError`] when the server answered with errors and no data.
    pub async fn get_all_books(&self) -> Result<Vec<Book>, ClientError> {
        let response = self.typed(&documents::all_books()).await?;
        books_from_response(&response)
    }

    /// Fetch one book by id; `Ok(None)` when no such book exists.
    ///
    /// # Errors
    ///
    /// [`ExecutionError`] when the server answered with errors and no data.
    pub async fn get_book_by_id(&self, id: i64) -> Result<Option<Book>, ClientError> {
        let response = self.typed(&documents::book_by_id(id)).await?;
        book_from_response(&response)
    }

    /// Create a book and return the server's view of it.
    ///
    /// # Errors
    ///
    /// [`ExecutionError`] when the server answered with errors and no data.
    pub async fn create_book(
        &self,
        title: &str,
        author_id: i64,
        genre: &str,
        published_year: i64,
    ) -> Result<Option<Book>, ClientError> {
        let response = self
            .typed(&documents::create_book(title, author_id, genre, published_year))
            .await?;
        created_book_from_response(&response)
    }

    /// Subscribe to newly added books.
    ///
    /// Each event payload maps with
    /// [`book_from_event`](crate::entities::book_from_event).
    ///
    /// # Errors
    ///
    /// As [`subscribe`](Self::subscribe).
    pub async fn subscribe_book_added(&self) -> Result<SubscriptionSession, ClientError> {
        self.subscribe(&documents::book_added()).await
    }

    /// A snapshot of the result cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    // Typed operations tolerate partial success (data alongside errors) but
    // fail on an errors-only envelope, which has nothing to map.
    async fn typed(&self, request: &Request) -> Result<Response, ClientError> {
        let response = self.execute(request).await?;
        if response.has_errors() && response.data.is_none() {
            return Err(ExecutionError::from_envelope(response).into());
        }
        Ok(response)
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<T: Transport> {
    transport: T,
    cache: CacheConfig,
    retry: RetryPolicy,
    subscription: Option<SubscriptionConfig>,
}

impl<T: Transport> ClientBuilder<T> {
    /// Bound the result cache at `max_entries`.
    #[must_use]
    pub fn cache_capacity(mut self, max_entries: usize) -> Self {
        self.cache.max_entries = max_entries;
        self
    }

    /// Set the delay schedule used by `execute_with_retry`.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Enable subscriptions against `url` with default session settings.
    #[must_use]
    pub fn subscription_endpoint(mut self, url: impl Into<String>) -> Self {
        self.subscription = Some(SubscriptionConfig::new(url));
        self
    }

    /// Enable subscriptions with explicit session settings.
    #[must_use]
    pub fn subscription_config(mut self, config: SubscriptionConfig) -> Self {
        self.subscription = Some(config);
        self
    }

    /// Finish building the client.
    pub fn build(self) -> Client<T> {
        Client {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                cache: ResultCache::new(self.cache),
                retry: self.retry,
                subscription: self.subscription,
            }),
        }
    }
}
