//! The transport seam: one request in, one raw envelope out.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::Request;
use crate::response::Response;

/// A request/response transport to a GraphQL endpoint.
///
/// Implementations translate connection failures and non-2xx statuses into
/// [`TransportError`] so the retry layer can distinguish retryable network
/// failures from semantic GraphQL errors. A transport decodes the envelope
/// but never inspects its `errors` field; that is the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one operation against the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no usable envelope was produced.
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;

    /// Execute an ordered sequence of operations as one wire-level batch.
    ///
    /// The returned envelopes align positionally with `requests`. Batching
    /// requires explicit server-side support, an external precondition the
    /// transport cannot verify. A transport-level failure fails the whole
    /// batch; there are no partial results.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the batch call failed or the response
    /// array does not align with the request array.
    async fn send_batch(&self, requests: &[Request]) -> Result<Vec<Response>, TransportError>;
}
