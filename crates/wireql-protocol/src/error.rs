//! Error taxonomy for the client execution core.
//!
//! Four kinds of failure are kept distinct so that callers (and the retry
//! layer) can react to each appropriately:
//!
//! - [`TransportError`]: the request never produced a usable envelope
//!   (connection failure, non-2xx status, malformed frame). Retryable.
//! - [`ExecutionError`]: a well-formed envelope arrived carrying a
//!   non-empty `errors` sequence. Not retried; repetition is not expected
//!   to resolve a semantic server-side error.
//! - [`ProtocolViolation`]: a subscription received a message type that is
//!   invalid for its current state. Fatal to that session only.
//! - [`EncodingError`]: caller-supplied values could not be serialized to
//!   the canonical form, or a typed mapping met an incompatible shape.
//!
//! No layer below the retry policy swallows an error; everything surfaces
//! at the call that produced it, unchanged in kind.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::response::{GraphQlError, Response};

/// A specialized `Result` type for client operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Represents failures below the GraphQL layer: the request did not produce
/// a usable response envelope.
///
/// These are the only errors the retry policy considers retryable.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection (refused, DNS failure, TLS failure).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost before the operation finished.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to send a request or frame.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a response or frame.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The endpoint answered with a non-2xx HTTP status.
    #[error("endpoint returned HTTP {status}: {message}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// Response body, best effort.
        message: String,
    },

    /// The response could not be decoded as a GraphQL envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The operation did not complete within the configured deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// A well-formed response envelope carrying a non-empty `errors` sequence.
///
/// Any partial `data` the server produced alongside the errors is preserved,
/// so callers can still observe partial success.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "GraphQL execution failed: {}",
    .errors.first().map_or("unknown error", |e| e.message.as_str())
)]
pub struct ExecutionError {
    /// The ordered error sequence from the envelope.
    pub errors: Vec<GraphQlError>,
    /// Partial data, if the server produced any alongside the errors.
    pub partial_data: Option<Value>,
}

impl ExecutionError {
    /// Tear down an envelope known to carry errors into an execution error.
    pub fn from_envelope(response: Response) -> Self {
        Self {
            errors: response.errors,
            partial_data: response.data,
        }
    }
}

/// A subscription session received a message type that is invalid for its
/// current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("protocol violation while {state}: unexpected `{received}` message")]
pub struct ProtocolViolation {
    /// The session state at the time the message arrived.
    pub state: String,
    /// The wire `type` of the offending message.
    pub received: String,
}

impl ProtocolViolation {
    /// Create a violation record for a message type invalid in `state`.
    pub fn new(state: impl Into<String>, received: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            received: received.into(),
        }
    }
}

/// Caller-supplied values could not be serialized to the canonical form,
/// or a typed mapping met an incompatible shape.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EncodingError {
    /// Variables must serialize to a JSON object.
    #[error("variables must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Serialization or typed deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The unified error type surfaced by every client operation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// Transport-level failure; see [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// GraphQL-level failure; see [`ExecutionError`].
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Subscription protocol violation; see [`ProtocolViolation`].
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// Encoding failure; see [`EncodingError`].
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The client was asked to do something it was not configured for.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether retrying the operation could plausibly succeed.
    ///
    /// Only transport-level failures qualify; a semantic GraphQL error is
    /// not expected to resolve by repetition.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
