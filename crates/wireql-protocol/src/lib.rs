//! # wireql-protocol
//!
//! Foundation layer for the wireql GraphQL client: the wire-level data
//! model, the error taxonomy, cache-key derivation, and the [`Transport`]
//! trait that concrete transports implement.
//!
//! A GraphQL operation is carried as an opaque document string plus a
//! variables mapping; this crate never parses documents. The response is
//! the standard `{data, errors}` envelope, modeled so that partial success
//! (data alongside errors) stays observable by callers.
//!
//! ## Layering
//!
//! ```text
//! wireql-client          (facade: cache, retry, typed entities)
//!        ↓
//! wireql-http / wireql-websocket   (transports)
//!        ↓
//! wireql-protocol        (this crate)
//! ```

pub mod error;
pub mod fingerprint;
pub mod request;
pub mod response;
pub mod transport;
pub mod ws;

pub use error::{
    ClientError, EncodingError, ExecutionError, ProtocolViolation, Result, TransportError,
};
pub use fingerprint::{Fingerprint, canonical_json};
pub use request::{Request, Variables};
pub use response::{GraphQlError, PathSegment, Response};
pub use transport::Transport;
