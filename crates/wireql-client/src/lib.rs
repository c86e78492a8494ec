//! # wireql-client
//!
//! The application-facing facade of wireql: execute GraphQL operations over
//! a pluggable transport, with a bounded LRU result cache, bounded
//! retry-on-transport-failure, wire-level batching, `graphql-ws`
//! subscriptions, and a typed view of the book catalog.
//!
//! ## Execution flavors
//!
//! - [`Client::execute`]: one transport call, raw envelope back (partial
//!   success observable).
//! - [`Client::execute_cached`]: fingerprint-keyed LRU cache in front of
//!   the transport.
//! - [`Client::execute_with_retry`]: bounded retry of transport failures;
//!   semantic GraphQL errors are never retried.
//! - [`Client::execute_batch`]: ordered wire-level batch, atomic failure.
//! - [`Client::subscribe`]: persistent subscription session.
//!
//! ```rust,no_run
//! use wireql_client::Client;
//!
//! # async fn example() -> wireql_protocol::Result<()> {
//! let client = Client::http("http://localhost:8000/graphql")?;
//! for book in client.get_all_books().await? {
//!     println!("{} ({})", book.title, book.genre.as_deref().unwrap_or("unknown"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod client;
pub mod documents;
pub mod entities;
mod retry;

pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use client::{Client, ClientBuilder};
pub use entities::{
    Author, Book, book_from_event, book_from_response, books_from_response,
    created_book_from_response,
};
pub use retry::RetryPolicy;

// Re-export the pieces applications typically need alongside the client.
pub use wireql_http::{HttpTransport, HttpTransportConfig};
pub use wireql_protocol::{
    ClientError, ExecutionError, Fingerprint, GraphQlError, Request, Response, Result, Transport,
    TransportError, Variables,
};
pub use wireql_websocket::{SessionState, SubscriptionConfig, SubscriptionSession};
