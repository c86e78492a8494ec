//! # wireql-http
//!
//! HTTP request/response transport for wireql: one POST per operation (or
//! per batch), JSON bodies, standard `{data, errors}` envelopes back.
//!
//! ```rust,no_run
//! use wireql_http::HttpTransport;
//! use wireql_protocol::{Request, Transport};
//!
//! # async fn example() -> wireql_protocol::Result<()> {
//! let transport = HttpTransport::for_endpoint("http://localhost:8000/graphql")?;
//! let response = transport.send(&Request::new("{ books { id title } }")).await
//!     .map_err(wireql_protocol::ClientError::from)?;
//! println!("{:?}", response.data);
//! # Ok(())
//! # }
//! ```

mod transport;

pub use transport::{HttpTransport, HttpTransportConfig};
