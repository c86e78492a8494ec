//! # wireql-websocket
//!
//! The subscription side of wireql: a [`SubscriptionSession`] turns one
//! persistent `graphql-ws` connection into an ordered, single-use stream of
//! event payloads.
//!
//! A session owns exactly one underlying connection for its lifetime and is
//! not restartable; a new subscription requires a new session.
//!
//! ```rust,no_run
//! use wireql_websocket::{SubscriptionConfig, SubscriptionSession};
//! use wireql_protocol::Request;
//!
//! # async fn example() -> wireql_protocol::Result<()> {
//! let config = SubscriptionConfig::new("ws://localhost:8000/graphql");
//! let request = Request::new("subscription { bookAdded { id title } }");
//! let mut session = SubscriptionSession::connect(config, &request).await?;
//!
//! while let Some(event) = session.next_event().await {
//!     println!("book added: {:?}", event?);
//! }
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod session;

pub use config::SubscriptionConfig;
pub use session::{SessionState, SubscriptionSession};
