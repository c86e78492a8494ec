//! Subscription session configuration.

use std::time::Duration;

use wireql_protocol::ws::DEFAULT_SUBSCRIPTION_ID;

/// Configuration for one subscription session.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// The WebSocket endpoint URL (e.g. `ws://localhost:8000/graphql`).
    pub url: String,

    /// Deadline for connection establishment (socket handshake through
    /// connection acknowledgement). `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,

    /// The session-local subscription id sent on the wire. One subscription
    /// per session, so the fixed default is normally right.
    pub subscription_id: String,

    /// Capacity of the inbound event buffer. Sends from the reader task
    /// apply backpressure when the consumer lags; events are never dropped
    /// or coalesced.
    pub event_buffer: usize,
}

impl SubscriptionConfig {
    /// Configuration for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the connection-establishment deadline.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/graphql".to_string(),
            connect_timeout: Some(Duration::from_secs(10)),
            subscription_id: DEFAULT_SUBSCRIPTION_ID.to_string(),
            event_buffer: 64,
        }
    }
}
