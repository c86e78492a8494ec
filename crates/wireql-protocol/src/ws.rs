//! Wire messages for the `graphql-ws` subscription sub-protocol.
//!
//! All messages travel as JSON text frames, discriminated by a `type` field:
//!
//! | direction | type | payload |
//! |---|---|---|
//! | client→server | `connection_init` | none |
//! | server→client | `connection_ack` | none |
//! | client→server | `start` | `{id, payload: {query, variables}}` |
//! | server→client | `data` | `{id, payload: {data}}` |
//! | server→client | `error` | `{id, payload: errors}` |
//! | server→client | `complete` | `{id}` |
//! | client→server | `stop` | `{id}` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{Request, Variables};
use crate::response::GraphQlError;

/// The negotiated WebSocket sub-protocol name.
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

/// The default session-local subscription id. One subscription per session,
/// so a fixed id is sufficient.
pub const DEFAULT_SUBSCRIPTION_ID: &str = "1";

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open the logical connection after the socket handshake.
    ConnectionInit,
    /// Begin the subscription identified by `id`.
    Start {
        /// Session-local subscription id.
        id: String,
        /// The operation to subscribe with.
        payload: StartPayload,
    },
    /// End the subscription identified by `id`.
    Stop {
        /// Session-local subscription id.
        id: String,
    },
}

/// The operation carried by a `start` message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartPayload {
    /// The subscription document.
    pub query: String,
    /// Operation variables; serialized even when empty.
    pub variables: Variables,
}

impl ClientMessage {
    /// Build the `start` message for `request` under `id`.
    pub fn start(id: impl Into<String>, request: &Request) -> Self {
        Self::Start {
            id: id.into(),
            payload: StartPayload {
                query: request.document.clone(),
                variables: request.variables.clone(),
            },
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_frame(&self) -> Result<String, TransportError> {
        serde_json::to_string(self)
            .map_err(|e| TransportError::SendFailed(format!("encoding frame: {e}")))
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The logical connection is open; the session may start.
    ConnectionAck,
    /// One subscription event.
    Data {
        /// Subscription id the event belongs to.
        id: String,
        /// The event envelope.
        payload: DataPayload,
    },
    /// The subscription failed server-side.
    Error {
        /// Subscription id the failure belongs to.
        id: String,
        /// The error payload; shape varies by server, decoded leniently.
        payload: Value,
    },
    /// Graceful end of the subscription; no further events follow.
    Complete {
        /// Subscription id that completed.
        id: String,
    },
}

/// The envelope carried by a `data` message; events yield its `data` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPayload {
    /// The event data.
    #[serde(default)]
    pub data: Value,
}

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A message type the protocol knows.
    Message(ServerMessage),
    /// A well-formed frame with a message type outside the protocol; the
    /// session decides whether that violates its current state.
    Unknown(String),
}

impl ServerMessage {
    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MalformedResponse`] when the frame is not a
    /// JSON object with a string `type`.
    pub fn decode(frame: &str) -> Result<Decoded, TransportError> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| TransportError::MalformedResponse(format!("frame is not JSON: {e}")))?;
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Err(TransportError::MalformedResponse(
                "frame has no `type` field".to_string(),
            ));
        };
        match serde_json::from_value::<ServerMessage>(value) {
            Ok(message) => Ok(Decoded::Message(message)),
            // A known tag that fails to decode is a malformed frame; an
            // unknown tag is a protocol-level question for the session.
            Err(e) if KNOWN_SERVER_TYPES.contains(&kind.as_str()) => Err(
                TransportError::MalformedResponse(format!("bad `{kind}` frame: {e}")),
            ),
            Err(_) => Ok(Decoded::Unknown(kind)),
        }
    }

    /// The wire `type` of this message.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ConnectionAck => "connection_ack",
            Self::Data { .. } => "data",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }
}

const KNOWN_SERVER_TYPES: &[&str] = &["connection_ack", "data", "error", "complete"];

/// Decode an `error` message payload into the envelope error shape.
///
/// Servers send either a list of error objects or a single one; anything
/// else degrades to one error wrapping the raw payload text.
pub fn errors_from_payload(payload: Value) -> Vec<GraphQlError> {
    match payload {
        Value::Array(items) => items.into_iter().map(one_error).collect(),
        other => vec![one_error(other)],
    }
}

fn one_error(value: Value) -> GraphQlError {
    let fallback = value.to_string();
    serde_json::from_value(value).unwrap_or_else(|_| GraphQlError::message(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn connection_init_frame_shape() {
        assert_eq!(
            ClientMessage::ConnectionInit.to_frame().unwrap(),
            r#"{"type":"connection_init"}"#
        );
    }

    #[test]
    fn start_frame_carries_query_and_variables() {
        let request = Request::new("subscription { bookAdded { id } }").variable("genre", "scifi");
        let frame = ClientMessage::start("1", &request).to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "start",
                "id": "1",
                "payload": {
                    "query": "subscription { bookAdded { id } }",
                    "variables": {"genre": "scifi"}
                }
            })
        );
    }

    #[test]
    fn stop_frame_shape() {
        let frame = ClientMessage::Stop { id: "1".into() }.to_frame().unwrap();
        assert_eq!(frame, r#"{"type":"stop","id":"1"}"#);
    }

    #[test]
    fn decodes_each_server_message() {
        assert_eq!(
            ServerMessage::decode(r#"{"type":"connection_ack"}"#).unwrap(),
            Decoded::Message(ServerMessage::ConnectionAck)
        );
        assert_eq!(
            ServerMessage::decode(r#"{"type":"data","id":"1","payload":{"data":{"n":1}}}"#)
                .unwrap(),
            Decoded::Message(ServerMessage::Data {
                id: "1".into(),
                payload: DataPayload { data: json!({"n": 1}) },
            })
        );
        assert_eq!(
            ServerMessage::decode(r#"{"type":"complete","id":"1"}"#).unwrap(),
            Decoded::Message(ServerMessage::Complete { id: "1".into() })
        );
    }

    #[test]
    fn unknown_type_is_surfaced_not_rejected() {
        assert_eq!(
            ServerMessage::decode(r#"{"type":"ka"}"#).unwrap(),
            Decoded::Unknown("ka".into())
        );
    }

    #[test]
    fn malformed_frames_are_transport_errors() {
        assert!(matches!(
            ServerMessage::decode("not json"),
            Err(TransportError::MalformedResponse(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"id":"1"}"#),
            Err(TransportError::MalformedResponse(_))
        ));
        // Known tag, wrong shape.
        assert!(matches!(
            ServerMessage::decode(r#"{"type":"data"}"#),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    #[test]
    fn error_payload_shapes_decode_leniently() {
        let list = errors_from_payload(json!([{"message": "a"}, {"message": "b"}]));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].message, "a");

        let single = errors_from_payload(json!({"message": "boom"}));
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].message, "boom");

        let odd = errors_from_payload(json!("wat"));
        assert_eq!(odd.len(), 1);
        assert_eq!(odd[0].message, "\"wat\"");
    }
}
