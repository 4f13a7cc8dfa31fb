//! Wire frame shapes exchanged with connected clients. Inbound frames are
//! tagged by `type`; outbound frames set a `channel`/`timestamp` envelope in
//! [`OutboundFrame::broadcast`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Auth { token: String },
    Ping,
    Subscribe {
        channel: String,
        #[serde(default)]
        room_id: Option<String>,
    },
    Unsubscribe {
        channel: String,
        #[serde(default)]
        room_id: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Authenticated,
    Connected { client_id: String },
    Subscribed { channel: String, room_id: Option<String> },
    Unsubscribed { channel: String, room_id: Option<String> },
    Pong,
    Error { code: String, message: String },
}

impl OutboundFrame {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A channel broadcast payload: the domain message plus the envelope the
/// spec requires on every fan-out (`channel`, optional `room_id`, `timestamp`).
#[derive(Debug, Clone, Serialize)]
pub struct ChannelBroadcast {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub message: Value,
}

impl ChannelBroadcast {
    pub fn new(channel: &str, room_id: Option<String>, message: Value) -> Self {
        Self {
            channel: channel.to_string(),
            room_id,
            timestamp: Utc::now(),
            message,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The four queue-channel event shapes named in the spec, each already
/// sanitized to UI-relevant fields by the caller (never the full analysis
/// blob).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    ItemAdded { item: Value },
    ItemUpdated {
        item: Value,
        changes: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_state: Option<Value>,
    },
    ItemRemoved {
        item_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    StatsUpdated { stats: Value },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_frame_parses_from_json() {
        let frame: InboundFrame = serde_json::from_str(r#"{"type":"auth","token":"abc"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Auth { token } if token == "abc"));
    }

    #[test]
    fn subscribe_frame_parses_with_optional_room() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"type":"subscribe","channel":"discussion","room_id":"r1"}"#).unwrap();
        match frame {
            InboundFrame::Subscribe { channel, room_id } => {
                assert_eq!(channel, "discussion");
                assert_eq!(room_id.as_deref(), Some("r1"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn broadcast_envelope_carries_channel_and_timestamp() {
        let broadcast = ChannelBroadcast::new("events", None, serde_json::json!({"kind": "processing_event"}));
        let json = broadcast.to_json();
        assert!(json.contains("\"channel\":\"events\""));
        assert!(json.contains("\"timestamp\""));
    }
}
