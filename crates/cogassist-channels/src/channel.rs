//! The closed channel set clients can subscribe to.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Events,
    Status,
    Notifications,
    Queue,
    Discussion,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Events => "events",
            Channel::Status => "status",
            Channel::Notifications => "notifications",
            Channel::Queue => "queue",
            Channel::Discussion => "discussion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "events" => Some(Channel::Events),
            "status" => Some(Channel::Status),
            "notifications" => Some(Channel::Notifications),
            "queue" => Some(Channel::Queue),
            "discussion" => Some(Channel::Discussion),
            _ => None,
        }
    }

    /// Only `discussion` is keyed by a room id.
    pub fn requires_room(&self) -> bool {
        matches!(self, Channel::Discussion)
    }
}

/// A client's subscription key: channel plus, for `discussion`, a room id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub channel: Channel,
    pub room_id: Option<String>,
}

impl SubscriptionKey {
    pub fn new(channel: Channel, room_id: Option<String>) -> Self {
        Self { channel, room_id }
    }
}
