//! C10: the channel manager. Registers connected clients, tracks their
//! subscriptions, and fans broadcasts out to the matching sockets.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cogassist_core::config::ChannelsConfig;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::channel::{Channel, SubscriptionKey};
use crate::error::{ChannelError, ChannelResult};
use crate::frame::ChannelBroadcast;
use crate::rate_limit::RateLimiter;

struct ClientEntry {
    user_id: String,
    subscriptions: HashSet<SubscriptionKey>,
    sender: UnboundedSender<String>,
}

#[derive(Debug, Clone)]
pub struct BroadcastOutcome {
    pub sent: usize,
    pub failed: Vec<String>,
}

/// Thread-safe per the spec's C10 requirement; every mutation is a single
/// `DashMap` shard lock, and broadcasts snapshot the client set before
/// fanning out so sends never happen under the lock.
pub struct ChannelManager {
    clients: DashMap<String, ClientEntry>,
    rate_limiter: RateLimiter,
    bus_subscribed: AtomicBool,
}

impl ChannelManager {
    pub fn new(config: &ChannelsConfig) -> Self {
        Self {
            clients: DashMap::new(),
            rate_limiter: RateLimiter::new(config.rate_limit_messages, config.rate_limit_window_secs),
            bus_subscribed: AtomicBool::new(false),
        }
    }

    /// Register a connected, authenticated client. Returns `true` if this is
    /// the first connection overall, meaning the caller should subscribe the
    /// manager to the internal event bus.
    pub fn connect(
        &self,
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        sender: UnboundedSender<String>,
        auto_subscribe: &[(Channel, Option<String>)],
    ) -> bool {
        let client_id = client_id.into();
        let subscriptions = auto_subscribe
            .iter()
            .map(|(channel, room_id)| SubscriptionKey::new(*channel, room_id.clone()))
            .collect();
        self.clients.insert(
            client_id,
            ClientEntry {
                user_id: user_id.into(),
                subscriptions,
                sender,
            },
        );
        !self.bus_subscribed.swap(true, Ordering::SeqCst)
    }

    /// Drop a client. Returns `true` if this was the last connected client,
    /// meaning the caller should unsubscribe from the internal event bus.
    pub fn disconnect(&self, client_id: &str) -> bool {
        self.clients.remove(client_id);
        self.rate_limiter.forget(client_id);
        if self.clients.is_empty() {
            self.bus_subscribed.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn subscribe(&self, client_id: &str, channel: Channel, room_id: Option<String>) -> ChannelResult<()> {
        if channel.requires_room() && room_id.is_none() {
            return Err(ChannelError::InvalidChannel(format!(
                "{} requires a room_id",
                channel.as_str()
            )));
        }
        let mut client = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| ChannelError::UnknownClient(client_id.to_string()))?;
        client.subscriptions.insert(SubscriptionKey::new(channel, room_id));
        Ok(())
    }

    /// Idempotent: unsubscribing from a channel never subscribed to is not
    /// an error.
    pub fn unsubscribe(&self, client_id: &str, channel: Channel, room_id: Option<String>) -> ChannelResult<()> {
        let mut client = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| ChannelError::UnknownClient(client_id.to_string()))?;
        client.subscriptions.remove(&SubscriptionKey::new(channel, room_id));
        Ok(())
    }

    /// True if this client's inbound frame is within its rate limit.
    pub fn check_rate_limit(&self, client_id: &str) -> bool {
        self.rate_limiter.check(client_id)
    }

    pub fn broadcast_to_channel(
        &self,
        channel: Channel,
        message: Value,
        room_id: Option<&str>,
        exclude: Option<&str>,
    ) -> BroadcastOutcome {
        let key = SubscriptionKey::new(channel, room_id.map(str::to_string));
        let targets: Vec<(String, UnboundedSender<String>)> = self
            .clients
            .iter()
            .filter(|entry| Some(entry.key().as_str()) != exclude)
            .filter(|entry| entry.value().subscriptions.contains(&key))
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        let payload = ChannelBroadcast::new(channel.as_str(), room_id.map(str::to_string), message).to_json();
        self.fan_out(&payload, targets)
    }

    pub fn broadcast_to_user(&self, user_id: &str, message: Value, channel: Option<Channel>) -> BroadcastOutcome {
        let targets: Vec<(String, UnboundedSender<String>)> = self
            .clients
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| (entry.key().clone(), entry.value().sender.clone()))
            .collect();

        let channel_name = channel.map(|c| c.as_str()).unwrap_or("notifications");
        let payload = ChannelBroadcast::new(channel_name, None, message).to_json();
        self.fan_out(&payload, targets)
    }

    /// Serialize once, then send to every target. Failed sends disconnect
    /// the client so a dead socket doesn't linger in the client table.
    fn fan_out(&self, payload: &str, targets: Vec<(String, UnboundedSender<String>)>) -> BroadcastOutcome {
        let mut failed = Vec::new();
        let mut sent = 0;
        for (client_id, sender) in targets {
            if sender.send(payload.to_string()).is_err() {
                warn!(client_id = %client_id, "broadcast send failed, disconnecting client");
                failed.push(client_id.clone());
            } else {
                sent += 1;
            }
        }
        for client_id in &failed {
            self.disconnect(client_id);
        }
        BroadcastOutcome { sent, failed }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

pub type SharedChannelManager = Arc<ChannelManager>;

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn manager() -> ChannelManager {
        ChannelManager::new(&ChannelsConfig {
            rate_limit_messages: 30,
            rate_limit_window_secs: 60,
        })
    }

    #[test]
    fn first_connect_reports_bus_subscription_needed() {
        let manager = manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(manager.connect("c1", "u1", tx, &[]));

        let (tx2, _rx2) = mpsc::unbounded_channel();
        assert!(!manager.connect("c2", "u1", tx2, &[]));
    }

    #[test]
    fn last_disconnect_reports_bus_unsubscription_needed() {
        let manager = manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.connect("c1", "u1", tx, &[]);
        assert!(manager.disconnect("c1"));
    }

    #[test]
    fn broadcast_only_reaches_subscribed_clients() {
        let manager = manager();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        manager.connect("c1", "u1", tx1, &[(Channel::Events, None)]);
        manager.connect("c2", "u2", tx2, &[]);

        let outcome = manager.broadcast_to_channel(Channel::Events, serde_json::json!({"x": 1}), None, None);
        assert_eq!(outcome.sent, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn discussion_channel_requires_room_id() {
        let manager = manager();
        let (tx, _rx) = mpsc::unbounded_channel();
        manager.connect("c1", "u1", tx, &[]);
        assert!(manager.subscribe("c1", Channel::Discussion, None).is_err());
        assert!(manager.subscribe("c1", Channel::Discussion, Some("room-1".into())).is_ok());
    }

    #[test]
    fn broadcast_to_user_reaches_every_session_for_that_user() {
        let manager = manager();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        manager.connect("c1", "u1", tx1, &[]);
        manager.connect("c2", "u1", tx2, &[]);

        let outcome = manager.broadcast_to_user("u1", serde_json::json!({"x": 1}), None);
        assert_eq!(outcome.sent, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn failed_send_disconnects_the_client() {
        let manager = manager();
        let (tx, rx) = mpsc::unbounded_channel();
        manager.connect("c1", "u1", tx, &[(Channel::Events, None)]);
        drop(rx);

        let outcome = manager.broadcast_to_channel(Channel::Events, serde_json::json!({}), None, None);
        assert_eq!(outcome.failed, vec!["c1".to_string()]);
        assert_eq!(manager.client_count(), 0);
    }
}
