//! Channel Broker
//!
//! Holds the channel → subscriber registry and implements publish
//! fan-out. Subscribers are identified by their connection id and reached
//! through an unbounded delivery channel cloned from the owning
//! connection's mailbox; the connection task forwards received messages
//! onto its socket.
//!
//! A delivery failure means the receiving side is gone, so the subscriber
//! is dropped from the channel; a channel with no remaining subscribers is
//! pruned from the registry. Neither event is visible to the publisher
//! beyond the delivered count.

use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// A message pushed to every subscriber of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// The channel the message was published to
    pub channel: String,
    /// The published payload
    pub payload: String,
}

/// One registered subscriber: the owning connection's id plus a handle to
/// its delivery mailbox.
#[derive(Debug)]
struct Subscriber {
    id: u64,
    sender: UnboundedSender<ChannelMessage>,
}

/// The publish/subscribe broker, shared by all connections.
#[derive(Debug, Default)]
pub struct PubSub {
    channels: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl PubSub {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection's mailbox with `channel`.
    ///
    /// # Returns
    ///
    /// True if the registration is new, false if the connection was
    /// already subscribed to the channel.
    pub fn subscribe(&self, channel: &str, id: u64, sender: UnboundedSender<ChannelMessage>) -> bool {
        let mut channels = self.channels.write().unwrap();
        let subscribers = channels.entry(channel.to_string()).or_default();
        if subscribers.iter().any(|s| s.id == id) {
            return false;
        }
        subscribers.push(Subscriber { id, sender });
        true
    }

    /// Removes a connection's registration from `channel`.
    ///
    /// An emptied channel is pruned from the registry.
    ///
    /// # Returns
    ///
    /// True if a registration was removed.
    pub fn unsubscribe(&self, channel: &str, id: u64) -> bool {
        let mut channels = self.channels.write().unwrap();
        let Some(subscribers) = channels.get_mut(channel) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            channels.remove(channel);
        }
        removed
    }

    /// Removes every registration held by a connection (teardown path).
    pub fn unsubscribe_all(&self, id: u64) {
        let mut channels = self.channels.write().unwrap();
        channels.retain(|_, subscribers| {
            subscribers.retain(|s| s.id != id);
            !subscribers.is_empty()
        });
    }

    /// Fans a message out to every subscriber of `channel`.
    ///
    /// A send failure marks that subscriber dead; dead subscribers are
    /// dropped afterwards and an emptied channel is pruned. Failures never
    /// affect delivery to the other subscribers.
    ///
    /// # Returns
    ///
    /// The number of subscribers the message reached.
    pub fn publish(&self, channel: &str, payload: &str) -> usize {
        let mut dead = Vec::new();
        let delivered = {
            let channels = self.channels.read().unwrap();
            let Some(subscribers) = channels.get(channel) else {
                return 0;
            };
            let mut delivered = 0;
            for subscriber in subscribers {
                let message = ChannelMessage {
                    channel: channel.to_string(),
                    payload: payload.to_string(),
                };
                if subscriber.sender.send(message).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(subscriber.id);
                }
            }
            delivered
        };

        if !dead.is_empty() {
            debug!(channel, dropped = dead.len(), "dropping dead subscribers");
            let mut channels = self.channels.write().unwrap();
            if let Some(subscribers) = channels.get_mut(channel) {
                subscribers.retain(|s| !dead.contains(&s.id));
                if subscribers.is_empty() {
                    channels.remove(channel);
                }
            }
        }

        delivered
    }

    /// Returns the number of channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.read().unwrap().len()
    }

    /// Returns the number of subscribers currently registered on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .unwrap()
            .get(channel)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
