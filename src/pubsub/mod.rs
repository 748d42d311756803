//! Publish/Subscribe Messaging
//!
//! This module implements the channel-based messaging facility: a shared
//! registry mapping channel names to subscriber lists, publish fan-out,
//! and dead-subscriber cleanup.
//!
//! ## Delivery Model
//!
//! Each connection owns a delivery mailbox (an unbounded channel). On
//! `SUBSCRIBE` the connection registers a clone of its mailbox sender with
//! the broker; `PUBLISH` pushes a [`ChannelMessage`] into every registered
//! mailbox, and each connection task forwards received messages onto its
//! own socket. The broker never touches a socket, so publishing never
//! blocks on a slow subscriber's network.
//!
//! A subscriber whose mailbox is gone (its connection ended) is dropped
//! from the channel on the next publish; channels with no subscribers are
//! pruned from the registry.

pub mod broker;

// Re-export commonly used types
pub use broker::{ChannelMessage, PubSub};
