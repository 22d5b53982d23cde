//! Duplex channel abstraction.
//!
//! The runtime does not implement its own control-channel framing. A node
//! owns a [`ChannelConnector`] that, given the node's connection parameters,
//! produces a [`ChannelPair`]: a shared send half ([`MessageSink`]) and a
//! receive half ([`MessageStream`]) consumed by the node's background task.
//! Handshake, framing and reconnection policy live behind these traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use lavapool_common::Result;

/// Connection parameters handed to a [`ChannelConnector`].
#[derive(Debug, Clone)]
pub struct ConnectInfo {
    pub host: String,
    pub port: u16,
    /// Bearer credential sent during the channel handshake.
    pub password: String,
    pub secure: bool,
    pub shard_id: Option<u32>,
    /// Requested heartbeat interval, if the consumer configured one.
    pub heartbeat: Option<Duration>,
}

impl ConnectInfo {
    /// The channel URI implied by these parameters.
    pub fn uri(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Send half of a node's control channel.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Forwards a structured payload over the channel.
    async fn send(&self, payload: Value) -> Result<()>;

    /// Liveness flag reported by the underlying connection.
    fn is_connected(&self) -> bool;

    /// Closes the channel. Best-effort.
    async fn close(&self);
}

/// Receive half of a node's control channel. Consumed by the node's
/// background receive task; `None` ends the task.
#[async_trait]
pub trait MessageStream: Send {
    async fn next(&mut self) -> Option<Value>;
}

/// Both halves of a freshly established channel.
pub struct ChannelPair {
    pub sink: Arc<dyn MessageSink>,
    pub stream: Box<dyn MessageStream>,
}

/// Establishes control channels for nodes.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Opens a channel to the node described by `info`. Failures (refused
    /// connection, rejected credentials) propagate to the caller as-is;
    /// the runtime does not retry connects.
    async fn connect(&self, info: &ConnectInfo) -> Result<ChannelPair>;
}
