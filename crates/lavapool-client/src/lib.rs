//! Lavapool Client Runtime
//!
//! Client-side runtime for coordinating a pool of remote audio-processing
//! nodes. Each node exposes a stateful duplex control channel plus a
//! stateless REST query interface.
//!
//! # Overview
//!
//! The runtime's responsibilities are:
//!
//! 1. **Connection lifecycle**: per-node channel state, availability and
//!    load-balancing metadata ([`Node`], [`NodeRegistry`])
//! 2. **REST queries**: bounded-retry track loading and decoding with typed
//!    errors ([`RestClient`])
//! 3. **Event routing**: inbound node events dispatched to the owning
//!    player's hook, the node-level hook, and every registered subscriber
//!    with per-listener failure isolation ([`NodeEvent`], [`EventSubscriber`])
//! 4. **Cascading teardown**: destroying a node destroys its players,
//!    cancels its receive task and deregisters it from the pool
//!
//! # Components
//!
//! - [`transport`] - the duplex channel abstraction a node drives
//! - [`rest`] - the REST client and its retry policy
//! - [`node`] - node state, lifecycle and event dispatch
//! - [`registry`] - the owning pool of nodes and the subscriber set
//! - [`listener`] - per-type listener tables with isolated dispatch
//! - [`events`] - typed inbound events
//! - [`player`] - the per-guild player collaborator interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lavapool_client::{NodeConfig, NodeRegistry};
//! # use lavapool_client::transport::{ChannelConnector, ChannelPair, ConnectInfo};
//! # struct MyConnector;
//! # #[async_trait::async_trait]
//! # impl ChannelConnector for MyConnector {
//! #     async fn connect(&self, _: &ConnectInfo) -> lavapool_common::Result<ChannelPair> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! # #[tokio::main]
//! # async fn main() -> lavapool_common::Result<()> {
//! let registry = NodeRegistry::new();
//! let node = registry
//!     .create_node(
//!         NodeConfig {
//!             identifier: "main".to_string(),
//!             region: "eu".to_string(),
//!             shard_id: None,
//!             host: "127.0.0.1".to_string(),
//!             port: 2333,
//!             secure: false,
//!             rest_uri: "http://127.0.0.1:2333".to_string(),
//!             password: "youshallnotpass".to_string(),
//!             heartbeat: None,
//!         },
//!         Arc::new(MyConnector),
//!     )
//!     .await?;
//! node.connect().await?;
//! let results = node.get_tracks("ytsearch: test").await?;
//! # let _ = results;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod listener;
pub mod node;
pub mod player;
pub mod registry;
pub mod rest;
pub mod transport;

pub use events::{event_name, NodeEvent};
pub use listener::{dispatch, EventSubscriber, ListenerTable};
pub use node::{EventHook, Node, NodeConfig};
pub use player::Player;
pub use registry::NodeRegistry;
pub use rest::{LoadResult, RestClient, RestConfig};
pub use transport::{ChannelConnector, ChannelPair, ConnectInfo, MessageSink, MessageStream};
