//! Node state, lifecycle and event dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lavapool_common::{NodeStats, Result, Track, SENTINEL_PENALTY};

use crate::events::NodeEvent;
use crate::player::Player;
use crate::registry::NodeRegistry;
use crate::rest::{LoadResult, RestClient};
use crate::transport::{ChannelConnector, ConnectInfo, MessageSink};

/// Connection parameters for one node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Unique identifier within the owning pool.
    pub identifier: String,
    pub region: String,
    pub shard_id: Option<u32>,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    /// Base URI of the node's REST endpoint.
    pub rest_uri: String,
    /// Bearer credential for both the channel and the REST endpoint.
    pub password: String,
    pub heartbeat: Option<Duration>,
}

/// Node-level event hook.
///
/// A synchronous hook is invoked inline; an asynchronous hook is awaited.
/// The hook type itself guarantees the callable is invocable, so replacing
/// a hook cannot fail.
pub enum EventHook {
    Sync(Box<dyn Fn(&NodeEvent) + Send + Sync>),
    Async(Box<dyn Fn(NodeEvent) -> BoxFuture<'static, ()> + Send + Sync>),
}

/// A remote audio-processing node.
///
/// Created by [`NodeRegistry::create_node`] and shared as `Arc<Node>`
/// between the consumer and the node's background receive task. A node is
/// usable iff it is open (`available`), a channel sink exists and the sink
/// reports itself connected.
///
/// `destroy()` is terminal: it tears down every owned player, cancels the
/// receive task and removes the node from the owning registry. A destroyed
/// node must not be reused.
pub struct Node {
    config: NodeConfig,
    rest: RestClient,
    connector: Arc<dyn ChannelConnector>,
    registry: NodeRegistry,

    /// Load-balancer opt-out flag, orthogonal to actual channel health.
    available: AtomicBool,
    sink: RwLock<Option<Arc<dyn MessageSink>>>,
    stats: RwLock<Option<NodeStats>>,
    hook: RwLock<Option<Arc<EventHook>>>,
    players: RwLock<HashMap<u64, Arc<dyn Player>>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    pub(crate) fn new(
        config: NodeConfig,
        connector: Arc<dyn ChannelConnector>,
        registry: NodeRegistry,
    ) -> Self {
        let rest = RestClient::new(config.rest_uri.clone(), config.password.clone());
        Self {
            config,
            rest,
            connector,
            registry,
            available: AtomicBool::new(true),
            sink: RwLock::new(None),
            stats: RwLock::new(None),
            hook: RwLock::new(None),
            players: RwLock::new(HashMap::new()),
            receive_task: Mutex::new(None),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn shard_id(&self) -> Option<u32> {
        self.config.shard_id
    }

    /// The node's REST client.
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Whether the node is usable: open, with a live channel.
    pub async fn is_available(&self) -> bool {
        if !self.available.load(Ordering::SeqCst) {
            return false;
        }
        match self.sink.read().await.as_ref() {
            Some(sink) => sink.is_connected(),
            None => false,
        }
    }

    /// Opts the node back in for load balancing. Does not touch the channel.
    pub fn open(&self) {
        self.available.store(true, Ordering::SeqCst);
    }

    /// Opts the node out of load balancing. Does not touch the channel.
    pub fn close(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    /// The node's load-balancing penalty. Lower is better; an unavailable
    /// or statless node reports [`SENTINEL_PENALTY`] so pool selection
    /// never picks it.
    pub async fn penalty(&self) -> f64 {
        if !self.available.load(Ordering::SeqCst) {
            return SENTINEL_PENALTY;
        }
        match self.stats.read().await.as_ref() {
            Some(stats) => stats.penalty().total,
            None => SENTINEL_PENALTY,
        }
    }

    /// The last load report received from the node, if any.
    pub async fn stats(&self) -> Option<NodeStats> {
        self.stats.read().await.clone()
    }

    pub(crate) async fn set_stats(&self, stats: NodeStats) {
        *self.stats.write().await = Some(stats);
    }

    /// Establishes the node's control channel and starts the background
    /// receive task.
    ///
    /// Connection failures propagate from the connector as-is; the runtime
    /// does not retry connects. Calling `connect` on an already connected
    /// node replaces the channel: the previous receive task is aborted and
    /// the old sink dropped.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        let info = ConnectInfo {
            host: self.config.host.clone(),
            port: self.config.port,
            password: self.config.password.clone(),
            secure: self.config.secure,
            shard_id: self.config.shard_id,
            heartbeat: self.config.heartbeat,
        };

        let pair = match self.connector.connect(&info).await {
            Ok(pair) => pair,
            Err(error) => {
                self.available.store(false, Ordering::SeqCst);
                return Err(error);
            }
        };

        if let Some(previous) = self.receive_task.lock().await.take() {
            warn!(
                identifier = %self.config.identifier,
                "replacing an existing channel, aborting previous receive task"
            );
            previous.abort();
        }

        *self.sink.write().await = Some(pair.sink);
        self.available.store(true, Ordering::SeqCst);

        let node = Arc::clone(self);
        let mut stream = pair.stream;
        let handle = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                node.process_message(message).await;
            }
            debug!(identifier = %node.config.identifier, "channel stream ended");
        });
        *self.receive_task.lock().await = Some(handle);

        info!(
            identifier = %self.config.identifier,
            region = %self.config.region,
            "node connected"
        );

        self.on_event(NodeEvent::NodeReady {
            identifier: self.config.identifier.clone(),
        })
        .await;

        Ok(())
    }

    /// Searches the node for tracks matching `query`. See
    /// [`RestClient::load_tracks`].
    pub async fn get_tracks(&self, query: &str) -> Result<Option<LoadResult>> {
        self.rest.load_tracks(query).await
    }

    /// Builds a track from its base64 identifier. See
    /// [`RestClient::build_track`].
    pub async fn build_track(&self, identifier: &str) -> Result<Track> {
        self.rest.build_track(identifier).await
    }

    /// O(1) lookup of the player owned for `guild_id`. Never fails.
    pub async fn get_player(&self, guild_id: u64) -> Option<Arc<dyn Player>> {
        self.players.read().await.get(&guild_id).cloned()
    }

    /// Registers a player under its guild identifier. A player for the same
    /// guild is replaced.
    pub async fn add_player(&self, player: Arc<dyn Player>) {
        let guild_id = player.guild_id();
        if self
            .players
            .write()
            .await
            .insert(guild_id, player)
            .is_some()
        {
            debug!(guild_id, "replaced existing player");
        }
    }

    /// Number of players this node owns.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    /// Replaces the node-level event hook.
    pub async fn set_hook(&self, hook: EventHook) {
        *self.hook.write().await = Some(Arc::new(hook));
    }

    /// Removes the node-level event hook.
    pub async fn clear_hook(&self) {
        *self.hook.write().await = None;
    }

    /// Forwards a structured payload to the node's channel.
    ///
    /// When no channel exists the payload is silently dropped. This
    /// fire-and-forget-before-connect behavior is deliberate; callers that
    /// need delivery must connect first.
    pub async fn send(&self, payload: Value) -> Result<()> {
        let sink = self.sink.read().await.clone();
        match sink {
            Some(sink) => {
                debug!(identifier = %self.config.identifier, "sending payload");
                sink.send(payload).await
            }
            None => {
                debug!(
                    identifier = %self.config.identifier,
                    "dropping payload, channel not connected"
                );
                Ok(())
            }
        }
    }

    /// Dispatches one inbound event.
    ///
    /// Delivery order per event: the owning player's hook first (when the
    /// event carries a player), then the node-level hook, then fan-out to
    /// every subscriber registered on the owning pool. Absence of a node
    /// hook is not an error.
    pub async fn on_event(&self, event: NodeEvent) {
        info!(identifier = %self.config.identifier, event = %event, "event dispatched");

        if let Some(player) = event.player() {
            player.hook(&event).await;
        }

        let hook = self.hook.read().await.clone();
        if let Some(hook) = hook {
            match hook.as_ref() {
                EventHook::Sync(callback) => callback(&event),
                EventHook::Async(callback) => callback(event.clone()).await,
            }
        }

        self.registry.fan_out(&event).await;
    }

    /// Decodes one raw channel message and routes it by `op`.
    pub(crate) async fn process_message(&self, message: Value) {
        let Some(op) = message.get("op").and_then(Value::as_str) else {
            return;
        };

        match op {
            "stats" => match serde_json::from_value::<NodeStats>(message.clone()) {
                Ok(stats) => self.set_stats(stats).await,
                Err(error) => {
                    warn!(identifier = %self.config.identifier, %error, "bad stats payload")
                }
            },
            "event" => {
                let Some(guild_id) = payload_guild_id(&message) else {
                    return;
                };
                let Some(player) = self.get_player(guild_id).await else {
                    debug!(guild_id, "event for unknown guild, dropped");
                    return;
                };
                let kind = message.get("type").and_then(Value::as_str).unwrap_or("");
                let event = NodeEvent::from_payload(kind, player, &message);
                self.on_event(event).await;
            }
            "playerUpdate" => {
                let Some(guild_id) = payload_guild_id(&message) else {
                    return;
                };
                if let Some(player) = self.get_player(guild_id).await {
                    player.update_state(&message).await;
                }
            }
            other => debug!(op = other, "ignoring unknown op"),
        }
    }

    /// Destroys the node and everything it owns. Terminal.
    ///
    /// The player set is snapshot-copied before iteration so concurrent
    /// registration cannot interfere with teardown. A failing player is
    /// logged and the remaining players are still destroyed. Cancelling the
    /// receive task is best-effort; the node is removed from the owning
    /// registry last.
    pub async fn destroy(&self) {
        let players: Vec<Arc<dyn Player>> = self.players.read().await.values().cloned().collect();
        for player in players {
            if let Err(error) = player.destroy().await {
                warn!(
                    identifier = %self.config.identifier,
                    guild_id = player.guild_id(),
                    %error,
                    "player destroy failed"
                );
            }
        }
        self.players.write().await.clear();

        if let Some(task) = self.receive_task.lock().await.take() {
            task.abort();
        }
        if let Some(sink) = self.sink.write().await.take() {
            sink.close().await;
        }
        self.available.store(false, Ordering::SeqCst);

        self.registry.remove(&self.config.identifier).await;
        info!(identifier = %self.config.identifier, "node destroyed");
    }
}

/// Extracts the guild identifier from a raw payload. Nodes send it as a
/// string; numbers are accepted as well.
fn payload_guild_id(message: &Value) -> Option<u64> {
    match message.get("guildId") {
        Some(Value::String(raw)) => raw.parse().ok(),
        Some(Value::Number(raw)) => raw.as_u64(),
        _ => None,
    }
}
