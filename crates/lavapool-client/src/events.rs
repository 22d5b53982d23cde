//! Typed inbound node events.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::player::Player;

/// Canonical names used to route events to listeners.
pub mod event_name {
    pub const NODE_READY: &str = "node_ready";
    pub const TRACK_START: &str = "track_start";
    pub const TRACK_END: &str = "track_end";
    pub const TRACK_STUCK: &str = "track_stuck";
    pub const TRACK_EXCEPTION: &str = "track_exception";
    pub const WEBSOCKET_CLOSED: &str = "websocket_closed";
}

/// An event decoded from a node's control channel.
///
/// Every variant except [`NodeReady`](NodeEvent::NodeReady) carries the
/// owning player, looked up by guild identifier when the event was decoded.
#[derive(Clone)]
pub enum NodeEvent {
    /// The node's channel was established.
    NodeReady { identifier: String },
    TrackStart {
        player: Arc<dyn Player>,
        track: Option<String>,
    },
    TrackEnd {
        player: Arc<dyn Player>,
        track: Option<String>,
        reason: Option<String>,
    },
    TrackException {
        player: Arc<dyn Player>,
        track: Option<String>,
        error: String,
    },
    TrackStuck {
        player: Arc<dyn Player>,
        track: Option<String>,
        threshold_ms: u64,
    },
    /// The node closed the guild's voice channel connection.
    WebsocketClosed {
        player: Arc<dyn Player>,
        reason: Option<String>,
        code: Option<i64>,
        guild_id: u64,
    },
}

impl NodeEvent {
    /// The canonical listener event name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            NodeEvent::NodeReady { .. } => event_name::NODE_READY,
            NodeEvent::TrackStart { .. } => event_name::TRACK_START,
            NodeEvent::TrackEnd { .. } => event_name::TRACK_END,
            NodeEvent::TrackException { .. } => event_name::TRACK_EXCEPTION,
            NodeEvent::TrackStuck { .. } => event_name::TRACK_STUCK,
            NodeEvent::WebsocketClosed { .. } => event_name::WEBSOCKET_CLOSED,
        }
    }

    /// The player this event references, if any.
    pub fn player(&self) -> Option<&Arc<dyn Player>> {
        match self {
            NodeEvent::NodeReady { .. } => None,
            NodeEvent::TrackStart { player, .. }
            | NodeEvent::TrackEnd { player, .. }
            | NodeEvent::TrackException { player, .. }
            | NodeEvent::TrackStuck { player, .. }
            | NodeEvent::WebsocketClosed { player, .. } => Some(player),
        }
    }

    /// Builds a typed event from a raw `op: event` payload. Unrecognized
    /// event types map to [`WebsocketClosed`](NodeEvent::WebsocketClosed),
    /// matching the node protocol's catch-all.
    pub(crate) fn from_payload(kind: &str, player: Arc<dyn Player>, data: &Value) -> Self {
        let track = data
            .get("track")
            .and_then(Value::as_str)
            .map(str::to_string);

        match kind {
            "TrackStartEvent" => NodeEvent::TrackStart { player, track },
            "TrackEndEvent" => NodeEvent::TrackEnd {
                player,
                track,
                reason: data
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "TrackExceptionEvent" => NodeEvent::TrackException {
                player,
                track,
                error: data
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "TrackStuckEvent" => NodeEvent::TrackStuck {
                player,
                track,
                threshold_ms: data.get("thresholdMs").and_then(Value::as_u64).unwrap_or(0),
            },
            _ => {
                let guild_id = player.guild_id();
                NodeEvent::WebsocketClosed {
                    player,
                    reason: data
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    code: data.get("code").and_then(Value::as_i64),
                    guild_id,
                }
            }
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("NodeEvent");
        debug.field("name", &self.name());
        if let Some(player) = self.player() {
            debug.field("guild_id", &player.guild_id());
        }
        debug.finish()
    }
}
