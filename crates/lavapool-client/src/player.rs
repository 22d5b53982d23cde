//! Per-guild player collaborator interface.
//!
//! Players are owned exclusively by exactly one node at a time, keyed by
//! guild identifier. The runtime only needs the operations below; playback
//! state itself lives with the consumer.

use async_trait::async_trait;
use serde_json::Value;

use lavapool_common::Result;

use crate::events::NodeEvent;

/// The per-guild playback entity a node owns.
#[async_trait]
pub trait Player: Send + Sync {
    /// The guild this player belongs to.
    fn guild_id(&self) -> u64;

    /// Tears the player down. Called by the owning node during cascading
    /// destroy; a failure here is logged by the node and does not stop the
    /// teardown of sibling players.
    async fn destroy(&self) -> Result<()>;

    /// Per-player event sink. Receives every event that references this
    /// player, strictly before the node-level hook sees it.
    async fn hook(&self, event: &NodeEvent);

    /// State update pushed by the node (`op: playerUpdate`). Default no-op.
    async fn update_state(&self, data: &Value) {
        let _ = data;
    }
}
