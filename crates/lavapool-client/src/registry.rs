//! The owning pool of nodes and the subscriber set.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use lavapool_common::{LavapoolError, Result, SENTINEL_PENALTY};

use crate::events::NodeEvent;
use crate::listener::{self, DynSubscriber, EventSubscriber, SubscriberCell};
use crate::node::{Node, NodeConfig};
use crate::transport::ChannelConnector;

/// The pool that owns a set of nodes, keyed by unique identifier.
///
/// Cheap to clone; every clone shares the same pool. Each node keeps a
/// handle to its owning registry so `destroy()` can deregister itself.
///
/// The registry also holds the subscriber set: consumers registered via
/// [`subscribe`](Self::subscribe) receive a failure-isolated copy of every
/// event any node in the pool dispatches.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, Arc<Node>>>>,
    subscribers: Arc<RwLock<Vec<Arc<dyn DynSubscriber>>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node and registers it under its identifier.
    ///
    /// The identifier must be unique within this pool.
    pub async fn create_node(
        &self,
        config: NodeConfig,
        connector: Arc<dyn ChannelConnector>,
    ) -> Result<Arc<Node>> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&config.identifier) {
            return Err(LavapoolError::Configuration(format!(
                "node '{}' is already registered",
                config.identifier
            )));
        }

        let identifier = config.identifier.clone();
        let node = Arc::new(Node::new(config, connector, self.clone()));
        nodes.insert(identifier.clone(), node.clone());
        info!(identifier = %identifier, "node registered");
        Ok(node)
    }

    /// Looks a node up by identifier.
    pub async fn get(&self, identifier: &str) -> Option<Arc<Node>> {
        self.nodes.read().await.get(identifier).cloned()
    }

    /// Removes a node from the pool. Idempotent; called by
    /// [`Node::destroy`].
    pub async fn remove(&self, identifier: &str) -> Option<Arc<Node>> {
        self.nodes.write().await.remove(identifier)
    }

    /// Number of registered nodes.
    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }

    /// Identifiers of all registered nodes.
    pub async fn identifiers(&self) -> Vec<String> {
        self.nodes.read().await.keys().cloned().collect()
    }

    /// The node with the lowest penalty, or `None` when the pool is empty
    /// or every node is penalized at the sentinel.
    pub async fn best_node(&self) -> Option<Arc<Node>> {
        let nodes: Vec<Arc<Node>> = self.nodes.read().await.values().cloned().collect();

        let mut best: Option<(f64, Arc<Node>)> = None;
        for node in nodes {
            let penalty = node.penalty().await;
            if penalty >= SENTINEL_PENALTY {
                continue;
            }
            let better = best
                .as_ref()
                .map(|(current, _)| penalty < *current)
                .unwrap_or(true);
            if better {
                best = Some((penalty, node));
            }
        }
        best.map(|(_, node)| node)
    }

    /// Registers a subscriber for pool-wide event fan-out.
    ///
    /// The subscriber type's listener table is built (and cached) up front,
    /// so a misconfigured table surfaces here rather than at first
    /// dispatch.
    pub async fn subscribe<T: EventSubscriber>(&self, subscriber: Arc<T>) -> Result<()> {
        listener::table_for::<T>()?;
        self.subscribers
            .write()
            .await
            .push(Arc::new(SubscriberCell(subscriber)));
        Ok(())
    }

    /// Delivers one event to every registered subscriber. Subscriber
    /// failures are isolated per listener and never reach the caller.
    pub(crate) async fn fan_out(&self, event: &NodeEvent) {
        let subscribers: Vec<Arc<dyn DynSubscriber>> =
            self.subscribers.read().await.iter().cloned().collect();
        for subscriber in subscribers {
            subscriber.deliver(event).await;
        }
    }
}
