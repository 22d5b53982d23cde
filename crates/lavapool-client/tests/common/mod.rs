//! Shared test doubles: an in-memory control channel, a scriptable player
//! and a handful of helpers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use lavapool_client::transport::{
    ChannelConnector, ChannelPair, ConnectInfo, MessageSink, MessageStream,
};
use lavapool_client::{NodeConfig, NodeEvent, Player};
use lavapool_common::{LavapoolError, Result};

pub fn node_config(identifier: &str) -> NodeConfig {
    NodeConfig {
        identifier: identifier.to_string(),
        region: "eu".to_string(),
        shard_id: None,
        host: "127.0.0.1".to_string(),
        port: 2333,
        secure: false,
        rest_uri: "http://127.0.0.1:2333".to_string(),
        password: "pass".to_string(),
        heartbeat: None,
    }
}

/// In-memory send half: records every payload.
pub struct MemorySink {
    pub connected: AtomicBool,
    pub sent: Mutex<Vec<Value>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, payload: Value) -> Result<()> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// In-memory receive half fed from an mpsc channel.
pub struct MemoryStream(pub mpsc::UnboundedReceiver<Value>);

#[async_trait]
impl MessageStream for MemoryStream {
    async fn next(&mut self) -> Option<Value> {
        self.0.recv().await
    }
}

/// A channel endpoint the tests keep to drive one connection.
pub struct ChannelHandle {
    pub sink: Arc<MemorySink>,
    pub inbound: mpsc::UnboundedSender<Value>,
}

/// Connector that hands out pre-built in-memory channels, one per
/// `connect` call.
pub struct MemoryConnector {
    pairs: Mutex<Vec<ChannelPair>>,
}

impl MemoryConnector {
    /// Builds a connector with `count` scripted connections and returns the
    /// test-side handle for each.
    pub fn with_channels(count: usize) -> (Arc<Self>, Vec<ChannelHandle>) {
        let mut pairs = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..count {
            let sink = MemorySink::new();
            let (tx, rx) = mpsc::unbounded_channel();
            pairs.push(ChannelPair {
                sink: sink.clone(),
                stream: Box::new(MemoryStream(rx)),
            });
            handles.push(ChannelHandle { sink, inbound: tx });
        }
        // connect() pops from the front.
        pairs.reverse();
        (
            Arc::new(Self {
                pairs: Mutex::new(pairs),
            }),
            handles,
        )
    }
}

#[async_trait]
impl ChannelConnector for MemoryConnector {
    async fn connect(&self, _info: &ConnectInfo) -> Result<ChannelPair> {
        self.pairs
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LavapoolError::Transport("no scripted channel left".to_string()))
    }
}

/// Scriptable player: records hook deliveries into a shared log and can be
/// told to fail its destroy.
pub struct MockPlayer {
    guild_id: u64,
    pub fail_destroy: bool,
    pub destroy_calls: AtomicUsize,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl MockPlayer {
    pub fn new(guild_id: u64, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            fail_destroy: false,
            destroy_calls: AtomicUsize::new(0),
            log,
        })
    }

    pub fn failing(guild_id: u64, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            fail_destroy: true,
            destroy_calls: AtomicUsize::new(0),
            log,
        })
    }
}

#[async_trait]
impl Player for MockPlayer {
    fn guild_id(&self) -> u64 {
        self.guild_id
    }

    async fn destroy(&self) -> Result<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_destroy {
            Err(LavapoolError::Transport(format!(
                "player {} refused to die",
                self.guild_id
            )))
        } else {
            Ok(())
        }
    }

    async fn hook(&self, event: &NodeEvent) {
        self.log
            .lock()
            .unwrap()
            .push(format!("player:{}:{}", self.guild_id, event.name()));
    }

    async fn update_state(&self, _data: &Value) {
        self.log
            .lock()
            .unwrap()
            .push(format!("update:{}", self.guild_id));
    }
}

/// Polls until `check` passes or the deadline expires.
pub async fn wait_for(check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check() {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within deadline"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
