//! Integration tests for listener dispatch and registry fan-out.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lavapool_client::{
    dispatch, event_name, EventSubscriber, ListenerTable, NodeEvent, NodeRegistry,
};
use lavapool_common::{LavapoolError, Result};

use common::{node_config, MemoryConnector};

fn ready_event() -> NodeEvent {
    NodeEvent::NodeReady {
        identifier: "dispatch-test".to_string(),
    }
}

struct TwoListeners {
    log: Mutex<Vec<&'static str>>,
}

impl EventSubscriber for TwoListeners {
    fn register(table: &mut ListenerTable<Self>) -> Result<()> {
        table.listen(
            event_name::NODE_READY,
            "announce",
            Box::new(|s: &Self, _e| {
                Box::pin(async move {
                    s.log.lock().unwrap().push("announce");
                    Ok(())
                })
            }),
        )?;
        table.listen(
            event_name::NODE_READY,
            "record",
            Box::new(|s: &Self, _e| {
                Box::pin(async move {
                    s.log.lock().unwrap().push("record");
                    Ok(())
                })
            }),
        )
    }
}

#[tokio::test]
async fn test_two_listeners_on_same_event_both_run() {
    let subscriber = TwoListeners {
        log: Mutex::new(Vec::new()),
    };

    dispatch(&subscriber, &ready_event()).await.unwrap();

    let log = subscriber.log.lock().unwrap();
    assert_eq!(*log, vec!["announce", "record"]);
}

struct FaultySubscriber {
    log: Mutex<Vec<String>>,
    error_reports: Mutex<Vec<String>>,
}

impl FaultySubscriber {
    fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            error_reports: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl EventSubscriber for FaultySubscriber {
    fn register(table: &mut ListenerTable<Self>) -> Result<()> {
        table.listen(
            event_name::NODE_READY,
            "faulty",
            Box::new(|s: &Self, _e| {
                Box::pin(async move {
                    s.log.lock().unwrap().push("faulty".to_string());
                    Err(LavapoolError::external(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "boom",
                    )))
                })
            }),
        )?;
        table.listen(
            event_name::NODE_READY,
            "steady",
            Box::new(|s: &Self, _e| {
                Box::pin(async move {
                    s.log.lock().unwrap().push("steady".to_string());
                    Ok(())
                })
            }),
        )
    }

    async fn on_dispatch_error(&self, listener: &str, _error: &LavapoolError) {
        self.error_reports.lock().unwrap().push(listener.to_string());
    }
}

#[tokio::test]
async fn test_failing_listener_reported_once_and_others_still_run() {
    let subscriber = FaultySubscriber::new();

    dispatch(&subscriber, &ready_event()).await.unwrap();

    let log = subscriber.log.lock().unwrap();
    assert_eq!(*log, vec!["faulty".to_string(), "steady".to_string()]);

    let reports = subscriber.error_reports.lock().unwrap();
    assert_eq!(*reports, vec!["faulty".to_string()]);
}

struct Conflicting;

impl EventSubscriber for Conflicting {
    fn register(table: &mut ListenerTable<Self>) -> Result<()> {
        table.listen(
            event_name::TRACK_END,
            "cleanup",
            Box::new(|_s: &Self, _e| Box::pin(async { Ok(()) })),
        )?;
        table.listen(
            event_name::TRACK_END,
            "cleanup",
            Box::new(|_s: &Self, _e| Box::pin(async { Ok(()) })),
        )
    }
}

#[tokio::test]
async fn test_subscribe_rejects_conflicting_registration() {
    let registry = NodeRegistry::new();

    let result = registry.subscribe(Arc::new(Conflicting)).await;
    assert!(matches!(result, Err(LavapoolError::Configuration(_))));
}

struct ReadyCounter {
    ready: AtomicUsize,
    last_identifier: Mutex<Option<String>>,
}

impl ReadyCounter {
    fn new() -> Self {
        Self {
            ready: AtomicUsize::new(0),
            last_identifier: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl EventSubscriber for ReadyCounter {
    async fn on_node_ready(&self, event: &NodeEvent) -> Result<()> {
        self.ready.fetch_add(1, Ordering::SeqCst);
        if let NodeEvent::NodeReady { identifier } = event {
            *self.last_identifier.lock().unwrap() = Some(identifier.clone());
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_overridden_default_handler_receives_event() {
    let subscriber = ReadyCounter::new();

    dispatch(&subscriber, &ready_event()).await.unwrap();

    assert_eq!(subscriber.ready.load(Ordering::SeqCst), 1);
    assert_eq!(
        subscriber.last_identifier.lock().unwrap().as_deref(),
        Some("dispatch-test")
    );
}

#[tokio::test]
async fn test_node_events_fan_out_to_registry_subscribers() {
    let registry = NodeRegistry::new();
    let subscriber = Arc::new(ReadyCounter::new());
    registry.subscribe(subscriber.clone()).await.unwrap();

    let (connector, _handles) = MemoryConnector::with_channels(1);
    let node = registry
        .create_node(node_config("fanout"), connector)
        .await
        .unwrap();
    node.connect().await.unwrap();

    assert_eq!(subscriber.ready.load(Ordering::SeqCst), 1);
    assert_eq!(
        subscriber.last_identifier.lock().unwrap().as_deref(),
        Some("fanout")
    );
}
