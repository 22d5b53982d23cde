//! Listener registration and failure-isolated dispatch.
//!
//! A consuming type subscribes to named events two ways:
//!
//! 1. Override the [`EventSubscriber`] default handlers (`on_node_ready`,
//!    `on_track_start`, ...) for the documented event set.
//! 2. Register additional named listeners in
//!    [`EventSubscriber::register`], the explicit-registration analog of a
//!    listener annotation.
//!
//! The table built by `register` is computed once per concrete type and
//! cached process-wide keyed by [`TypeId`], so every instance of a type
//! shares it. Dispatch isolates each listener: one failing listener is
//! reported through [`EventSubscriber::on_dispatch_error`] and never stops
//! the remaining listeners or propagates to the event source.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::error;

use lavapool_common::{LavapoolError, Result};

use crate::events::NodeEvent;

/// Future returned by a registered listener.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<()>>;

/// A boxed listener handler for subscriber type `T`.
pub type Handler<T> =
    Box<dyn for<'a> Fn(&'a T, &'a NodeEvent) -> HandlerFuture<'a> + Send + Sync>;

struct Listener<T> {
    name: &'static str,
    handler: Handler<T>,
}

/// Event-name to named-listener mapping for one subscriber type.
///
/// Built once per concrete type (inside [`table_for`]) and shared by all
/// instances of that type.
pub struct ListenerTable<T> {
    entries: HashMap<&'static str, Vec<Listener<T>>>,
}

impl<T> ListenerTable<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a named listener for `event`.
    ///
    /// A duplicate `(event, name)` pair is a configuration error: listener
    /// names identify handlers in dispatch-error reports, so they must be
    /// unique per event.
    pub fn listen(
        &mut self,
        event: &'static str,
        name: &'static str,
        handler: Handler<T>,
    ) -> Result<()> {
        let listeners = self.entries.entry(event).or_default();
        if listeners.iter().any(|listener| listener.name == name) {
            return Err(LavapoolError::Configuration(format!(
                "listener '{name}' is already registered for event '{event}'"
            )));
        }
        listeners.push(Listener { name, handler });
        Ok(())
    }

    fn listeners(&self, event: &str) -> &[Listener<T>] {
        self.entries
            .get(event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners(event).len()
    }
}

/// A type that subscribes to node events.
///
/// The six documented events have overridable default no-op handlers, so a
/// subscriber only implements what it cares about and dispatch never misses
/// a documented event. [`register`](Self::register) adds extra named
/// listeners beyond the defaults; multiple listeners per event are legal.
#[async_trait]
pub trait EventSubscriber: Send + Sync + 'static {
    /// Registers additional named listeners for this type. Called once per
    /// concrete type, when the first instance is dispatched to or when the
    /// type is subscribed on a registry.
    fn register(table: &mut ListenerTable<Self>) -> Result<()>
    where
        Self: Sized,
    {
        let _ = table;
        Ok(())
    }

    /// Sink for listener failures: receives the failing listener's name and
    /// the error. The default logs and moves on.
    async fn on_dispatch_error(&self, listener: &str, error: &LavapoolError) {
        error!(listener, %error, "ignoring error in listener");
    }

    async fn on_node_ready(&self, event: &NodeEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    async fn on_track_start(&self, event: &NodeEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    async fn on_track_end(&self, event: &NodeEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    async fn on_track_stuck(&self, event: &NodeEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    async fn on_track_exception(&self, event: &NodeEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }

    async fn on_websocket_closed(&self, event: &NodeEvent) -> Result<()> {
        let _ = event;
        Ok(())
    }
}

type CachedTable = Arc<dyn Any + Send + Sync>;

static TABLES: OnceLock<RwLock<HashMap<TypeId, CachedTable>>> = OnceLock::new();

fn downcast<T: EventSubscriber>(entry: CachedTable) -> Result<Arc<ListenerTable<T>>> {
    entry.downcast::<ListenerTable<T>>().map_err(|_| {
        LavapoolError::Configuration("cached listener table has the wrong type".to_string())
    })
}

/// Returns the cached listener table for `T`, building it on first use.
///
/// The build is double-checked under the cache's write lock so concurrent
/// first construction produces exactly one table. A failed build is not
/// cached and surfaces as a configuration error on every attempt.
pub fn table_for<T: EventSubscriber>() -> Result<Arc<ListenerTable<T>>> {
    let cache = TABLES.get_or_init(|| RwLock::new(HashMap::new()));

    if let Some(entry) = cache
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&TypeId::of::<T>())
    {
        return downcast::<T>(Arc::clone(entry));
    }

    let mut cache = cache
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(entry) = cache.get(&TypeId::of::<T>()) {
        return downcast::<T>(Arc::clone(entry));
    }

    let mut table = ListenerTable::new();
    T::register(&mut table)?;
    let table: Arc<ListenerTable<T>> = Arc::new(table);
    cache.insert(TypeId::of::<T>(), table.clone());
    Ok(table)
}

/// Dispatches `event` to every listener `subscriber`'s type declares for it.
///
/// The built-in handler for the event (the `on_*` default method) runs
/// first, then each listener registered via
/// [`EventSubscriber::register`]. Every invocation is isolated: a failing
/// listener is reported to [`EventSubscriber::on_dispatch_error`] with its
/// name and the remaining listeners still run.
///
/// The only error this returns is a configuration failure while building
/// the type's listener table.
pub async fn dispatch<T: EventSubscriber>(subscriber: &T, event: &NodeEvent) -> Result<()> {
    let table = table_for::<T>()?;

    let (builtin_name, builtin_result) = match event.name() {
        crate::events::event_name::NODE_READY => {
            ("on_node_ready", subscriber.on_node_ready(event).await)
        }
        crate::events::event_name::TRACK_START => {
            ("on_track_start", subscriber.on_track_start(event).await)
        }
        crate::events::event_name::TRACK_END => {
            ("on_track_end", subscriber.on_track_end(event).await)
        }
        crate::events::event_name::TRACK_STUCK => {
            ("on_track_stuck", subscriber.on_track_stuck(event).await)
        }
        crate::events::event_name::TRACK_EXCEPTION => (
            "on_track_exception",
            subscriber.on_track_exception(event).await,
        ),
        crate::events::event_name::WEBSOCKET_CLOSED => (
            "on_websocket_closed",
            subscriber.on_websocket_closed(event).await,
        ),
        _ => ("", Ok(())),
    };
    if let Err(error) = builtin_result {
        subscriber.on_dispatch_error(builtin_name, &error).await;
    }

    for listener in table.listeners(event.name()) {
        if let Err(error) = (listener.handler)(subscriber, event).await {
            subscriber.on_dispatch_error(listener.name, &error).await;
        }
    }

    Ok(())
}

/// Object-safe wrapper so a registry can hold subscribers of mixed types.
#[async_trait]
pub(crate) trait DynSubscriber: Send + Sync {
    async fn deliver(&self, event: &NodeEvent);
}

pub(crate) struct SubscriberCell<T: EventSubscriber>(pub(crate) Arc<T>);

#[async_trait]
impl<T: EventSubscriber> DynSubscriber for SubscriberCell<T> {
    async fn deliver(&self, event: &NodeEvent) {
        if let Err(error) = dispatch(self.0.as_ref(), event).await {
            error!(%error, "subscriber dispatch failed");
        }
    }
}
