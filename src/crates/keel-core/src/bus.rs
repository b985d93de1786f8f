//! Async pub-sub event bus with panic-isolated handlers
//!
//! The bus decouples publishers from handlers through a bounded mailbox
//! (capacity 100). [`EventBus::publish`] never blocks: when the mailbox is
//! full the event is dropped and counted - this is an intentional
//! backpressure choice, and callers that need lossless delivery must add an
//! outer queue of their own.
//!
//! A single dispatcher task drains the mailbox. For each event it snapshots
//! the subscriber set for that event type under a read lock, releases the
//! lock, and invokes every handler in a fresh concurrent task wrapped in a
//! panic trap. A panicking handler is logged and never corrupts the bus or
//! affects sibling handlers.
//!
//! # Ordering
//!
//! Events are dequeued in publish order by the single dispatcher, so handler
//! tasks are started in publish order - globally, across types. Between
//! subscribers of one event no order is defined: they run concurrently.
//!
//! # Shutdown
//!
//! [`EventBus::stop`] is idempotent (the stop signal is a one-shot taken
//! under a lock) and tells the dispatcher to exit. Handler tasks already in
//! flight are not interrupted. After stop, publishes are discarded.

use crate::events::{AgentEvent, EventType};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Default mailbox capacity
pub const DEFAULT_MAILBOX_CAPACITY: usize = 100;

/// Process-wide sequence for subscription ids.
///
/// An atomic counter rather than a timestamp: burst subscription must never
/// produce colliding ids.
static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique id of a subscription, formatted `{event_type}-{N}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    fn next(event_type: EventType) -> Self {
        let n = SUBSCRIPTION_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        Self(format!("{}-{}", event_type, n))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability invoked for every delivered event
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one delivered event.
    async fn handle(&self, event: AgentEvent);
}

/// Adapter turning an async closure into an [`EventHandler`]
pub struct FnHandler {
    f: Box<dyn Fn(AgentEvent) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl FnHandler {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(AgentEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            f: Box::new(move |event| f(event).boxed()),
        }
    }
}

#[async_trait]
impl EventHandler for FnHandler {
    async fn handle(&self, event: AgentEvent) {
        (self.f)(event).await
    }
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

type SubscriptionMap = HashMap<EventType, Vec<Subscription>>;

/// Async pub-sub spine connecting the runtime's subsystems
pub struct EventBus {
    tx: mpsc::Sender<AgentEvent>,
    subscriptions: Arc<RwLock<SubscriptionMap>>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the default mailbox capacity and start its
    /// dispatcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    /// Create a bus with a custom mailbox capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let subscriptions: Arc<RwLock<SubscriptionMap>> = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(Self::dispatch(rx, stop_rx, Arc::clone(&subscriptions)));

        Self {
            tx,
            subscriptions,
            stop: Mutex::new(Some(stop_tx)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn dispatch(
        mut rx: mpsc::Receiver<AgentEvent>,
        mut stop_rx: oneshot::Receiver<()>,
        subscriptions: Arc<RwLock<SubscriptionMap>>,
    ) {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    // Snapshot under the read lock, release before invoking.
                    let subscribers: Vec<Subscription> = {
                        let map = subscriptions.read().await;
                        map.get(&event.event_type()).cloned().unwrap_or_default()
                    };
                    for subscription in subscribers {
                        let event = event.clone();
                        tokio::spawn(async move {
                            let outcome = AssertUnwindSafe(subscription.handler.handle(event))
                                .catch_unwind()
                                .await;
                            if let Err(panic) = outcome {
                                let message = panic
                                    .downcast_ref::<&str>()
                                    .map(|s| s.to_string())
                                    .or_else(|| panic.downcast_ref::<String>().cloned())
                                    .unwrap_or_else(|| "non-string panic payload".to_string());
                                tracing::error!(
                                    subscription = %subscription.id,
                                    panic = %message,
                                    "event handler panicked"
                                );
                            }
                        });
                    }
                }
            }
        }
        tracing::debug!("event bus dispatcher exited");
    }

    /// Publish an event without blocking.
    ///
    /// Returns `true` if the event was accepted into the mailbox. A full
    /// mailbox drops the event (counted, see
    /// [`dropped_count`](Self::dropped_count)); a stopped bus discards it.
    pub fn publish(&self, event: AgentEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_type = %event.event_type(),
                    "event mailbox full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("publish on stopped event bus discarded");
                false
            }
        }
    }

    /// Subscribe a handler to one event type.
    pub async fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId::next(event_type);
        let mut map = self.subscriptions.write().await;
        map.entry(event_type).or_default().push(Subscription {
            id: id.clone(),
            handler,
        });
        id
    }

    /// Remove a subscription. Returns `false` if the id was not found.
    ///
    /// When the last subscription for a type is removed, the type entry
    /// itself is dropped to bound map growth.
    pub async fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut map = self.subscriptions.write().await;
        let mut emptied = None;
        let mut removed = false;
        for (event_type, subscriptions) in map.iter_mut() {
            if let Some(pos) = subscriptions.iter().position(|s| &s.id == id) {
                subscriptions.remove(pos);
                removed = true;
                if subscriptions.is_empty() {
                    emptied = Some(*event_type);
                }
                break;
            }
        }
        if let Some(event_type) = emptied {
            map.remove(&event_type);
        }
        removed
    }

    /// Number of live subscriptions for the given type.
    pub async fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscriptions
            .read()
            .await
            .get(&event_type)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Number of events dropped due to mailbox overflow.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Signal the dispatcher to exit. Idempotent.
    ///
    /// In-flight handler tasks are not interrupted.
    pub fn stop(&self) {
        if let Ok(mut guard) = self.stop.lock() {
            if let Some(stop_tx) = guard.take() {
                let _ = stop_tx.send(());
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventPayload;
    use crate::state::AgentState;
    use std::time::Duration;

    fn state_change(agent_id: &str) -> AgentEvent {
        AgentEvent::new(
            agent_id,
            EventPayload::StateChange {
                from: AgentState::Init,
                to: AgentState::Ready,
            },
        )
    }

    fn token_event(agent_id: &str, token: &str) -> AgentEvent {
        AgentEvent::new(
            agent_id,
            EventPayload::Token {
                token: token.to_string(),
                delta: token.to_string(),
            },
        )
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn test_publish_delivers_to_subscriber() {
        let bus = EventBus::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        bus.subscribe(
            EventType::Token,
            Arc::new(FnHandler::new(move |event| {
                let sink = Arc::clone(&sink);
                async move {
                    if let EventPayload::Token { token, .. } = event.payload {
                        sink.lock().unwrap().push(token);
                    }
                }
            })),
        )
        .await;

        for i in 0..5 {
            assert!(bus.publish(token_event("agent-1", &format!("t{i}"))));
        }

        wait_for(|| received.lock().unwrap().len() == 5).await;
        let mut tokens = received.lock().unwrap().clone();
        tokens.sort();
        assert_eq!(tokens, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn test_subscription_ids_are_unique_and_typed() {
        let bus = EventBus::new();
        let handler: Arc<dyn EventHandler> = Arc::new(FnHandler::new(|_| async {}));

        let a = bus.subscribe(EventType::Token, Arc::clone(&handler)).await;
        let b = bus.subscribe(EventType::Token, Arc::clone(&handler)).await;
        let c = bus.subscribe(EventType::StateChange, handler).await;

        assert_ne!(a, b);
        assert!(a.as_str().starts_with("token-"));
        assert!(c.as_str().starts_with("state_change-"));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery_and_prunes_type() {
        let bus = EventBus::new();
        let handler: Arc<dyn EventHandler> = Arc::new(FnHandler::new(|_| async {}));

        let id = bus.subscribe(EventType::Complete, handler).await;
        assert_eq!(bus.subscriber_count(EventType::Complete).await, 1);

        assert!(bus.unsubscribe(&id).await);
        assert_eq!(bus.subscriber_count(EventType::Complete).await, 0);
        assert!(!bus.unsubscribe(&id).await);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_affect_siblings() {
        let bus = EventBus::new();
        let received = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&received);

        bus.subscribe(
            EventType::StateChange,
            Arc::new(FnHandler::new(|_| async { panic!("handler exploded") })),
        )
        .await;
        bus.subscribe(
            EventType::StateChange,
            Arc::new(FnHandler::new(move |_| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().unwrap() += 1;
                }
            })),
        )
        .await;

        for _ in 0..3 {
            bus.publish(state_change("agent-1"));
        }

        wait_for(|| *received.lock().unwrap() == 3).await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_rejects_publishes() {
        let bus = EventBus::new();
        bus.stop();
        bus.stop();

        // Give the dispatcher a moment to drop the receiver.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!bus.publish(state_change("agent-1")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribe_unsubscribe_publish() {
        let bus = Arc::new(EventBus::new());
        let mut tasks = Vec::new();

        for t in 0..50 {
            let bus = Arc::clone(&bus);
            tasks.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for i in 0..50 {
                    let handler: Arc<dyn EventHandler> = Arc::new(FnHandler::new(|_| async {}));
                    ids.push(bus.subscribe(EventType::Token, handler).await);
                    bus.publish(token_event(&format!("agent-{t}"), &format!("t{i}")));
                }
                for id in &ids {
                    assert!(bus.unsubscribe(id).await);
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(bus.subscriber_count(EventType::Token).await, 0);
    }
}
