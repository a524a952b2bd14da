//! Broadcast event bus.

use std::pin::Pin;

use futures_util::{future, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use ytclip_models::{Event, EventTopic};

/// Default channel capacity. Progress events are frequent, so this is sized
/// to absorb a burst from a slow UI bridge.
pub const DEFAULT_CAPACITY: usize = 256;

/// Stream of events returned by [`EventBus::stream`].
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Publish/subscribe channel shared by every backend component.
///
/// Delivery is best-effort to current subscribers only: there is no replay,
/// so a subscriber misses whatever was published before it subscribed.
/// Events from one publisher reach a subscriber in publish order.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Sync call, usable from blocking threads. Returns how many
    /// subscribers the event was handed to (zero is not an error).
    pub fn publish(&self, event: Event) -> usize {
        let topic = event.topic();
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!(topic = %topic, "Event dropped, no subscribers");
                0
            }
        }
    }

    /// Subscribe to every future event.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stream of every future event. Lagged events are skipped with a warning.
    pub fn stream_all(&self) -> EventStream {
        let rx = self.tx.subscribe();
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Box::pin(stream)
    }

    /// Stream of future events for one topic.
    pub fn stream(&self, topic: EventTopic) -> EventStream {
        Box::pin(
            self.stream_all()
                .filter(move |event| future::ready(event.topic() == topic)),
        )
    }

    /// Call `handler` for every future event on `topic`.
    ///
    /// The handler runs on a spawned task, so this must be called from
    /// within a tokio runtime. Delivery stops when the returned
    /// [`Subscription`] is dropped.
    pub fn on<F>(&self, topic: EventTopic, handler: F) -> Subscription
    where
        F: Fn(Event) + Send + 'static,
    {
        Self::spawn_handler(self.stream(topic), handler)
    }

    fn spawn_handler<F>(mut stream: EventStream, handler: F) -> Subscription
    where
        F: Fn(Event) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                handler(event);
            }
        });
        Subscription { handle }
    }
}

/// Handle for a handler registered with [`EventBus::on`].
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering events to the handler.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
