//! Fan-out of server events to every connected viewer.
//!
//! Built on a `tokio::sync::broadcast` channel: every subscriber owns a
//! bounded queue, and a subscriber that falls behind loses its oldest
//! messages instead of slowing down the publisher or anyone else.
//!
//! # Subscription Lifecycle
//!
//! 1. [`Broadcaster::subscribe_with`] registers the subscriber and queues a
//!    greeting that is delivered before anything published afterwards
//! 2. [`Broadcaster::publish`] pushes to every registered subscriber
//! 3. Dropping the [`Subscriber`] unregisters it; messages still queued for
//!    it are discarded

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::protocol::ServerEvent;

/// Identifies one subscriber for the lifetime of the broadcaster.
pub type SubscriberId = u64;

/// Publish/subscribe hub for [`ServerEvent`]s.
pub struct Broadcaster {
    sender: broadcast::Sender<ServerEvent>,
    subscribers: Arc<SubscriberSet>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct SubscriberSet {
    ids: Mutex<HashSet<SubscriberId>>,
}

impl SubscriberSet {
    fn ids(&self) -> std::sync::MutexGuard<'_, HashSet<SubscriberId>> {
        // The set is only ever inserted into or removed from; a panic while
        // holding the lock cannot leave it half-updated.
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Broadcaster {
    /// Create a broadcaster whose subscribers each buffer up to
    /// `queue_capacity` messages (at least one).
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(queue_capacity.max(1));
        Self {
            sender,
            subscribers: Arc::new(SubscriberSet::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber with no greeting.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber {
        self.register(None)
    }

    /// Register a new subscriber whose first received message is `greeting`.
    #[must_use]
    pub fn subscribe_with(&self, greeting: ServerEvent) -> Subscriber {
        self.register(Some(greeting))
    }

    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    fn register(&self, greeting: Option<ServerEvent>) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.sender.subscribe();
        self.subscribers.ids().insert(id);
        tracing::debug!(subscriber = id, "subscriber registered");

        Subscriber {
            id,
            greeting,
            receiver,
            lagged: false,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Send `event` to every subscriber. Never blocks.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, event: ServerEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!(event = name, "no subscribers, event dropped");
                0
            }
        }
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.ids().len()
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers.ids().contains(&id)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(crate::config::ServerConfig::DEFAULT_SUBSCRIBER_QUEUE)
    }
}

/// One viewer's view of the broadcast stream.
pub struct Subscriber {
    id: SubscriberId,
    greeting: Option<ServerEvent>,
    receiver: broadcast::Receiver<ServerEvent>,
    lagged: bool,
    subscribers: Arc<SubscriberSet>,
}

impl Subscriber {
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the broadcaster is gone. Skips over messages lost
    /// to a full queue and records the loss for [`Subscriber::take_lagged`].
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        if let Some(greeting) = self.greeting.take() {
            return Some(greeting);
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(count)) => {
                    tracing::warn!(subscriber = self.id, "subscriber lagged, dropped {count} messages");
                    self.lagged = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        if let Some(greeting) = self.greeting.take() {
            return Some(greeting);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(count)) => {
                    tracing::warn!(subscriber = self.id, "subscriber lagged, dropped {count} messages");
                    self.lagged = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Whether messages were dropped since the last call. Clears the mark.
    pub fn take_lagged(&mut self) -> bool {
        std::mem::take(&mut self.lagged)
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.subscribers.ids().remove(&self.id);
        tracing::debug!(subscriber = self.id, "subscriber unregistered");
    }
}
