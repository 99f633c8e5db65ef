//! Named-topic publish/subscribe for signals that live outside navigation,
//! such as the unread-notification badge.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use storyflow_core::NotificationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NotificationReceived,
    NotificationsRead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NotificationReceived { id: NotificationId },
    NotificationsRead,
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Self::NotificationReceived { .. } => Topic::NotificationReceived,
            Self::NotificationsRead => Topic::NotificationsRead,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<Topic, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let mut removed = false;
        for subs in handlers.values_mut() {
            let before = subs.len();
            subs.retain(|(sid, _)| *sid != id);
            removed |= subs.len() != before;
        }
        removed
    }

    /// Deliver `event` to every subscriber of its topic. Handlers run outside
    /// the registry lock so they may publish or subscribe themselves.
    pub fn publish(&self, event: &Event) -> usize {
        let targets: Vec<Handler> = self
            .handlers
            .read()
            .get(&event.topic())
            .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &targets {
            handler(event);
        }
        tracing::trace!(topic = ?event.topic(), delivered = targets.len(), "event published");
        targets.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("EventBus")
            .field("topics", &handlers.len())
            .finish_non_exhaustive()
    }
}

/// Unread badge fed by the bus. Redelivering the same notification does not
/// change the count.
#[derive(Debug, Clone)]
pub struct UnreadCounter {
    unread: Arc<Mutex<HashSet<NotificationId>>>,
    subscriptions: [SubscriptionId; 2],
}

impl UnreadCounter {
    pub fn attach(bus: &EventBus) -> Self {
        let unread: Arc<Mutex<HashSet<NotificationId>>> = Arc::default();

        let on_received = {
            let unread = Arc::clone(&unread);
            bus.subscribe(Topic::NotificationReceived, move |event| {
                if let Event::NotificationReceived { id } = event {
                    unread.lock().insert(id.clone());
                }
            })
        };
        let on_read = {
            let unread = Arc::clone(&unread);
            bus.subscribe(Topic::NotificationsRead, move |_| unread.lock().clear())
        };

        Self {
            unread,
            subscriptions: [on_received, on_read],
        }
    }

    /// Replace the unread set with a server-provided snapshot.
    pub fn reset_to(&self, ids: impl IntoIterator<Item = NotificationId>) {
        *self.unread.lock() = ids.into_iter().collect();
    }

    pub fn count(&self) -> usize {
        self.unread.lock().len()
    }

    pub fn detach(self, bus: &EventBus) {
        for id in self.subscriptions {
            bus.unsubscribe(id);
        }
    }
}
