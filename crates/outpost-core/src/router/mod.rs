//! In-process publish/subscribe for status messages.
//!
//! `dispatch`, `subscribe` and `unsubscribe` share one lock, so they are totally
//! ordered: a subscriber registered before a dispatch receives it, one registered
//! after does not. Each subscriber owns a bounded queue; a full queue is handled by
//! the router's [`OverflowPolicy`] instead of blocking the producer.
mod mailbox;
mod options;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use outpost_model::{Message, MessageType};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

pub use mailbox::{Mailbox, Subscription};
pub use options::{OverflowPolicy, SubscribeOptions};

/// Queue length of every mailbox unless overridden.
pub const MAILBOX_CAPACITY: usize = 8;

/// How many distinct message types keep a latest value for replay.
///
/// Types are chosen by producers, so the map is bounded; once full, only
/// already-known types are updated.
pub const LATEST_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct RouterInner {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::Sender<Message>>,
    latest: HashMap<MessageType, Message>,
}

/// Cheap to clone; clones share the same subscriber set.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    inner: Arc<Mutex<RouterInner>>,
    policy: OverflowPolicy,
    capacity: usize,
    latest_capacity: usize,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RouterInner::default())),
            policy: OverflowPolicy::default(),
            capacity: MAILBOX_CAPACITY,
            latest_capacity: LATEST_CAPACITY,
        }
    }

    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Bounds the number of message types remembered for replay. `0` disables replay.
    pub fn with_latest_capacity(mut self, types: usize) -> Self {
        self.latest_capacity = types;
        self
    }

    #[inline]
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, RouterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `msg` to every current subscriber.
    pub fn dispatch(&self, msg: Message) {
        let mut inner = self.lock();
        if let Some(slot) = inner.latest.get_mut(&msg.kind) {
            *slot = msg.clone();
        } else if inner.latest.len() < self.latest_capacity {
            inner.latest.insert(msg.kind.clone(), msg.clone());
        } else {
            trace!(kind = %msg.kind, "latest-message table full; type not remembered");
        }

        let mut evicted = Vec::new();
        for (&id, tx) in &inner.subscribers {
            match tx.try_send(msg.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => match self.policy {
                    OverflowPolicy::Disconnect => {
                        warn!(subscriber = id, kind = %msg.kind, "mailbox full; disconnecting subscriber");
                        evicted.push(id);
                    }
                    OverflowPolicy::DropNewest => {
                        warn!(subscriber = id, kind = %msg.kind, "mailbox full; message dropped for subscriber");
                    }
                },
                Err(TrySendError::Closed(_)) => evicted.push(id),
            }
        }
        for id in evicted {
            inner.subscribers.remove(&id);
        }
        trace!(kind = %msg.kind, subscribers = inner.subscribers.len(), "message dispatched");
    }

    pub fn subscribe(&self) -> Mailbox {
        self.subscribe_with(SubscribeOptions::default())
    }

    pub fn subscribe_with(&self, opts: SubscribeOptions) -> Mailbox {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut inner = self.lock();

        for kind in &opts.notify_latest {
            if let Some(msg) = inner.latest.get(kind) {
                let _ = tx.try_send(msg.clone());
            }
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, tx);
        debug!(subscriber = id, total = inner.subscribers.len(), "subscribed");

        Mailbox { id, rx }
    }

    /// Like [`MessageRouter::subscribe_with`], but unsubscribes when the result is dropped.
    pub fn attach(&self, opts: SubscribeOptions) -> Subscription {
        let mailbox = self.subscribe_with(opts);
        Subscription::new(self.clone(), mailbox)
    }

    /// Removes the mailbox from the subscriber set. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, mailbox: &Mailbox) -> bool {
        let mut inner = self.lock();
        let removed = inner.subscribers.remove(&mailbox.id).is_some();
        if removed {
            debug!(subscriber = mailbox.id, total = inner.subscribers.len(), "unsubscribed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Most recent message dispatched with the given type.
    pub fn latest(&self, kind: &str) -> Option<Message> {
        self.lock().latest.get(kind).cloned()
    }
}
