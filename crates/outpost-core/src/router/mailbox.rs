use outpost_model::Message;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::MessageRouter;

/// Receiving end of one subscriber.
#[derive(Debug)]
pub struct Mailbox {
    pub(crate) id: u64,
    pub(crate) rx: mpsc::Receiver<Message>,
}

impl Mailbox {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next message; `None` once the router dropped this subscriber and the queue is drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// A mailbox that unsubscribes itself when dropped.
#[derive(Debug)]
pub struct Subscription {
    router: MessageRouter,
    mailbox: Mailbox,
}

impl Subscription {
    pub(crate) fn new(router: MessageRouter, mailbox: Mailbox) -> Self {
        Self { router, mailbox }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.mailbox.id
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.mailbox.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.mailbox.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.router.unsubscribe(&self.mailbox);
    }
}
