use outpost_model::MessageType;

/// What `dispatch` does when a subscriber's mailbox is full.
///
/// Dispatch never waits on a subscriber; the router lock is held only for
/// non-blocking sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Remove the subscriber. Its mailbox yields what is already queued, then closes.
    ///
    /// Connected subscribers therefore never observe a gap in the sequence.
    #[default]
    Disconnect,
    /// Skip this message for that subscriber only and keep it registered.
    DropNewest,
}

/// Extra behaviour requested at subscription time.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    pub(crate) notify_latest: Vec<MessageType>,
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill the mailbox with the most recent message of `kind`, if any was dispatched.
    pub fn notify_latest(mut self, kind: impl Into<MessageType>) -> Self {
        self.notify_latest.push(kind.into());
        self
    }
}
