mod message;
pub use message::Message;

/// Classifier attached to every status message.
///
/// The vocabulary is owned by producers; the router never interprets it.
pub type MessageType = String;
