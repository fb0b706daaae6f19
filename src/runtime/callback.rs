//! Forwarding contract between a component and whatever sits downstream.

use crate::error::Result;
use crate::message::{HeaderParams, Message, MessageBody, MessageHeader};

/// Callback a component uses to emit messages downstream.
///
/// Each call produces at most one downstream send; nothing is buffered.
/// Payload row order and the boundary flag are passed through untouched.
pub trait SendMessageCallback {
    /// Pass a message along unchanged.
    fn forward(&mut self, message: Message) -> Result<()>;

    /// Merge `params` into the message header (overriding on key collision)
    /// and forward it.
    fn forward_with_params(&mut self, params: HeaderParams, mut message: Message) -> Result<()> {
        message.header_mut().merge(params);
        self.forward(message)
    }

    /// Synthesize a control message carrying only `params` and forward it.
    fn send_control_message(&mut self, params: HeaderParams) -> Result<()> {
        let header = MessageHeader {
            params,
            ..MessageHeader::default()
        };
        self.forward(Message::with_header(header, MessageBody::Control))
    }
}

/// Callback that keeps every forwarded message in order.
#[derive(Debug, Default)]
pub struct CollectingCallback {
    messages: Vec<Message>,
}

impl CollectingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Forwarded data messages only.
    pub fn data_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !m.is_control())
    }

    /// Forwarded control messages only.
    pub fn control_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_control())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Take the collected messages, leaving the callback empty.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }
}

impl SendMessageCallback for CollectingCallback {
    fn forward(&mut self, message: Message) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityData;
    use serde_json::json;

    #[test]
    fn test_forward_with_params_overrides() {
        let mut callback = CollectingCallback::new();
        let message = Message::data(vec![EntityData::new()])
            .with_param("source", "upstream")
            .with_param("keep", 1);

        let mut params = HeaderParams::new();
        params.insert("source".to_string(), json!("script"));
        callback.forward_with_params(params, message).unwrap();

        let forwarded = &callback.messages()[0];
        assert_eq!(forwarded.header().get("source"), Some(&json!("script")));
        assert_eq!(forwarded.header().get("keep"), Some(&json!(1)));
        assert_eq!(forwarded.payload().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_send_control_message() {
        let mut callback = CollectingCallback::new();
        let mut params = HeaderParams::new();
        params.insert("phase".to_string(), json!("startup"));

        callback.send_control_message(params).unwrap();
        callback.send_control_message(HeaderParams::new()).unwrap();

        assert_eq!(callback.control_messages().count(), 2);
        assert_eq!(callback.data_messages().count(), 0);
        assert_eq!(callback.messages()[0].header().get("phase"), Some(&json!("startup")));
        assert!(callback.messages()[1].header().params.is_empty());
    }

    #[test]
    fn test_forward_preserves_boundary_flag() {
        let mut callback = CollectingCallback::new();
        let mut message = Message::data(Vec::new());
        message.set_last_of_unit_of_work(true);

        callback.forward(message).unwrap();

        let drained = callback.drain();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_last_of_unit_of_work());
        assert!(callback.is_empty());
    }
}
