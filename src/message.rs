/// Message envelope passed between flow components
///
/// Wraps an optional record payload with header parameters and the
/// unit-of-work boundary flag.

use crate::entity::Payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Header parameters: name -> serializable value
pub type HeaderParams = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Free-form parameters; keys are unique, merges are last-write-wins
    #[serde(default)]
    pub params: HeaderParams,

    /// Marks the final message of the current unit of work
    #[serde(default)]
    pub last_of_unit_of_work: bool,

    /// Flow step that produced the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originating_step_id: Option<String>,
}

impl MessageHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge parameters into the header, overriding existing keys.
    pub fn merge(&mut self, params: HeaderParams) {
        self.params.extend(params);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }
}

/// Either a header-only control signal or a record batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum MessageBody {
    Control,
    Data(Payload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID for tracking
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Timestamp when the message was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub header: MessageHeader,

    pub body: MessageBody,
}

impl Message {
    /// Create a message from a header and body
    pub fn with_header(header: MessageHeader, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            header,
            body,
        }
    }

    /// Create a control message with an empty header
    pub fn control() -> Self {
        Self::with_header(MessageHeader::new(), MessageBody::Control)
    }

    /// Create a data message carrying the given payload
    pub fn data(payload: Payload) -> Self {
        Self::with_header(MessageHeader::new(), MessageBody::Data(payload))
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header.set(name, value);
        self
    }

    pub fn is_control(&self) -> bool {
        matches!(self.body, MessageBody::Control)
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.body {
            MessageBody::Data(payload) => Some(payload),
            MessageBody::Control => None,
        }
    }

    pub fn payload_mut(&mut self) -> Option<&mut Payload> {
        match &mut self.body {
            MessageBody::Data(payload) => Some(payload),
            MessageBody::Control => None,
        }
    }

    pub fn into_payload(self) -> Option<Payload> {
        match self.body {
            MessageBody::Data(payload) => Some(payload),
            MessageBody::Control => None,
        }
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }

    pub fn is_last_of_unit_of_work(&self) -> bool {
        self.header.last_of_unit_of_work
    }

    pub fn set_last_of_unit_of_work(&mut self, last: bool) {
        self.header.last_of_unit_of_work = last;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityData;
    use serde_json::json;

    #[test]
    fn test_control_message_has_no_payload() {
        let message = Message::control();
        assert!(message.is_control());
        assert!(message.payload().is_none());
        assert!(!message.is_last_of_unit_of_work());
    }

    #[test]
    fn test_data_message_payload_access() {
        let mut row = EntityData::new();
        row.put("A1", "value1");
        let mut message = Message::data(vec![row]);

        assert!(!message.is_control());
        assert_eq!(message.payload().map(|p| p.len()), Some(1));

        message.payload_mut().unwrap().push(EntityData::new());
        assert_eq!(message.into_payload().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_header_merge_overrides_existing_keys() {
        let mut header = MessageHeader::new();
        header.set("batch", "one");
        header.set("keep", 1);

        let mut params = HeaderParams::new();
        params.insert("batch".to_string(), json!("two"));
        params.insert("extra".to_string(), json!(true));
        header.merge(params);

        assert_eq!(header.get("batch"), Some(&json!("two")));
        assert_eq!(header.get("keep"), Some(&json!(1)));
        assert_eq!(header.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn test_message_json_shape() {
        let mut row = EntityData::new();
        row.put("A1", "value1");
        let message = Message::data(vec![row]).with_param("file", "in.csv");

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["body"], json!({"type": "data", "payload": [{"A1": "value1"}]}));
        assert_eq!(value["header"]["params"], json!({"file": "in.csv"}));
    }

    #[test]
    fn test_message_minimal_json_defaults() {
        let message: Message = serde_json::from_str(
            r#"{"header": {"last_of_unit_of_work": true}, "body": {"type": "data", "payload": []}}"#,
        )
        .unwrap();

        assert!(message.is_last_of_unit_of_work());
        assert_eq!(message.payload().map(|p| p.len()), Some(0));

        let control: Message = serde_json::from_str(r#"{"body": {"type": "control"}}"#).unwrap();
        assert!(control.is_control());
    }
}
