//! Generic structured message exchanged with the outer system.
//!
//! A message is a tree of named values. Header and trailer travel as nested messages under
//! the reserved [`HEADER_FIELD`] / [`TRAILER_FIELD`] keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HEADER_FIELD: &str = "header";
pub const TRAILER_FIELD: &str = "trailer";

/// Message property selecting the validation scenario.
pub const SCENARIO_PROPERTY: &str = "th2.codec.orchestra.scenario";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Symbolic message type; empty for nested components and group entries.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Simple(String),
    Message(Message),
    List(Vec<Message>),
}

impl Value {
    /// Shape name used in structural error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL_VALUE",
            Value::Simple(_) => "SIMPLE_VALUE",
            Value::Message(_) => "MESSAGE_VALUE",
            Value::List(_) => "LIST_VALUE",
        }
    }

    pub fn as_simple(&self) -> Option<&str> {
        match self {
            Value::Simple(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Message]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Simple(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Simple(s)
    }
}

impl From<Message> for Value {
    fn from(m: Message) -> Self {
        Value::Message(m)
    }
}

impl From<Vec<Message>> for Value {
    fn from(l: Vec<Message>) -> Self {
        Value::List(l)
    }
}

impl Message {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            ..Default::default()
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_simple(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_simple)
    }

    pub fn get_message(&self, name: &str) -> Option<&Message> {
        self.get(name).and_then(Value::as_message)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Message]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn header(&self) -> Option<&Message> {
        self.get_message(HEADER_FIELD)
    }

    pub fn trailer(&self) -> Option<&Message> {
        self.get_message(TRAILER_FIELD)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_is_plain_tree() {
        let message = Message::new("ExecutionReport")
            .with("OrderID", "54")
            .with("Instrument", Message::default().with("SecurityID", "INSTR2"))
            .with(
                "NoPartyIDs",
                vec![Message::default().with("PartyID", "DEMO")],
            )
            .with("Text", Value::Null);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messageType": "ExecutionReport",
                "Instrument": {"SecurityID": "INSTR2"},
                "NoPartyIDs": [{"PartyID": "DEMO"}],
                "OrderID": "54",
                "Text": null
            })
        );
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn accessors_check_shape() {
        let message = Message::default().with("A", "1").with("B", Message::default());
        assert_eq!(message.get_simple("A"), Some("1"));
        assert!(message.get_simple("B").is_none());
        assert!(message.get_message("B").is_some());
        assert!(message.get_list("A").is_none());
        assert_eq!(Value::Null.kind(), "NULL_VALUE");
    }
}
