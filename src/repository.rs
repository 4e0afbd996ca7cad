//! In-memory FIX Orchestra repository graph.
//!
//! This is the input of schema resolution. The structs deserialize from a JSON rendition
//! of the repository (camelCase keys); parsing the XML form is left to external tooling.

use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::CodecError;

/// Name of the component every message carries as its header.
pub const HEADER_COMPONENT: &str = "StandardHeader";
/// Name of the component every message carries as its trailer.
pub const TRAILER_COMPONENT: &str = "StandardTrailer";

/// Whole repository for one protocol version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Protocol version, e.g. `FIX.5.0SP2` or `FIX.4.4`.
    pub version: String,
    #[serde(default)]
    pub fields: Vec<FieldType>,
    #[serde(default)]
    pub code_sets: Vec<CodeSet>,
    #[serde(default)]
    pub components: Vec<ComponentType>,
    #[serde(default)]
    pub groups: Vec<GroupType>,
    #[serde(default)]
    pub messages: Vec<MessageType>,
}

impl Repository {
    pub fn from_json_str(json: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CodecError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// BeginString (8) for messages of this repository. FIX 5.x runs over FIXT.1.1.
    pub fn begin_string(&self) -> &str {
        if self.version.starts_with("FIX.5") {
            "FIXT.1.1"
        } else {
            &self.version
        }
    }
}

/// Field declaration. `id` doubles as the wire tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldType {
    pub id: u32,
    pub name: String,
    /// Datatype name (`int`, `Price`, `UTCTimestamp`, ...) or the name of a code set.
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSet {
    pub name: String,
    /// Underlying datatype of the codes (`char`, `int`, `String`, ...).
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub codes: Vec<Code>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentType {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupType {
    pub id: u32,
    pub name: String,
    /// Field id of the NumInGroup counter.
    pub num_in_group: u32,
    #[serde(default)]
    pub members: Vec<MemberRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageType {
    pub name: String,
    pub msg_type: String,
    #[serde(default = "default_scenario")]
    pub scenario: String,
    #[serde(default)]
    pub structure: Vec<MemberRef>,
}

fn default_scenario() -> String {
    "base".to_string()
}

/// Reference from a message, component or group to one of its members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MemberRef {
    Field {
        id: u32,
        #[serde(default)]
        presence: Presence,
    },
    Component {
        id: u32,
        #[serde(default)]
        presence: Presence,
    },
    Group {
        id: u32,
        #[serde(default)]
        presence: Presence,
    },
}

impl MemberRef {
    pub fn presence(&self) -> Presence {
        match *self {
            MemberRef::Field { presence, .. }
            | MemberRef::Component { presence, .. }
            | MemberRef::Group { presence, .. } => presence,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Presence {
    #[default]
    Optional,
    Required,
    Forbidden,
    Ignored,
    Constant,
}

impl Presence {
    pub fn is_required(self) -> bool {
        matches!(self, Presence::Required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix5_versions_use_fixt_transport() {
        let mut repo = Repository {
            version: "FIX.5.0SP2".into(),
            ..Default::default()
        };
        assert_eq!(repo.begin_string(), "FIXT.1.1");
        repo.version = "FIX.4.4".into();
        assert_eq!(repo.begin_string(), "FIX.4.4");
    }

    #[test]
    fn member_refs_deserialize_with_default_presence() {
        let json = r#"{
            "version": "FIX.4.4",
            "messages": [{
                "name": "Heartbeat",
                "msgType": "0",
                "structure": [
                    {"kind": "component", "id": 1024, "presence": "required"},
                    {"kind": "field", "id": 112}
                ]
            }]
        }"#;
        let repo = Repository::from_json_str(json).unwrap();
        let message = &repo.messages[0];
        assert_eq!(message.scenario, "base");
        assert_eq!(
            message.structure,
            vec![
                MemberRef::Component { id: 1024, presence: Presence::Required },
                MemberRef::Field { id: 112, presence: Presence::Optional },
            ]
        );
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = Repository::from_json_str("{").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
