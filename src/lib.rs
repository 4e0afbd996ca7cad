//! # Orchestra FIX Codec
//!
//! Schema-driven conversion between generic structured messages and the FIX tag-value
//! wire format. The schema comes from a FIX Orchestra repository: message types,
//! components, repeating groups, fields and code sets.
//!
//! ## Entry point
//!
//! Load a [`Repository`], build a [`Codec`] with [`Codec::new`], then call
//! [`Codec::encode`] / [`Codec::encode_to_bytes`] and [`Codec::decode`].
//!
//! ## Example
//!
//! ```rust
//! use orchestra_fix_codec::{Codec, CodecSettings, Message, ReportingContext, Repository};
//!
//! let json = r#"{
//!     "version": "FIX.4.4",
//!     "fields": [
//!         {"id": 8, "name": "BeginString", "type": "String"},
//!         {"id": 9, "name": "BodyLength", "type": "Length"},
//!         {"id": 35, "name": "MsgType", "type": "String"},
//!         {"id": 10, "name": "CheckSum", "type": "String"},
//!         {"id": 112, "name": "TestReqID", "type": "String"}
//!     ],
//!     "components": [
//!         {"id": 1024, "name": "StandardHeader", "members": [
//!             {"kind": "field", "id": 8, "presence": "required"},
//!             {"kind": "field", "id": 9, "presence": "required"},
//!             {"kind": "field", "id": 35, "presence": "required"}
//!         ]},
//!         {"id": 1025, "name": "StandardTrailer", "members": [
//!             {"kind": "field", "id": 10, "presence": "required"}
//!         ]}
//!     ],
//!     "messages": [{
//!         "name": "Heartbeat",
//!         "msgType": "0",
//!         "structure": [
//!             {"kind": "component", "id": 1024, "presence": "required"},
//!             {"kind": "field", "id": 112},
//!             {"kind": "component", "id": 1025, "presence": "required"}
//!         ]
//!     }]
//! }"#;
//! let repository = Repository::from_json_str(json).unwrap();
//! let codec = Codec::new(&repository, CodecSettings::default()).unwrap();
//!
//! let mut context = ReportingContext::new();
//! let heartbeat = Message::new("Heartbeat").with("TestReqID", "T1");
//! let bytes = codec.encode_to_bytes(&heartbeat, &mut context).unwrap();
//! assert!(bytes.starts_with(b"8=FIX.4.4\x019="));
//!
//! let decoded = codec.decode_bytes(&bytes, &mut context).unwrap();
//! assert_eq!(decoded.get_simple("TestReqID"), Some("T1"));
//! ```
//!
//! ## Lower-level API
//!
//! [`schema::resolve_messages`] produces the per-message structures, [`encode`] and
//! [`decode`] run the engines against them with an explicit error list, and [`fix`]
//! frames and splits wire bytes.

pub mod codec;
pub mod error;
pub mod fix;
pub mod repository;
pub mod schema;
pub mod settings;
pub mod structured;
pub mod validator;

pub use codec::{
    decode, encode, Codec, DecodeResult, EncodeResult, ErrorList, ErrorSink, LoggingSink, RawMessage,
    ReportingContext, WarningReport,
};
pub use error::{CodecError, Result, SchemaError, WireError};
pub use fix::{FieldMap, FixWriter, WireMessage};
pub use repository::{Presence, Repository};
pub use schema::{DuplicatePolicy, MessageStructure};
pub use settings::CodecSettings;
pub use structured::{Message, Value};
pub use validator::{NoValidation, PresenceValidator, ValidationFailure, Validator, ValidatorError};
