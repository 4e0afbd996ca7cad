//! Codec: structured messages ⇄ framed FIX bytes, driven by resolved message structures.
//!
//! [`Codec`] owns the immutable schema tables and a [`Validator`]. Each call picks an
//! [`ErrorSink`] from the settings, runs the engine and either fails with the collected
//! problems or reports them as warnings.

pub mod convert;
pub mod decode;
pub mod encode;
pub mod errors;

use log::{error, info, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{CodecError, Result, WireError};
use crate::fix::message::MSG_TYPE;
use crate::fix::{split_fields, WireMessage};
use crate::repository::{Repository, HEADER_COMPONENT, TRAILER_COMPONENT};
use crate::schema::{resolve_messages, MessageStructure};
use crate::settings::CodecSettings;
use crate::structured::{Message, HEADER_FIELD, SCENARIO_PROPERTY, TRAILER_FIELD};
use crate::validator::{PresenceValidator, Validator, ValidatorError};

pub use decode::{decode, is_present, DecodeResult};
pub use encode::{encode, EncodeResult};
pub use errors::{ErrorList, ErrorSink, LoggingSink, ReportingContext, WarningReport};

/// Keys never treated as ordinary members.
pub(crate) fn is_reserved(name: &str) -> bool {
    matches!(name, HEADER_COMPONENT | HEADER_FIELD | TRAILER_COMPONENT | TRAILER_FIELD)
}

/// Raw message as received from or sent to the outer system.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub body: Vec<u8>,
    pub properties: BTreeMap<String, String>,
    /// `true` when this system sent the message (outgoing direction).
    pub sent_by_self: bool,
}

impl RawMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

pub struct Codec {
    settings: CodecSettings,
    begin_string: String,
    by_name: HashMap<String, Arc<MessageStructure>>,
    by_type: HashMap<String, Arc<MessageStructure>>,
    validator: Box<dyn Validator>,
}

impl Codec {
    /// Resolves `repository` and validates with a [`PresenceValidator`] built from it.
    pub fn new(repository: &Repository, settings: CodecSettings) -> Result<Self> {
        let validator = PresenceValidator::new(repository)?;
        Self::with_validator(repository, settings, Box::new(validator))
    }

    pub fn with_validator(
        repository: &Repository,
        settings: CodecSettings,
        validator: Box<dyn Validator>,
    ) -> Result<Self> {
        let structures =
            resolve_messages(repository, settings.inline_components, settings.duplicate_policy)?;
        let mut by_name = HashMap::with_capacity(structures.len());
        let mut by_type = HashMap::with_capacity(structures.len());
        for (name, structure) in structures {
            let structure = Arc::new(structure);
            by_type
                .entry(structure.msg_type.clone())
                .or_insert_with(|| Arc::clone(&structure));
            by_name.insert(name, structure);
        }
        let begin_string = repository.begin_string().to_string();
        info!(
            "codec built version={} begin_string={} messages={} inline_components={}",
            repository.version,
            begin_string,
            by_name.len(),
            settings.inline_components
        );
        Ok(Self {
            settings,
            begin_string,
            by_name,
            by_type,
            validator,
        })
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    pub fn begin_string(&self) -> &str {
        &self.begin_string
    }

    pub fn structure(&self, name: &str) -> Option<&MessageStructure> {
        self.by_name.get(name).map(Arc::as_ref)
    }

    pub fn structure_for_type(&self, msg_type: &str) -> Option<&MessageStructure> {
        self.by_type.get(msg_type).map(Arc::as_ref)
    }

    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Encodes `message` (its `message_type` names the structure) into a wire message.
    pub fn encode(&self, message: &Message, context: &mut ReportingContext) -> Result<WireMessage> {
        let structure = self
            .structure(&message.message_type)
            .ok_or_else(|| CodecError::UnknownMessageType(message.message_type.clone()))?;
        trace!("encoding message_type={}", structure.name);

        let result = encode(structure, message, &self.begin_string);
        let scenario = self.scenario(&message.properties);

        let mut list = ErrorList::new();
        let mut report;
        let sink: &mut dyn ErrorSink = if self.settings.encode_error_as_warning {
            report = WarningReport::new(context);
            &mut report
        } else {
            &mut list
        };

        self.validate("Encoded", &structure.name, scenario, &result.message, sink)?;
        sink.append_all(result.errors);
        if sink.has_errors() {
            return Err(CodecError::Encode(sink.errors().to_vec()));
        }
        Ok(result.message)
    }

    /// [`encode`](Self::encode) followed by framing.
    pub fn encode_to_bytes(&self, message: &Message, context: &mut ReportingContext) -> Result<Vec<u8>> {
        Ok(self.encode(message, context)?.to_bytes())
    }

    /// Decodes one framed message. Properties of `raw` are copied onto the result.
    pub fn decode(&self, raw: &RawMessage, context: &mut ReportingContext) -> Result<Message> {
        let (fields, consumed) = split_fields(&raw.body)?;
        if consumed < raw.body.len() {
            warn!(
                "ignoring {} trailing byte(s) after CheckSum",
                raw.body.len() - consumed
            );
        }

        let begin_string = fields.first().map(|(_, value)| value.as_str()).unwrap_or_default();
        if begin_string != self.begin_string {
            return Err(WireError::BeginStringMismatch {
                expected: self.begin_string.clone(),
                actual: begin_string.to_string(),
            }
            .into());
        }
        let msg_type = fields
            .iter()
            .find(|(tag, _)| *tag == MSG_TYPE)
            .map(|(_, value)| value.as_str())
            .ok_or(WireError::MissingMsgType)?;
        let structure = self
            .structure_for_type(msg_type)
            .ok_or_else(|| CodecError::UnknownMessageType(msg_type.to_string()))?;
        trace!("decoding msg_type={} message_type={}", msg_type, structure.name);

        let wire = WireMessage::assemble(&fields, structure)?;
        let scenario = self.scenario(&raw.properties);

        let mut list = ErrorList::new();
        let mut logging = LoggingSink;
        let mut report;
        let sink: &mut dyn ErrorSink = if self.settings.encode_error_as_warning && raw.sent_by_self {
            &mut logging
        } else if self.settings.decode_error_as_warning {
            report = WarningReport::new(context);
            &mut report
        } else {
            &mut list
        };

        self.validate("Decoded", &structure.name, scenario, &wire, sink)?;
        let result = decode(structure, &wire);
        sink.append_all(result.errors);
        if sink.has_errors() {
            return Err(CodecError::Decode(sink.errors().to_vec()));
        }

        let mut message = result.message;
        message.properties = raw.properties.clone();
        Ok(message)
    }

    /// Decodes bytes that carry no properties.
    pub fn decode_bytes(&self, bytes: &[u8], context: &mut ReportingContext) -> Result<Message> {
        self.decode(&RawMessage::new(bytes), context)
    }

    fn scenario<'a>(&'a self, properties: &'a BTreeMap<String, String>) -> &'a str {
        properties
            .get(SCENARIO_PROPERTY)
            .map(String::as_str)
            .unwrap_or(&self.settings.default_scenario)
    }

    /// Validation failures are fatal; a validator that cannot run reports into `sink`,
    /// prefixed with `direction` (`Encoded` or `Decoded`).
    fn validate(
        &self,
        direction: &str,
        message_name: &str,
        scenario: &str,
        message: &WireMessage,
        sink: &mut dyn ErrorSink,
    ) -> Result<()> {
        match self.validator.validate(message_name, scenario, message) {
            Ok(()) => Ok(()),
            Err(ValidatorError::Failure(failure)) => Err(CodecError::Validation {
                msg_type: failure.msg_type,
                tags: failure.tags,
                scenario: failure.scenario,
                details: failure.details,
            }),
            Err(ValidatorError::Internal(reason)) => {
                error!("validator failed message_type={} scenario={}: {}", message_name, scenario, reason);
                sink.append(format!("{} message validation error: {}", direction, reason));
                Ok(())
            }
        }
    }
}
