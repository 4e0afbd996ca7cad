//! Structured message → wire message.
//!
//! The walk never stops at the first problem: every schema node and every input key is
//! visited and each problem becomes one line in [`EncodeResult::errors`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::convert::to_wire;
use super::is_reserved;
use crate::fix::message::{BEGIN_STRING, MSG_TYPE};
use crate::fix::{FieldMap, WireMessage};
use crate::schema::{FieldDefs, FieldKind, MessageStructure, ScalarField};
use crate::structured::{Message, Value, HEADER_FIELD, TRAILER_FIELD};

#[derive(Debug)]
pub struct EncodeResult {
    pub message: WireMessage,
    pub errors: Vec<String>,
}

/// Encodes `message` as `structure`. Header and trailer are optional in the input and their
/// required members are not enforced; BeginString and MsgType always come from the codec.
pub fn encode(structure: &MessageStructure, message: &Message, begin_string: &str) -> EncodeResult {
    let mut wire = WireMessage::for_structure(structure);
    let mut encoder = Encoder { errors: Vec::new() };
    let path = structure.name.as_str();

    wire.header.set(BEGIN_STRING, begin_string);
    wire.header.set(MSG_TYPE, structure.msg_type.as_str());

    if let Some(header) = encoder.section(message, HEADER_FIELD, path) {
        encoder.fields(
            &structure.header.fields,
            &header.fields,
            &mut wire.header,
            &format!("{}.{}", path, HEADER_FIELD),
            false,
        );
        wire.header.set(BEGIN_STRING, begin_string);
        wire.header.set(MSG_TYPE, structure.msg_type.as_str());
    }

    encoder.fields(&structure.body.fields, &message.fields, &mut wire.body, path, true);

    if let Some(trailer) = encoder.section(message, TRAILER_FIELD, path) {
        encoder.fields(
            &structure.trailer.fields,
            &trailer.fields,
            &mut wire.trailer,
            &format!("{}.{}", path, TRAILER_FIELD),
            false,
        );
    }

    EncodeResult {
        message: wire,
        errors: encoder.errors,
    }
}

struct Encoder {
    errors: Vec<String>,
}

impl Encoder {
    fn section<'m>(&mut self, message: &'m Message, name: &str, path: &str) -> Option<&'m Message> {
        match message.get(name)? {
            Value::Null => None,
            Value::Message(section) => Some(section),
            other => {
                self.expected("MESSAGE_VALUE", other, path, name);
                None
            }
        }
    }

    fn fields(
        &mut self,
        defs: &FieldDefs,
        input: &BTreeMap<String, Value>,
        target: &mut FieldMap,
        path: &str,
        check_presence: bool,
    ) {
        for name in input.keys() {
            if !is_reserved(name) && !defs.contains(name) {
                self.errors.push(format!("Unexpected field: {}.{}", path, name));
            }
        }

        for def in defs.iter() {
            let name = def.name.as_str();
            let value = match input.get(name) {
                None | Some(Value::Null) => {
                    if check_presence && def.required {
                        self.errors.push(format!("Missing required field: {}.{}", path, name));
                    }
                    continue;
                }
                Some(value) => value,
            };

            match &def.kind {
                FieldKind::Field(field) => match value {
                    Value::Simple(text) => self.scalar(field, text, target, path, name),
                    other => self.expected("SIMPLE_VALUE", other, path, name),
                },
                FieldKind::Component(children) => match value {
                    Value::Message(component) => self.fields(
                        children,
                        &component.fields,
                        target,
                        &format!("{}.{}", path, name),
                        check_presence,
                    ),
                    other => self.expected("MESSAGE_VALUE", other, path, name),
                },
                FieldKind::Group(group) => match value {
                    Value::List(entries) => {
                        if entries.is_empty() {
                            if check_presence && def.required {
                                self.errors.push(format!("Missing required field: {}.{}", path, name));
                            }
                            target.set(group.tag, "0");
                        }
                        for (i, entry) in entries.iter().enumerate() {
                            let mut repetition = FieldMap::with_order(Arc::clone(&group.order));
                            self.fields(
                                &group.fields,
                                &entry.fields,
                                &mut repetition,
                                &format!("{}.{}[{}]", path, name, i),
                                check_presence,
                            );
                            target.add_group(group.tag, repetition);
                        }
                    }
                    other => self.expected("LIST_VALUE", other, path, name),
                },
            }
        }
    }

    fn scalar(&mut self, field: &ScalarField, text: &str, target: &mut FieldMap, path: &str, name: &str) {
        if let Some(codes) = &field.codes {
            match codes.code_for(text) {
                Some(code) => target.set(field.tag, code),
                None => self
                    .errors
                    .push(format!("Out of range value '{}' at: {}.{}", text, path, name)),
            }
            return;
        }
        match to_wire(field.scalar, text) {
            Ok(wire) => target.set(field.tag, wire),
            Err(kind) => self
                .errors
                .push(format!("Invalid {} value '{}' at: {}.{}", kind, text, path, name)),
        }
    }

    fn expected(&mut self, expected: &str, actual: &Value, path: &str, name: &str) {
        self.errors.push(format!(
            "Expected {} but got {} at: {}.{}",
            expected,
            actual.kind(),
            path,
            name
        ));
    }
}
