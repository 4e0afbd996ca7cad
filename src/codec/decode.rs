//! Wire message → structured message.
//!
//! Mirrors [`encode`](super::encode): the whole message is walked and problems are
//! collected. Required members are checked in every section; tags the schema does not
//! name are not an error.

use super::convert::from_wire;
use crate::fix::{FieldMap, WireMessage};
use crate::schema::{FieldDefs, FieldKind, MessageStructure, ScalarField};
use crate::structured::{Message, HEADER_FIELD, TRAILER_FIELD};

#[derive(Debug)]
pub struct DecodeResult {
    pub message: Message,
    pub errors: Vec<String>,
}

pub fn decode(structure: &MessageStructure, wire: &WireMessage) -> DecodeResult {
    let mut decoder = Decoder { errors: Vec::new() };
    let path = structure.name.as_str();
    let mut message = Message::new(structure.name.as_str());

    let header = decoder.section(
        &structure.header.fields,
        &wire.header,
        &format!("{}.{}", path, HEADER_FIELD),
    );
    message.set(HEADER_FIELD, header);

    let body = decoder.section(&structure.body.fields, &wire.body, path);
    message.fields.extend(body.fields);

    let trailer = decoder.section(
        &structure.trailer.fields,
        &wire.trailer,
        &format!("{}.{}", path, TRAILER_FIELD),
    );
    message.set(TRAILER_FIELD, trailer);

    DecodeResult {
        message,
        errors: decoder.errors,
    }
}

/// `true` if any scalar or group under `defs` is set in `map`. A group counts when it has
/// a repetition or an explicit `0` counter.
pub fn is_present(defs: &FieldDefs, map: &FieldMap) -> bool {
    defs.iter().any(|def| match &def.kind {
        FieldKind::Field(field) => map.is_set(field.tag),
        FieldKind::Component(children) => is_present(children, map),
        FieldKind::Group(group) => map.has_group(group.tag) || map.is_set(group.tag),
    })
}

struct Decoder {
    errors: Vec<String>,
}

impl Decoder {
    /// Decodes one field container. Tags the schema does not name are left out silently.
    fn section(&mut self, defs: &FieldDefs, map: &FieldMap, path: &str) -> Message {
        let mut out = Message::default();
        self.fields(defs, map, &mut out, path);
        out
    }

    fn fields(
        &mut self,
        defs: &FieldDefs,
        map: &FieldMap,
        out: &mut Message,
        path: &str,
    ) {
        for def in defs.iter() {
            let name = def.name.as_str();
            match &def.kind {
                FieldKind::Field(field) => match map.get(field.tag) {
                    Some(value) => {
                        if let Some(decoded) = self.scalar(field, value, path, name) {
                            out.set(name, decoded);
                        }
                    }
                    None => self.missing(def.required, path, name),
                },
                FieldKind::Component(children) => {
                    if !is_present(children, map) {
                        self.missing(def.required, path, name);
                        continue;
                    }
                    let mut component = Message::default();
                    self.fields(children, map, &mut component, &format!("{}.{}", path, name));
                    out.set(name, component);
                }
                FieldKind::Group(group) => {
                    let repetitions = map.groups(group.tag);
                    if repetitions.is_empty() {
                        self.missing(def.required, path, name);
                        if map.is_set(group.tag) {
                            out.set(name, Vec::<Message>::new());
                        }
                        continue;
                    }
                    let entries: Vec<Message> = repetitions
                        .iter()
                        .enumerate()
                        .map(|(i, repetition)| {
                            self.section(&group.fields, repetition, &format!("{}.{}[{}]", path, name, i))
                        })
                        .collect();
                    out.set(name, entries);
                }
            }
        }
    }

    fn scalar(&mut self, field: &ScalarField, value: &str, path: &str, name: &str) -> Option<String> {
        if let Some(codes) = &field.codes {
            return match codes.name_for(value) {
                Some(symbol) => Some(symbol.to_string()),
                None => {
                    self.errors
                        .push(format!("Out of range value '{}' at: {}.{}", value, path, name));
                    None
                }
            };
        }
        match from_wire(field.scalar, value) {
            Ok(decoded) => Some(decoded),
            Err(kind) => {
                self.errors
                    .push(format!("Invalid {} value '{}' at: {}.{}", kind, value, path, name));
                None
            }
        }
    }

    fn missing(&mut self, required: bool, path: &str, name: &str) {
        if required {
            self.errors.push(format!("Missing required field: {}.{}", path, name));
        }
    }
}
