//! Wire-level containers: ordered tag → value maps with repeating groups.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::message::{FixWriter, BEGIN_STRING, BODY_LENGTH, CHECK_SUM, MSG_TYPE};
use crate::error::WireError;
use crate::schema::{GroupLayout, MessageStructure};

/// Tag → value fields plus tag → group repetitions.
///
/// Serialization follows `order`; tags missing from it go last, ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    order: Arc<[u32]>,
    fields: BTreeMap<u32, String>,
    groups: BTreeMap<u32, Vec<FieldMap>>,
}

impl FieldMap {
    pub fn with_order(order: Arc<[u32]>) -> Self {
        Self {
            order,
            fields: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn order(&self) -> &[u32] {
        &self.order
    }

    pub fn set(&mut self, tag: u32, value: impl Into<String>) {
        self.fields.insert(tag, value.into());
    }

    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }

    pub fn is_set(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    pub fn remove(&mut self, tag: u32) -> Option<String> {
        self.fields.remove(&tag)
    }

    /// Appends one repetition of the group counted by `tag`.
    pub fn add_group(&mut self, tag: u32, group: FieldMap) {
        self.groups.entry(tag).or_default().push(group);
    }

    pub fn groups(&self, tag: u32) -> &[FieldMap] {
        self.groups.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_group(&self, tag: u32) -> bool {
        !self.groups(tag).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }

    /// Tags (fields and group counters) in serialization order.
    pub fn tags(&self) -> Vec<u32> {
        let position: HashMap<u32, usize> = self
            .order
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &tag)| (tag, i))
            .collect();
        let mut tags: Vec<u32> = self
            .fields
            .keys()
            .chain(self.groups.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        tags.sort_by_key(|tag| (position.get(tag).copied().unwrap_or(usize::MAX), *tag));
        tags
    }

    /// Flattens into `(tag, value)` pairs, expanding each group as its count followed by
    /// every repetition. A group counter set as a plain field (`0`) is written as is.
    pub fn write_fields(&self, out: &mut Vec<(u32, String)>, skip: &[u32]) {
        for tag in self.tags() {
            if skip.contains(&tag) {
                continue;
            }
            let groups = self.groups(tag);
            if !groups.is_empty() {
                out.push((tag, groups.len().to_string()));
                for group in groups {
                    group.write_fields(out, &[]);
                }
            } else if let Some(value) = self.fields.get(&tag) {
                out.push((tag, value.clone()));
            }
        }
    }
}

/// A message as three tag-ordered sections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WireMessage {
    pub header: FieldMap,
    pub body: FieldMap,
    pub trailer: FieldMap,
}

impl WireMessage {
    /// Empty message whose sections serialize in `structure`'s wire order.
    pub fn for_structure(structure: &MessageStructure) -> Self {
        Self {
            header: FieldMap::with_order(Arc::clone(&structure.header.order)),
            body: FieldMap::with_order(Arc::clone(&structure.body.order)),
            trailer: FieldMap::with_order(Arc::clone(&structure.trailer.order)),
        }
    }

    /// Distributes split fields into header, body and trailer, folding repeating groups
    /// according to the structure's layouts.
    pub fn assemble(fields: &[(u32, String)], structure: &MessageStructure) -> Result<Self, WireError> {
        let mut message = Self::for_structure(structure);
        let mut pos = 0;
        while pos < fields.len() {
            let (tag, value) = &fields[pos];
            pos += 1;
            let (target, layout) = if matches!(*tag, BEGIN_STRING | BODY_LENGTH | MSG_TYPE)
                || structure.header.layout.contains(*tag)
            {
                (&mut message.header, &structure.header.layout)
            } else if *tag == CHECK_SUM || structure.trailer.layout.contains(*tag) {
                (&mut message.trailer, &structure.trailer.layout)
            } else {
                (&mut message.body, &structure.body.layout)
            };
            match layout.group(*tag) {
                Some(group) => {
                    let count = group_count(*tag, value)?;
                    add_repetitions(target, *tag, read_group(fields, &mut pos, *tag, group, count)?);
                }
                None => target.set(*tag, value.clone()),
            }
        }
        Ok(message)
    }

    pub fn msg_type(&self) -> Option<&str> {
        self.header.get(MSG_TYPE)
    }

    pub fn begin_string(&self) -> Option<&str> {
        self.header.get(BEGIN_STRING)
    }

    /// All fields in wire order except 8, 9 and 10, with MsgType first.
    pub fn to_fields(&self) -> Vec<(u32, String)> {
        let mut out = Vec::new();
        if let Some(msg_type) = self.msg_type() {
            out.push((MSG_TYPE, msg_type.to_string()));
        }
        self.header
            .write_fields(&mut out, &[BEGIN_STRING, BODY_LENGTH, MSG_TYPE, CHECK_SUM]);
        self.body.write_fields(&mut out, &[BEGIN_STRING, BODY_LENGTH, MSG_TYPE, CHECK_SUM]);
        self.trailer.write_fields(&mut out, &[CHECK_SUM]);
        out
    }

    /// Framed bytes with recomputed BodyLength and CheckSum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = FixWriter::new(self.begin_string().unwrap_or_default());
        writer.extend(self.to_fields());
        writer.to_bytes()
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

fn group_count(tag: u32, value: &str) -> Result<usize, WireError> {
    value
        .parse()
        .map_err(|_| WireError::InvalidGroupCount { tag, value: value.to_string() })
}

/// An empty group keeps its `0` counter so it survives re-encoding.
fn add_repetitions(target: &mut FieldMap, tag: u32, repetitions: Vec<FieldMap>) {
    if repetitions.is_empty() {
        target.set(tag, "0");
    }
    for repetition in repetitions {
        target.add_group(tag, repetition);
    }
}

/// Reads repetitions starting at `fields[*pos]`. A repetition opens at the delimiter and
/// continues while tags belong to the group; the first foreign tag ends the group.
fn read_group(
    fields: &[(u32, String)],
    pos: &mut usize,
    tag: u32,
    group: &GroupLayout,
    count: usize,
) -> Result<Vec<FieldMap>, WireError> {
    let mut repetitions: Vec<FieldMap> = Vec::new();
    while let Some((field_tag, value)) = fields.get(*pos) {
        if *field_tag == group.delimiter {
            repetitions.push(FieldMap::with_order(Arc::clone(&group.order)));
        } else if !group.layout.contains(*field_tag) {
            break;
        }
        let Some(current) = repetitions.last_mut() else {
            break;
        };
        *pos += 1;
        match group.layout.group(*field_tag) {
            Some(nested) => {
                let nested_count = group_count(*field_tag, value)?;
                let nested_repetitions = read_group(fields, pos, *field_tag, nested, nested_count)?;
                add_repetitions(current, *field_tag, nested_repetitions);
            }
            None => current.set(*field_tag, value.clone()),
        }
    }
    if repetitions.len() != count {
        return Err(WireError::GroupCountMismatch {
            tag,
            declared: count,
            actual: repetitions.len(),
        });
    }
    Ok(repetitions)
}
