//! Per-message resolved structure: header/body/trailer sections with wire order and the
//! group layout used to assemble raw fields into repetitions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::field::{FieldDefs, FieldKind};

/// One section (header, body or trailer) of a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub fields: FieldDefs,
    /// Depth-first pre-order of every tag in `fields`.
    pub order: Arc<[u32]>,
    pub layout: WireLayout,
}

impl Section {
    pub fn new(fields: FieldDefs) -> Self {
        let order = fields.wire_order().into();
        let layout = WireLayout::from_defs(&fields);
        Self { fields, order, layout }
    }
}

/// Which tags belong to one field container and which of them open repeating groups.
///
/// Component boundaries do not exist on the wire, so component children are folded into
/// the enclosing layout; each group gets a nested layout of its own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WireLayout {
    pub tags: HashSet<u32>,
    pub groups: HashMap<u32, GroupLayout>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupLayout {
    /// First tag of every repetition.
    pub delimiter: u32,
    pub order: Arc<[u32]>,
    pub layout: WireLayout,
}

impl WireLayout {
    pub fn from_defs(fields: &FieldDefs) -> Self {
        let mut layout = WireLayout::default();
        layout.collect(fields);
        layout
    }

    fn collect(&mut self, fields: &FieldDefs) {
        for def in fields.iter() {
            match &def.kind {
                FieldKind::Field(field) => {
                    self.tags.insert(field.tag);
                }
                FieldKind::Component(children) => self.collect(children),
                FieldKind::Group(group) => {
                    self.tags.insert(group.tag);
                    let Some(&delimiter) = group.order.first() else {
                        continue;
                    };
                    self.groups.insert(
                        group.tag,
                        GroupLayout {
                            delimiter,
                            order: Arc::clone(&group.order),
                            layout: WireLayout::from_defs(&group.fields),
                        },
                    );
                }
            }
        }
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.tags.contains(&tag)
    }

    pub fn group(&self, tag: u32) -> Option<&GroupLayout> {
        self.groups.get(&tag)
    }
}

/// Resolved schema of one message type.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageStructure {
    /// Symbolic name, e.g. `ExecutionReport`.
    pub name: String,
    /// Wire MsgType (35) code, e.g. `8`.
    pub msg_type: String,
    pub header: Section,
    pub body: Section,
    pub trailer: Section,
}
