//! Resolved field model: scalar fields, components and groups.
//!
//! Everything here is built once by the [`Resolver`](super::Resolver) and never mutated
//! afterwards. Child maps and code tables sit behind `Arc` so definitions referenced by many
//! messages are shared rather than copied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::repository::Code;

/// What to do when one scope declares the same name twice (for example an explicit field
/// next to a component that also contains it).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later declaration replaces the earlier one but keeps its position.
    #[default]
    LastWins,
    /// Earlier declaration is kept, later ones are ignored.
    FirstWins,
}

/// Semantic type a scalar is converted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Boolean,
    /// `int`, `Length`, `NumInGroup`, `SeqNum`.
    Int,
    /// `float`, `Amt`, `Price`, `PriceOffset`, `Qty`, `Percentage`.
    Decimal,
    DateOnly,
    TimeOnly,
    Timestamp,
    /// Written and read as the literal string.
    Text,
}

impl ScalarType {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Boolean" => ScalarType::Boolean,
            "int" | "Length" | "NumInGroup" | "SeqNum" => ScalarType::Int,
            "float" | "Amt" | "Price" | "PriceOffset" | "Qty" | "Percentage" => ScalarType::Decimal,
            "UTCDateOnly" => ScalarType::DateOnly,
            "UTCTimeOnly" => ScalarType::TimeOnly,
            "UTCTimestamp" => ScalarType::Timestamp,
            _ => ScalarType::Text,
        }
    }
}

/// Symbolic name ↔ wire code table of one code set. Both directions are built once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeTable {
    by_name: HashMap<String, String>,
    by_code: HashMap<String, String>,
}

impl CodeTable {
    pub fn from_codes(codes: &[Code]) -> Self {
        let mut table = Self::default();
        for code in codes {
            table.by_name.insert(code.name.clone(), code.value.clone());
            table.by_code.insert(code.value.clone(), code.name.clone());
        }
        table
    }

    /// Wire code for `input`, which may be a symbolic name (checked first) or a code.
    pub fn code_for<'a>(&'a self, input: &'a str) -> Option<&'a str> {
        match self.by_name.get(input) {
            Some(code) => Some(code.as_str()),
            None if self.by_code.contains_key(input) => Some(input),
            None => None,
        }
    }

    /// Symbolic name for a wire `code`; a value that already is a name passes through.
    pub fn name_for<'a>(&'a self, code: &'a str) -> Option<&'a str> {
        match self.by_code.get(code) {
            Some(name) => Some(name.as_str()),
            None if self.by_name.contains_key(code) => Some(code),
            None => None,
        }
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    pub tag: u32,
    /// Effective datatype name (the code set's type for enumerated fields).
    pub type_name: String,
    pub scalar: ScalarType,
    pub codes: Option<Arc<CodeTable>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupField {
    /// NumInGroup tag.
    pub tag: u32,
    pub fields: Arc<FieldDefs>,
    /// Wire order of one repetition; the first tag is the delimiter.
    pub order: Arc<[u32]>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Field(ScalarField),
    Component(Arc<FieldDefs>),
    Group(GroupField),
}

/// One resolved schema node.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldDefinition {
    /// Wire tag, or 0 for components.
    pub fn tag(&self) -> u32 {
        match &self.kind {
            FieldKind::Field(field) => field.tag,
            FieldKind::Group(group) => group.tag,
            FieldKind::Component(_) => 0,
        }
    }

    /// Child definitions of a component or group.
    pub fn children(&self) -> Option<&FieldDefs> {
        match &self.kind {
            FieldKind::Field(_) => None,
            FieldKind::Component(fields) => Some(fields),
            FieldKind::Group(group) => Some(&group.fields),
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(&self.kind, FieldKind::Field(ScalarField { codes: Some(_), .. }))
    }
}

/// Ordered name → definition map. Names are unique; insertion order is wire declaration
/// order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDefs {
    entries: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
}

impl FieldDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `def`, resolving a name clash with `policy`.
    pub fn insert(&mut self, def: FieldDefinition, policy: DuplicatePolicy) {
        match self.index.get(&def.name) {
            Some(&at) => {
                if policy == DuplicatePolicy::LastWins {
                    self.entries[at] = def;
                }
            }
            None => {
                self.index.insert(def.name.clone(), self.entries.len());
                self.entries.push(def);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&at| &self.entries[at])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldDefinition> {
        let at = self.index.remove(name)?;
        let removed = self.entries.remove(at);
        for slot in self.index.values_mut() {
            if *slot > at {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn any_required(&self) -> bool {
        self.entries.iter().any(|def| def.required)
    }

    /// Pre-order traversal: a node's tag (if any) is emitted before its children's.
    pub fn wire_order(&self) -> Vec<u32> {
        let mut order = Vec::new();
        self.collect_order(&mut order);
        order
    }

    fn collect_order(&self, order: &mut Vec<u32>) {
        for def in &self.entries {
            let tag = def.tag();
            if tag > 0 {
                order.push(tag);
            }
            if let Some(children) = def.children() {
                children.collect_order(order);
            }
        }
    }
}

impl FromIterator<FieldDefinition> for FieldDefs {
    fn from_iter<I: IntoIterator<Item = FieldDefinition>>(iter: I) -> Self {
        let mut defs = FieldDefs::new();
        for def in iter {
            defs.insert(def, DuplicatePolicy::LastWins);
        }
        defs
    }
}
