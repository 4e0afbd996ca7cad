//! Schema resolution: repository definitions → per-message field trees with wire order.

pub mod field;
mod resolver;
pub mod structure;

pub use field::{
    CodeTable, DuplicatePolicy, FieldDefinition, FieldDefs, FieldKind, GroupField, ScalarField,
    ScalarType,
};
pub use resolver::{resolve_messages, Resolver};
pub use structure::{GroupLayout, MessageStructure, Section, WireLayout};
