//! FIX tag-value wire layer: framing, field containers and group assembly.
//!
//! Nothing here knows field types; [`crate::codec`] maps these containers to and from
//! structured messages.

pub mod field_map;
pub mod message;

pub use field_map::{FieldMap, WireMessage};
pub use message::{checksum, split_fields, FixWriter, FIX_SOH};
