//! protodiff
//!
//! Structural comparison of two versions of a protobuf schema.
//!
//! [`compare`] walks both files' top-level messages and enums, recursing
//! through fields into the enums and messages they reference, and returns a
//! [`Section`] tree of [`Item`]s. Call [`Section::trim`] to drop branches
//! without differences, then [`Section::render`] for the text report.
//!
//! Only structural facts are reported; whether a change is wire compatible
//! is left to the caller.

pub mod comparator;
pub mod compare;
pub mod report;

pub use comparator::{compare_default_value, Comparator};
pub use compare::{compare, compare_named, ALL};
pub use report::{Item, ItemType, Section, SectionType};
