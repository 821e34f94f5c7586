use protodiff_schema::SchemaFile;
use tracing::debug;

use crate::comparator::Comparator;
use crate::report::{ItemType, Section};

/// The name that selects a whole-schema comparison in [`compare_named`].
pub const ALL: &str = ".";

/// Compares every top-level message and enum of two schema files.
///
/// Types are paired by unqualified name. Child sections follow the first
/// file's declaration order (messages, then enums); types present on only
/// one side become `File_*_Added` / `File_*_Removed` items on the root.
pub fn compare(file_a: &SchemaFile, file_b: &SchemaFile) -> Section {
    debug!(a = %file_a.name, b = %file_b.name, "comparing schema files");
    let mut root = Section::root();
    let mut comparator = Comparator::new(&file_a.pool, &file_b.pool);

    for msg_a in file_a.message_types() {
        match file_b.find_message_type_by_name(&msg_a.name) {
            Some(msg_b) => root.push_section(comparator.compare_messages(msg_a, msg_b)),
            None => root.add_item(ItemType::FileMessageRemoved, &msg_a.full_name, ""),
        }
    }

    for msg_b in file_b.message_types() {
        if file_a.find_message_type_by_name(&msg_b.name).is_none() {
            root.add_item(ItemType::FileMessageAdded, "", &msg_b.full_name);
        }
    }

    for enum_a in file_a.enum_types() {
        match file_b.find_enum_type_by_name(&enum_a.name) {
            Some(enum_b) => root.push_section(comparator.compare_enums(enum_a, enum_b)),
            None => root.add_item(ItemType::FileEnumRemoved, &enum_a.full_name, ""),
        }
    }

    for enum_b in file_b.enum_types() {
        if file_a.find_enum_type_by_name(&enum_b.name).is_none() {
            root.add_item(ItemType::FileEnumAdded, "", &enum_b.full_name);
        }
    }

    root
}

/// Compares the message or enum called `name` (fully qualified, a leading
/// `.` is allowed) in both schemas' registries. [`ALL`] compares everything.
///
/// If the name does not resolve to the same kind of type on both sides the
/// root holds a single `Name_Missing` item.
pub fn compare_named(file_a: &SchemaFile, file_b: &SchemaFile, name: &str) -> Section {
    if name == ALL {
        return compare(file_a, file_b);
    }

    debug!(a = %file_a.name, b = %file_b.name, entity = name, "comparing named type");
    let lookup = name.strip_prefix('.').unwrap_or(name);
    let mut root = Section::root();
    let mut comparator = Comparator::new(&file_a.pool, &file_b.pool);

    let msg_a = file_a.pool.find_message_type_by_name(lookup);
    let msg_b = file_b.pool.find_message_type_by_name(lookup);
    let enum_a = file_a.pool.find_enum_type_by_name(lookup);
    let enum_b = file_b.pool.find_enum_type_by_name(lookup);

    if let (Some(msg_a), Some(msg_b)) = (msg_a, msg_b) {
        root.push_section(comparator.compare_messages(msg_a, msg_b));
    } else if let (Some(enum_a), Some(enum_b)) = (enum_a, enum_b) {
        root.push_section(comparator.compare_enums(enum_a, enum_b));
    } else {
        root.add_item(ItemType::NameMissing, name, name);
    }

    root
}
