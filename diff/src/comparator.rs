use protodiff_schema::{DescriptorPool, EnumDescriptor, FieldDescriptor, FieldType, MessageDescriptor};
use tracing::{trace, warn};

use crate::report::{ItemType, Section, SectionType};

/// Walks two schema versions in lock-step and records their differences.
///
/// Entities are matched by name: a field or enum value that keeps its number
/// but changes its name shows up as one removal plus one addition.
pub struct Comparator<'a> {
    pool_a: &'a DescriptorPool,
    pool_b: &'a DescriptorPool,
    /// Message pairs currently being compared, outermost first.
    active: Vec<(String, String)>,
}

impl<'a> Comparator<'a> {
    /// `pool_a` and `pool_b` resolve the type references of the first and
    /// second schema respectively.
    pub fn new(pool_a: &'a DescriptorPool, pool_b: &'a DescriptorPool) -> Self {
        Comparator {
            pool_a,
            pool_b,
            active: Vec::new(),
        }
    }

    pub fn compare_enums(&mut self, enum_a: &EnumDescriptor, enum_b: &EnumDescriptor) -> Section {
        trace!(a = %enum_a.full_name, b = %enum_b.full_name, "comparing enums");
        let mut section = Section::new(SectionType::Enum, &enum_a.full_name, &enum_b.full_name);

        for value_a in &enum_a.values {
            match enum_b.find_value_by_name(&value_a.name) {
                Some(value_b) => {
                    let subsection = section.add_section(SectionType::EnumValue, &value_a.name, &value_b.name);
                    if value_a.number != value_b.number {
                        subsection.add_item(
                            ItemType::EnumValueIdChanged,
                            value_a.number.to_string(),
                            value_b.number.to_string(),
                        );
                    }
                }
                None => section.add_item(ItemType::EnumValueRemoved, &value_a.name, ""),
            }
        }

        for value_b in &enum_b.values {
            if enum_a.find_value_by_name(&value_b.name).is_none() {
                section.add_item(ItemType::EnumValueAdded, "", &value_b.name);
            }
        }

        section
    }

    pub fn compare_fields(&mut self, field_a: &FieldDescriptor, field_b: &FieldDescriptor) -> Section {
        trace!(a = %field_a.full_name, b = %field_b.full_name, "comparing fields");
        let mut section = Section::new(SectionType::MessageField, &field_a.full_name, &field_b.full_name);

        if field_a.name != field_b.name {
            section.add_item(ItemType::MessageFieldNameChanged, &field_a.name, &field_b.name);
        }

        if field_a.number != field_b.number {
            section.add_item(
                ItemType::MessageFieldIdChanged,
                field_a.number.to_string(),
                field_b.number.to_string(),
            );
        }

        if field_a.label != field_b.label {
            section.add_item(ItemType::MessageFieldLabelChanged, "", "");
        }

        if field_a.field_type != field_b.field_type {
            section.add_item(
                ItemType::MessageFieldTypeChanged,
                field_a.field_type.type_name(),
                field_b.field_type.type_name(),
            );
        } else if field_a.field_type == FieldType::Enum {
            self.compare_enum_references(field_a, field_b, &mut section);
        } else if field_a.field_type == FieldType::Message {
            self.compare_message_references(field_a, field_b, &mut section);
        }

        if field_a.cpp_type() == field_b.cpp_type() && !compare_default_value(field_a, field_b) {
            section.add_item(ItemType::MessageFieldDefaultValueChanged, "", "");
        }

        section
    }

    pub fn compare_messages(&mut self, msg_a: &MessageDescriptor, msg_b: &MessageDescriptor) -> Section {
        trace!(a = %msg_a.full_name, b = %msg_b.full_name, "comparing messages");
        let mut section = Section::new(SectionType::Message, &msg_a.full_name, &msg_b.full_name);
        self.active.push((msg_a.full_name.clone(), msg_b.full_name.clone()));

        for field_a in &msg_a.fields {
            match msg_b.find_field_by_name(&field_a.name) {
                Some(field_b) => section.push_section(self.compare_fields(field_a, field_b)),
                None => section.add_item(ItemType::MessageFieldRemoved, &field_a.name, ""),
            }
        }

        for field_b in &msg_b.fields {
            if msg_a.find_field_by_name(&field_b.name).is_none() {
                section.add_item(ItemType::MessageFieldAdded, "", &field_b.name);
            }
        }

        self.active.pop();
        section
    }

    fn compare_enum_references(&mut self, field_a: &FieldDescriptor, field_b: &FieldDescriptor, section: &mut Section) {
        let name_a = field_a.enum_type().unwrap_or_default();
        let name_b = field_b.enum_type().unwrap_or_default();
        if name_a != name_b {
            section.add_item(ItemType::MessageFieldTypeChanged, name_a, name_b);
        }

        let pool_a = self.pool_a;
        let pool_b = self.pool_b;
        match (pool_a.find_enum_type_by_name(name_a), pool_b.find_enum_type_by_name(name_b)) {
            (Some(enum_a), Some(enum_b)) => section.push_section(self.compare_enums(enum_a, enum_b)),
            _ => warn!(a = name_a, b = name_b, field = %field_a.full_name, "enum type not found, skipping"),
        }
    }

    fn compare_message_references(&mut self, field_a: &FieldDescriptor, field_b: &FieldDescriptor, section: &mut Section) {
        let name_a = field_a.message_type().unwrap_or_default();
        let name_b = field_b.message_type().unwrap_or_default();
        if name_a != name_b {
            section.add_item(ItemType::MessageFieldTypeChanged, name_a, name_b);
        }

        if self.active.iter().any(|(a, b)| a == name_a && b == name_b) {
            trace!(a = name_a, b = name_b, "message pair already being compared");
            return;
        }

        let pool_a = self.pool_a;
        let pool_b = self.pool_b;
        match (pool_a.find_message_type_by_name(name_a), pool_b.find_message_type_by_name(name_b)) {
            (Some(msg_a), Some(msg_b)) => section.push_section(self.compare_messages(msg_a, msg_b)),
            _ => warn!(a = name_a, b = name_b, field = %field_a.full_name, "message type not found, skipping"),
        }
    }
}

/// True when both fields have the same default: both without one, or both
/// with an equal value of the same representation.
pub fn compare_default_value(field_a: &FieldDescriptor, field_b: &FieldDescriptor) -> bool {
    match (&field_a.default_value, &field_b.default_value) {
        (None, None) => true,
        (Some(a), Some(b)) => field_a.cpp_type() == field_b.cpp_type() && a.same_value(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protodiff_schema::{DefaultValue, EnumValueDescriptor, Label};

    fn int_field(name: &str, number: i32) -> FieldDescriptor {
        FieldDescriptor::scalar("M", name, number, Label::Optional, FieldType::Int32)
    }

    #[test]
    fn test_enum_value_id_change() {
        let pool = DescriptorPool::new();
        let a = EnumDescriptor::new("E", vec![EnumValueDescriptor::new("A", 1), EnumValueDescriptor::new("B", 2)]);
        let b = EnumDescriptor::new("E", vec![EnumValueDescriptor::new("A", 1), EnumValueDescriptor::new("B", 5)]);

        let section = Comparator::new(&pool, &pool).compare_enums(&a, &b);
        assert!(section.items.is_empty());
        assert_eq!(section.sections.len(), 2);
        assert!(section.sections[0].is_empty());
        assert_eq!(section.sections[1].items[0].kind, ItemType::EnumValueIdChanged);
        assert_eq!(section.sections[1].items[0].before, "2");
        assert_eq!(section.sections[1].items[0].after, "5");
    }

    #[test]
    fn test_direct_field_comparison_reports_name_change() {
        let pool = DescriptorPool::new();
        let section = Comparator::new(&pool, &pool).compare_fields(&int_field("x", 1), &int_field("y", 1));
        assert_eq!(section.items.len(), 1);
        assert_eq!(section.items[0].kind, ItemType::MessageFieldNameChanged);
        assert_eq!((section.items[0].before.as_str(), section.items[0].after.as_str()), ("x", "y"));
    }

    #[test]
    fn test_label_change_carries_no_payload() {
        let pool = DescriptorPool::new();
        let mut required = int_field("x", 1);
        required.label = Label::Required;
        let section = Comparator::new(&pool, &pool).compare_fields(&int_field("x", 1), &required);
        assert_eq!(section.items.len(), 1);
        assert_eq!(section.items[0].kind, ItemType::MessageFieldLabelChanged);
        assert!(section.items[0].before.is_empty() && section.items[0].after.is_empty());
    }

    #[test]
    fn test_scalar_type_change_uses_type_names() {
        let pool = DescriptorPool::new();
        let b = FieldDescriptor::scalar("M", "x", 1, Label::Optional, FieldType::SInt32);
        let section = Comparator::new(&pool, &pool).compare_fields(&int_field("x", 1), &b);
        assert_eq!(section.items.len(), 1);
        assert_eq!(section.items[0].kind, ItemType::MessageFieldTypeChanged);
        assert_eq!(section.items[0].before, "int32");
        assert_eq!(section.items[0].after, "sint32");
    }

    #[test]
    fn test_default_values_are_compared_pairwise() {
        let with = |v: DefaultValue, ty: FieldType| {
            FieldDescriptor::scalar("M", "x", 1, Label::Optional, ty).with_default(v)
        };

        assert!(compare_default_value(&int_field("x", 1), &int_field("x", 1)));
        assert!(!compare_default_value(&int_field("x", 1), &with(DefaultValue::Int32(0), FieldType::Int32)));

        // Every representation must look at both sides.
        assert!(!compare_default_value(
            &with(DefaultValue::UInt32(1), FieldType::UInt32),
            &with(DefaultValue::UInt32(2), FieldType::UInt32)
        ));
        assert!(!compare_default_value(
            &with(DefaultValue::Double(1.0), FieldType::Double),
            &with(DefaultValue::Double(2.0), FieldType::Double)
        ));
        assert!(!compare_default_value(
            &with(DefaultValue::Bool(true), FieldType::Bool),
            &with(DefaultValue::Bool(false), FieldType::Bool)
        ));
        assert!(!compare_default_value(
            &with(DefaultValue::String("a".into()), FieldType::String),
            &with(DefaultValue::String("b".into()), FieldType::Bytes)
        ));
        assert!(compare_default_value(
            &with(DefaultValue::String("a".into()), FieldType::String),
            &with(DefaultValue::String("a".into()), FieldType::Bytes)
        ));
    }

    #[test]
    fn test_enum_defaults_compare_by_number() {
        let pool = DescriptorPool::new();
        let field = |name: &str, number: i32| {
            FieldDescriptor::reference("M", "e", 1, Label::Optional, FieldType::Enum, "E")
                .with_default(DefaultValue::Enum { name: name.into(), number })
        };
        assert!(compare_default_value(&field("RED", 1), &field("CRIMSON", 1)));
        assert!(!compare_default_value(&field("RED", 1), &field("RED", 2)));

        // The referenced enum is missing from the pool: no recursion, no panic.
        let section = Comparator::new(&pool, &pool).compare_fields(&field("RED", 1), &field("RED", 2));
        assert!(section.sections.is_empty());
        assert_eq!(section.items.len(), 1);
        assert_eq!(section.items[0].kind, ItemType::MessageFieldDefaultValueChanged);
    }

    #[test]
    fn test_self_referencing_message_terminates() {
        let mut pool = DescriptorPool::new();
        pool.add_message(MessageDescriptor::new("Node", vec![
            FieldDescriptor::reference("Node", "next", 1, Label::Optional, FieldType::Message, "Node"),
        ]));
        let node = pool.find_message_type_by_name("Node").unwrap();

        let section = Comparator::new(&pool, &pool).compare_messages(node, node);
        assert_eq!(section.sections.len(), 1);
        assert!(section.sections[0].sections.is_empty());
        assert_eq!(section.change_count(), 0);
    }
}
