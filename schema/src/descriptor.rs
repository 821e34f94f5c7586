use serde::Serialize;
use std::fmt;

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Optional = 1,
    Required = 2,
    Repeated = 3,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Optional => "optional",
            Label::Required => "required",
            Label::Repeated => "repeated",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-level field type, one per schema keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    UInt32,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
    Enum,
    Message,
    Group,
}

/// How a value of a field is represented in memory. Several wire types share
/// one representation (`sint32`, `sfixed32` and `int32` are all `Int32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CppType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Double,
    Float,
    Bool,
    Enum,
    String,
    Message,
}

impl FieldType {
    /// Maps a scalar keyword to its type. `enum` and `message` are never
    /// spelled out in a schema, so they are not returned here.
    pub fn from_scalar_name(name: &str) -> Option<FieldType> {
        let ty = match name {
            "double"   => FieldType::Double,
            "float"    => FieldType::Float,
            "int64"    => FieldType::Int64,
            "uint64"   => FieldType::UInt64,
            "int32"    => FieldType::Int32,
            "fixed64"  => FieldType::Fixed64,
            "fixed32"  => FieldType::Fixed32,
            "bool"     => FieldType::Bool,
            "string"   => FieldType::String,
            "bytes"    => FieldType::Bytes,
            "uint32"   => FieldType::UInt32,
            "sfixed32" => FieldType::SFixed32,
            "sfixed64" => FieldType::SFixed64,
            "sint32"   => FieldType::SInt32,
            "sint64"   => FieldType::SInt64,
            _ => return None,
        };
        Some(ty)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Double   => "double",
            FieldType::Float    => "float",
            FieldType::Int64    => "int64",
            FieldType::UInt64   => "uint64",
            FieldType::Int32    => "int32",
            FieldType::Fixed64  => "fixed64",
            FieldType::Fixed32  => "fixed32",
            FieldType::Bool     => "bool",
            FieldType::String   => "string",
            FieldType::Bytes    => "bytes",
            FieldType::UInt32   => "uint32",
            FieldType::SFixed32 => "sfixed32",
            FieldType::SFixed64 => "sfixed64",
            FieldType::SInt32   => "sint32",
            FieldType::SInt64   => "sint64",
            FieldType::Enum     => "enum",
            FieldType::Message  => "message",
            FieldType::Group    => "group",
        }
    }

    pub fn cpp_type(&self) -> CppType {
        match self {
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => CppType::Int32,
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => CppType::Int64,
            FieldType::UInt32 | FieldType::Fixed32                     => CppType::UInt32,
            FieldType::UInt64 | FieldType::Fixed64                     => CppType::UInt64,
            FieldType::Double                                          => CppType::Double,
            FieldType::Float                                           => CppType::Float,
            FieldType::Bool                                            => CppType::Bool,
            FieldType::String | FieldType::Bytes                       => CppType::String,
            FieldType::Enum                                            => CppType::Enum,
            FieldType::Message | FieldType::Group                      => CppType::Message,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// An explicit `[default = ...]` value, typed by its representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum DefaultValue {
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Enum { name: String, number: i32 },
}

impl DefaultValue {
    /// Representation-aware equality. Floats compare by bit pattern so that
    /// `nan` equals `nan`; enum defaults compare by numeric id, not name.
    pub fn same_value(&self, other: &DefaultValue) -> bool {
        match (self, other) {
            (DefaultValue::Int32(a), DefaultValue::Int32(b))   => a == b,
            (DefaultValue::Int64(a), DefaultValue::Int64(b))   => a == b,
            (DefaultValue::UInt32(a), DefaultValue::UInt32(b)) => a == b,
            (DefaultValue::UInt64(a), DefaultValue::UInt64(b)) => a == b,
            (DefaultValue::Float(a), DefaultValue::Float(b))   => a.to_bits() == b.to_bits(),
            (DefaultValue::Double(a), DefaultValue::Double(b)) => a.to_bits() == b.to_bits(),
            (DefaultValue::Bool(a), DefaultValue::Bool(b))     => a == b,
            (DefaultValue::String(a), DefaultValue::String(b)) => a == b,
            (DefaultValue::Enum { number: a, .. }, DefaultValue::Enum { number: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Int32(v)           => write!(f, "{}", v),
            DefaultValue::Int64(v)           => write!(f, "{}", v),
            DefaultValue::UInt32(v)          => write!(f, "{}", v),
            DefaultValue::UInt64(v)          => write!(f, "{}", v),
            DefaultValue::Float(v)           => write!(f, "{}", v),
            DefaultValue::Double(v)          => write!(f, "{}", v),
            DefaultValue::Bool(v)            => write!(f, "{}", v),
            DefaultValue::String(v)          => write!(f, "{:?}", v),
            DefaultValue::Enum { name, .. }  => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name:          String,
    pub full_name:     String,
    pub number:        i32,
    pub label:         Label,
    pub field_type:    FieldType,
    /// Qualified name of the referenced enum, message or group. Set iff
    /// the field has one of those types.
    pub type_ref:      Option<String>,
    pub default_value: Option<DefaultValue>,
}

impl FieldDescriptor {
    pub fn scalar(message: &str, name: &str, number: i32, label: Label, field_type: FieldType) -> Self {
        FieldDescriptor {
            name:          name.to_string(),
            full_name:     format!("{}.{}", message, name),
            number,
            label,
            field_type,
            type_ref:      None,
            default_value: None,
        }
    }

    pub fn reference(
        message: &str,
        name: &str,
        number: i32,
        label: Label,
        field_type: FieldType,
        type_ref: &str,
    ) -> Self {
        FieldDescriptor {
            type_ref: Some(type_ref.to_string()),
            ..FieldDescriptor::scalar(message, name, number, label, field_type)
        }
    }

    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn cpp_type(&self) -> CppType {
        self.field_type.cpp_type()
    }

    /// Qualified name of the referenced enum, if this is an enum field.
    pub fn enum_type(&self) -> Option<&str> {
        match self.field_type {
            FieldType::Enum => self.type_ref.as_deref(),
            _ => None,
        }
    }

    /// Qualified name of the referenced message, if this is a message field.
    pub fn message_type(&self) -> Option<&str> {
        match self.field_type {
            FieldType::Message => self.type_ref.as_deref(),
            _ => None,
        }
    }

    /// Qualified name of the message holding a group's fields.
    pub fn group_type(&self) -> Option<&str> {
        match self.field_type {
            FieldType::Group => self.type_ref.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDescriptor {
    pub name:      String,
    pub full_name: String,
    pub fields:    Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn new(full_name: &str, fields: Vec<FieldDescriptor>) -> Self {
        MessageDescriptor {
            name:      short_name(full_name).to_string(),
            full_name: full_name.to_string(),
            fields,
        }
    }

    pub fn find_field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_field_by_number(&self, number: i32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValueDescriptor {
    pub name:   String,
    pub number: i32,
}

impl EnumValueDescriptor {
    pub fn new(name: &str, number: i32) -> Self {
        EnumValueDescriptor { name: name.to_string(), number }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDescriptor {
    pub name:      String,
    pub full_name: String,
    pub values:    Vec<EnumValueDescriptor>,
}

impl EnumDescriptor {
    pub fn new(full_name: &str, values: Vec<EnumValueDescriptor>) -> Self {
        EnumDescriptor {
            name:      short_name(full_name).to_string(),
            full_name: full_name.to_string(),
            values,
        }
    }

    pub fn find_value_by_name(&self, name: &str) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.name == name)
    }

    /// First value declared with `number` (aliases share numbers).
    pub fn find_value_by_number(&self, number: i32) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.number == number)
    }
}

/// Last component of a dotted name.
pub fn short_name(full_name: &str) -> &str {
    full_name.rsplit('.').next().unwrap_or(full_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpp_type_groups_wire_types() {
        assert_eq!(FieldType::SInt32.cpp_type(), CppType::Int32);
        assert_eq!(FieldType::SFixed64.cpp_type(), CppType::Int64);
        assert_eq!(FieldType::Fixed32.cpp_type(), CppType::UInt32);
        assert_eq!(FieldType::Bytes.cpp_type(), CppType::String);
        assert_eq!(FieldType::Enum.cpp_type(), CppType::Enum);
        assert_eq!(FieldType::Group.cpp_type(), CppType::Message);
        assert_eq!(FieldType::Group.type_name(), "group");
    }

    #[test]
    fn test_scalar_names_round_trip_through_keywords() {
        for name in ["double", "sint64", "bytes", "fixed32", "bool"] {
            assert_eq!(FieldType::from_scalar_name(name).unwrap().type_name(), name);
        }
        assert!(FieldType::from_scalar_name("message").is_none());
        assert!(FieldType::from_scalar_name("group").is_none());
        assert!(FieldType::from_scalar_name("Color").is_none());
    }

    #[test]
    fn test_default_values_compare_per_representation() {
        assert!(DefaultValue::Float(f32::NAN).same_value(&DefaultValue::Float(f32::NAN)));
        assert!(!DefaultValue::Double(1.0).same_value(&DefaultValue::Double(1.5)));
        assert!(!DefaultValue::Int32(1).same_value(&DefaultValue::Int64(1)));

        let red = DefaultValue::Enum { name: "RED".into(), number: 1 };
        let crimson = DefaultValue::Enum { name: "CRIMSON".into(), number: 1 };
        assert!(red.same_value(&crimson));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("a.b.Outer.Inner"), "Inner");
        assert_eq!(short_name("Top"), "Top");
    }

    #[test]
    fn test_enum_field_exposes_referenced_type() {
        let field = FieldDescriptor::reference("pkg.M", "kind", 3, Label::Optional, FieldType::Enum, "pkg.Kind");
        assert_eq!(field.full_name, "pkg.M.kind");
        assert_eq!(field.enum_type(), Some("pkg.Kind"));
        assert_eq!(field.message_type(), None);
        assert!(!field.has_default_value());
    }
}
