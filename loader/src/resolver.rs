use std::collections::{HashMap, HashSet};

use protodiff_schema::{
    CppType, DefaultValue, DescriptorPool, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FieldType, Label, MessageDescriptor,
};
use tracing::{debug, warn};

use crate::{
    error::SchemaError,
    parser::parse_integer,
    types::{Constant, EnumDef, FieldDef, MessageDef, ProtoFile},
    utils::{quote, verifier_error},
};

/// Field numbers reserved for the protobuf implementation itself.
pub const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<i32> = 19_000..=19_999;

/// Qualified names of the top-level types a file declares, in order.
#[derive(Debug, Default, PartialEq)]
pub struct TopLevel {
    pub messages: Vec<String>,
    pub enums:    Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Message,
    Enum,
}

/// Verifies `file` and registers every type it declares into `pool`.
///
/// `pool` must already contain the types of all files `file` imports.
pub fn resolve_schema(file: &ProtoFile, pool: &mut DescriptorPool) -> Result<TopLevel, SchemaError> {
    let scope = file.package.clone().unwrap_or_default();

    // 1) Declare every type name so that forward references resolve.
    let mut declared: HashMap<String, Kind> = HashMap::new();
    for def in &file.messages {
        declare_message(&scope, def, pool, &mut declared)?;
    }
    for def in &file.enums {
        declare(&qualify(&scope, &def.name), Kind::Enum, def.line, def.column, pool, &mut declared)?;
    }

    // 2) Enums first, so enum defaults can be checked against their values.
    let mut enums = Vec::new();
    collect_enums(&scope, &file.messages, &file.enums, &mut enums);
    for (full_name, def) in enums {
        pool.add_enum(build_enum(&full_name, def)?);
    }

    // 3) Messages.
    let mut messages = Vec::new();
    collect_messages(&scope, &file.messages, &mut messages);
    let mut built = Vec::with_capacity(messages.len());
    for (full_name, def) in &messages {
        built.push(build_message(full_name, def, pool, &declared)?);
    }
    for message in built {
        pool.add_message(message);
    }

    Ok(TopLevel {
        messages: file.messages.iter().map(|m| qualify(&scope, &m.name)).collect(),
        enums:    file.enums.iter().map(|e| qualify(&scope, &e.name)).collect(),
    })
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn declare(
    full_name: &str,
    kind: Kind,
    line: usize,
    column: usize,
    pool: &DescriptorPool,
    declared: &mut HashMap<String, Kind>,
) -> Result<(), SchemaError> {
    if declared.contains_key(full_name) || pool.contains(full_name) {
        return Err(verifier_error(
            &format!("The type {} is defined twice", quote(full_name)),
            line,
            column,
        ));
    }
    declared.insert(full_name.to_string(), kind);
    Ok(())
}

fn declare_message(
    scope: &str,
    def: &MessageDef,
    pool: &DescriptorPool,
    declared: &mut HashMap<String, Kind>,
) -> Result<(), SchemaError> {
    let full_name = qualify(scope, &def.name);
    declare(&full_name, Kind::Message, def.line, def.column, pool, declared)?;
    for nested in &def.messages {
        declare_message(&full_name, nested, pool, declared)?;
    }
    for nested in &def.enums {
        declare(&qualify(&full_name, &nested.name), Kind::Enum, nested.line, nested.column, pool, declared)?;
    }
    Ok(())
}

fn collect_enums<'a>(
    scope: &str,
    messages: &'a [MessageDef],
    enums: &'a [EnumDef],
    out: &mut Vec<(String, &'a EnumDef)>,
) {
    for def in enums {
        out.push((qualify(scope, &def.name), def));
    }
    for message in messages {
        collect_enums(&qualify(scope, &message.name), &message.messages, &message.enums, out);
    }
}

fn collect_messages<'a>(scope: &str, messages: &'a [MessageDef], out: &mut Vec<(String, &'a MessageDef)>) {
    for def in messages {
        let full_name = qualify(scope, &def.name);
        collect_messages(&full_name, &def.messages, out);
        out.push((full_name, def));
    }
}

fn build_enum(full_name: &str, def: &EnumDef) -> Result<EnumDescriptor, SchemaError> {
    if def.values.is_empty() {
        return Err(verifier_error(
            &format!("Enum {} must contain at least one value", quote(full_name)),
            def.line,
            def.column,
        ));
    }

    let mut names = HashSet::new();
    let mut numbers = HashSet::new();
    let mut values = Vec::with_capacity(def.values.len());
    for value in &def.values {
        if !names.insert(value.name.as_str()) {
            return Err(verifier_error(
                &format!("The value {} is defined twice in {}", quote(&value.name), quote(full_name)),
                value.line,
                value.column,
            ));
        }
        if !numbers.insert(value.number) {
            debug!(enum_name = full_name, value = %value.name, number = value.number, "enum value aliases an earlier number");
        }
        values.push(EnumValueDescriptor::new(&value.name, value.number));
    }

    Ok(EnumDescriptor::new(full_name, values))
}

fn build_message(
    full_name: &str,
    def: &MessageDef,
    pool: &DescriptorPool,
    declared: &HashMap<String, Kind>,
) -> Result<MessageDescriptor, SchemaError> {
    let mut names = HashSet::new();
    let mut numbers = HashSet::new();
    let mut fields = Vec::with_capacity(def.fields.len());

    for field in &def.fields {
        if !names.insert(field.name.as_str()) {
            return Err(verifier_error(
                &format!("The field {} is defined twice", quote(&field.name)),
                field.line,
                field.column,
            ));
        }
        if !numbers.insert(field.number) {
            return Err(verifier_error(
                &format!("The id for field {} is used twice", quote(&field.name)),
                field.line,
                field.column,
            ));
        }
        if RESERVED_FIELD_NUMBERS.contains(&field.number) {
            return Err(verifier_error(
                &format!(
                    "The id for field {} falls in the reserved range {}-{}",
                    quote(&field.name),
                    RESERVED_FIELD_NUMBERS.start(),
                    RESERVED_FIELD_NUMBERS.end()
                ),
                field.line,
                field.column,
            ));
        }

        fields.push(build_field(full_name, field, pool, declared)?);
    }

    Ok(MessageDescriptor::new(full_name, fields))
}

fn build_field(
    message: &str,
    def: &FieldDef,
    pool: &DescriptorPool,
    declared: &HashMap<String, Kind>,
) -> Result<FieldDescriptor, SchemaError> {
    let mut field = match FieldType::from_scalar_name(&def.type_name) {
        Some(ty) => FieldDescriptor::scalar(message, &def.name, def.number, def.label, ty),
        None => {
            let (type_ref, kind) = lookup_type(message, &def.type_name, pool, declared).ok_or_else(|| {
                verifier_error(
                    &format!("The type {} is not defined for field {}", quote(&def.type_name), quote(&def.name)),
                    def.line,
                    def.column,
                )
            })?;
            let ty = match kind {
                Kind::Message if def.is_group => FieldType::Group,
                Kind::Message                 => FieldType::Message,
                Kind::Enum                    => FieldType::Enum,
            };
            FieldDescriptor::reference(message, &def.name, def.number, def.label, ty, &type_ref)
        }
    };

    if let Some(constant) = &def.default {
        if def.label == Label::Repeated {
            return Err(verifier_error("Repeated fields can't have default values", constant.line, constant.column));
        }
        field.default_value = Some(default_value(&field, constant, pool)?);
    }

    Ok(field)
}

/// Resolves a type reference from within `scope`, searching the innermost
/// scope first. A leading `.` makes the name fully qualified.
fn lookup_type(
    scope: &str,
    name: &str,
    pool: &DescriptorPool,
    declared: &HashMap<String, Kind>,
) -> Option<(String, Kind)> {
    let kind_of = |full_name: &str| -> Option<Kind> {
        if let Some(kind) = declared.get(full_name) {
            return Some(*kind);
        }
        if pool.find_message_type_by_name(full_name).is_some() {
            return Some(Kind::Message);
        }
        if pool.find_enum_type_by_name(full_name).is_some() {
            return Some(Kind::Enum);
        }
        None
    };

    if let Some(absolute) = name.strip_prefix('.') {
        return kind_of(absolute).map(|k| (absolute.to_string(), k));
    }

    let mut prefix = scope;
    loop {
        let candidate = qualify(prefix, name);
        if let Some(kind) = kind_of(&candidate) {
            return Some((candidate, kind));
        }
        if prefix.is_empty() {
            return None;
        }
        prefix = match prefix.rfind('.') {
            Some(i) => &prefix[..i],
            None => "",
        };
    }
}

fn default_value(field: &FieldDescriptor, constant: &Constant, pool: &DescriptorPool) -> Result<DefaultValue, SchemaError> {
    let text = constant.text.as_str();
    let invalid = || {
        verifier_error(
            &format!("Invalid default value {} for field {} of type {}", text, quote(&field.name), field.field_type),
            constant.line,
            constant.column,
        )
    };
    let integer = || parse_integer(text).ok_or_else(invalid);

    let value = match field.cpp_type() {
        CppType::Int32  => DefaultValue::Int32(i32::try_from(integer()?).map_err(|_| invalid())?),
        CppType::Int64  => DefaultValue::Int64(i64::try_from(integer()?).map_err(|_| invalid())?),
        CppType::UInt32 => DefaultValue::UInt32(u32::try_from(integer()?).map_err(|_| invalid())?),
        CppType::UInt64 => DefaultValue::UInt64(u64::try_from(integer()?).map_err(|_| invalid())?),
        CppType::Float  => DefaultValue::Float(parse_float(text).ok_or_else(invalid)? as f32),
        CppType::Double => DefaultValue::Double(parse_float(text).ok_or_else(invalid)?),
        CppType::Bool   => match text {
            "true"  => DefaultValue::Bool(true),
            "false" => DefaultValue::Bool(false),
            _ => return Err(invalid()),
        },
        CppType::String => {
            if !text.starts_with('"') {
                return Err(invalid());
            }
            DefaultValue::String(serde_json::from_str::<String>(text).map_err(|_| invalid())?)
        }
        CppType::Enum => {
            let enum_name = field.enum_type().unwrap_or_default();
            let value = pool
                .find_enum_type_by_name(enum_name)
                .and_then(|e| e.find_value_by_name(text))
                .ok_or_else(|| {
                    verifier_error(
                        &format!("Enum type {} has no value named {}", quote(enum_name), quote(text)),
                        constant.line,
                        constant.column,
                    )
                })?;
            DefaultValue::Enum { name: value.name.clone(), number: value.number }
        }
        CppType::Message => {
            return Err(verifier_error("Messages can't have default values", constant.line, constant.column));
        }
    };

    if matches!(field.cpp_type(), CppType::Float | CppType::Double) && text.contains("nan") {
        warn!(field = %field.full_name, "default value is NaN");
    }
    Ok(value)
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "inf"  => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan"  => Some(f64::NAN),
        _ if text.starts_with("0x") || text.starts_with("-0x") => parse_integer(text).map(|v| v as f64),
        _ => text.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_schema, tokenizer::tokenize_schema};

    fn resolve(text: &str) -> Result<(TopLevel, DescriptorPool), SchemaError> {
        let file = parse_schema(&tokenize_schema(text)?)?;
        let mut pool = DescriptorPool::new();
        let top = resolve_schema(&file, &mut pool)?;
        Ok((top, pool))
    }

    fn verifier_message(text: &str) -> String {
        match resolve(text) {
            Err(SchemaError::VerifierError { msg, .. }) => msg,
            other => panic!("expected a verifier error, got {:?}", other.map(|(t, _)| t)),
        }
    }

    #[test]
    fn test_resolves_scoped_references() {
        let (top, pool) = resolve(r#"
            package a.b;
            message Outer {
              message Inner { optional Kind kind = 1 [default = SECOND]; }
              enum Kind { FIRST = 1; SECOND = 2; }
              optional Inner inner = 1;
              optional Top top = 2;
              optional .a.b.Outer.Inner again = 3;
            }
            message Top {}
        "#).unwrap();

        assert_eq!(top.messages, ["a.b.Outer", "a.b.Top"]);
        assert!(top.enums.is_empty());

        let outer = pool.find_message_type_by_name("a.b.Outer").unwrap();
        assert_eq!(outer.fields[0].message_type(), Some("a.b.Outer.Inner"));
        assert_eq!(outer.fields[1].message_type(), Some("a.b.Top"));
        assert_eq!(outer.fields[2].message_type(), Some("a.b.Outer.Inner"));

        let inner = pool.find_message_type_by_name("a.b.Outer.Inner").unwrap();
        assert_eq!(inner.fields[0].enum_type(), Some("a.b.Outer.Kind"));
        assert_eq!(
            inner.fields[0].default_value,
            Some(DefaultValue::Enum { name: "SECOND".into(), number: 2 })
        );
    }

    #[test]
    fn test_converts_defaults_by_type() {
        let (_, pool) = resolve(r#"
            message D {
              optional sint32 a = 1 [default = -5];
              optional fixed64 b = 2 [default = 18446744073709551615];
              optional float c = 3 [default = 1.5];
              optional double d = 4 [default = -inf];
              optional bool e = 5 [default = true];
              optional bytes f = 6 [default = "a\tb"];
              optional uint32 g = 7;
            }
        "#).unwrap();
        let d = pool.find_message_type_by_name("D").unwrap();
        assert_eq!(d.fields[0].default_value, Some(DefaultValue::Int32(-5)));
        assert_eq!(d.fields[1].default_value, Some(DefaultValue::UInt64(u64::MAX)));
        assert_eq!(d.fields[2].default_value, Some(DefaultValue::Float(1.5)));
        assert_eq!(d.fields[3].default_value, Some(DefaultValue::Double(f64::NEG_INFINITY)));
        assert_eq!(d.fields[4].default_value, Some(DefaultValue::Bool(true)));
        assert_eq!(d.fields[5].default_value, Some(DefaultValue::String("a\tb".into())));
        assert!(!d.fields[6].has_default_value());
    }

    #[test]
    fn test_verifier_errors() {
        assert!(verifier_message("message A {} enum A { X = 0; }").contains("defined twice"));
        assert!(verifier_message("message A { optional int32 x = 1; optional int32 x = 2; }").contains("defined twice"));
        assert!(verifier_message("message A { optional int32 x = 1; optional int32 y = 1; }").contains("used twice"));
        assert!(verifier_message("message A { optional int32 x = 19500; }").contains("reserved range"));
        assert!(verifier_message("message A { optional Missing x = 1; }").contains("not defined"));
        assert!(verifier_message("enum E {}").contains("at least one value"));
        assert!(verifier_message("enum E { X = 0; X = 1; }").contains("defined twice"));
        assert!(verifier_message("message A { optional int32 x = 1 [default = 1.5]; }").contains("Invalid default"));
        assert!(verifier_message("message A { optional uint32 x = 1 [default = -1]; }").contains("Invalid default"));
        assert!(verifier_message("message A { repeated int32 x = 1 [default = 1]; }").contains("Repeated"));
        assert!(verifier_message("message A { optional A x = 1 [default = 1]; }").contains("Messages"));
        assert!(verifier_message("enum E { X = 0; } message A { optional E e = 1 [default = Y]; }").contains("no value"));
    }

    #[test]
    fn test_verifier_error_points_at_field() {
        match resolve("message A {\n  optional Nope x = 1;\n}") {
            Err(SchemaError::VerifierError { line, column, .. }) => assert_eq!((line, column), (2, 17)),
            other => panic!("unexpected {:?}", other.map(|(t, _)| t)),
        }
    }

    #[test]
    fn test_self_reference_is_allowed() {
        let (_, pool) = resolve("message Node { optional Node next = 1; repeated Node children = 2; }").unwrap();
        let node = pool.find_message_type_by_name("Node").unwrap();
        assert_eq!(node.fields[0].message_type(), Some("Node"));
    }

    #[test]
    fn test_resolves_map_and_group_fields() {
        let (top, pool) = resolve(r#"
            package p;
            enum Color { RED = 0; }
            message M {
              map<int32, Color> colors = 1;
              optional group Extra = 2 { optional string note = 3; }
            }
        "#).unwrap();
        assert_eq!(top.messages, ["p.M"]);

        let m = pool.find_message_type_by_name("p.M").unwrap();
        assert_eq!(m.fields[0].label, Label::Repeated);
        assert_eq!(m.fields[0].message_type(), Some("p.M.ColorsEntry"));
        assert_eq!(m.fields[1].name, "extra");
        assert_eq!(m.fields[1].field_type, FieldType::Group);
        assert_eq!(m.fields[1].group_type(), Some("p.M.Extra"));
        assert_eq!(m.fields[1].message_type(), None);

        let entry = pool.find_message_type_by_name("p.M.ColorsEntry").unwrap();
        assert_eq!(entry.fields[0].field_type, FieldType::Int32);
        assert_eq!(entry.fields[1].enum_type(), Some("p.Color"));
        assert!(pool.find_message_type_by_name("p.M.Extra").is_some());
    }

    #[test]
    fn test_group_cannot_have_default() {
        assert!(verifier_message("message A { optional group G = 1 [default = 1] {} }").contains("Messages"));
    }
}
