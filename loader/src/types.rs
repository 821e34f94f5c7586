use protodiff_schema::Label;

/// Parsed, unresolved contents of one `.proto` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtoFile {
    pub syntax:   Option<String>,
    pub package:  Option<String>,
    pub imports:  Vec<Import>,
    pub messages: Vec<MessageDef>,
    pub enums:    Vec<EnumDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path:   String,
    pub line:   usize,
    pub column: usize,
}

/// A literal as written in the schema. Interpreted once the field type is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name:      String,
    pub line:      usize,
    pub column:    usize,
    pub label:     Label,
    /// Type as written: a scalar keyword or a (possibly relative) type name.
    pub type_name: String,
    pub number:    i32,
    pub default:   Option<Constant>,
    /// Declared with `group`; `type_name` names the sibling message the
    /// group body became.
    pub is_group:  bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub fields:   Vec<FieldDef>,
    pub messages: Vec<MessageDef>,
    pub enums:    Vec<EnumDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDef {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub values: Vec<EnumValueDef>,
}
