use crate::{
    tokenizer::Token,
    types::{Constant, EnumDef, EnumValueDef, FieldDef, Import, MessageDef, ProtoFile},
    utils::{error, quote, unquote},
    error::SchemaError,
};
use lazy_static::lazy_static;
use protodiff_schema::Label;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref IDENTIFIER:    Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref FULL_IDENT:    Regex = Regex::new(r"^\.?[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref INTEGER:       Regex = Regex::new(r"^-?(?:0[xX][0-9A-Fa-f]+|\d+)$").unwrap();
    static ref STRING:        Regex = Regex::new(r#"^(?:"|')"#).unwrap();
    static ref CONSTANT:      Regex = Regex::new(r#"^(?:"|'|-?[0-9.A-Za-z_])"#).unwrap();
    static ref EQUALS:        Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:     Regex = Regex::new(r"^;$").unwrap();
    static ref COMMA:         Regex = Regex::new(r"^,$").unwrap();
    static ref LEFT_BRACE:    Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:   Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_BRACKET:  Regex = Regex::new(r"^\[$").unwrap();
    static ref RIGHT_BRACKET: Regex = Regex::new(r"^\]$").unwrap();
    static ref LEFT_PAREN:    Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:   Regex = Regex::new(r"^\)$").unwrap();
    static ref LEFT_ANGLE:    Regex = Regex::new(r"^<$").unwrap();
    static ref RIGHT_ANGLE:   Regex = Regex::new(r"^>$").unwrap();
}

/// Scalar types allowed as map keys.
const MAP_KEY_TYPES: &[&str] = &[
    "int32", "int64", "uint32", "uint64", "sint32", "sint64",
    "fixed32", "fixed64", "sfixed32", "sfixed64", "bool", "string",
];

/// Largest field number the wire format can encode.
pub const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Parses a token stream (as produced by `tokenize_schema`) into a `ProtoFile`.
pub fn parse_schema(tokens: &[Token]) -> Result<ProtoFile, SchemaError> {
    if tokens.is_empty() {
        return Err(error("Expected end of file token", 0, 0));
    }
    let mut parser = Parser { tokens, index: 0, proto3: false };
    parser.parse_file()
}

/// Name of the message generated for a map field: the field name in
/// CamelCase followed by `Entry`, so `item_counts` gives `ItemCountsEntry`.
pub fn map_entry_name(field_name: &str) -> String {
    let mut name = String::with_capacity(field_name.len() + 5);
    let mut upper = true;
    for c in field_name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name.push_str("Entry");
    name
}

/// Parses an integer literal (decimal, hex or octal, optionally negative).
/// The result is wide enough for both `int64` and `uint64` ranges.
pub fn parse_integer(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i128::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };
    let value = if negative { -magnitude } else { magnitude };
    if value < i64::MIN as i128 || value > u64::MAX as i128 {
        return None;
    }
    Some(value)
}

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
    proto3: bool,
}

impl<'a> Parser<'a> {
    fn current_token(&self) -> &'a Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.index.min(last)]
    }

    fn at_eof(&self) -> bool {
        self.index + 1 >= self.tokens.len()
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if !self.at_eof() && test.is_match(&self.current_token().text) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if !self.at_eof() && self.current_token().text == keyword {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.current_token().text == keyword
    }

    /// Tests the token after the current one.
    fn peek_next(&self, test: &Regex) -> bool {
        self.tokens.get(self.index + 1).map_or(false, |tok| test.is_match(&tok.text))
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, SchemaError> {
        let tok = self.current_token();
        if !self.eat(test) {
            return Err(error(
                &format!("Expected {} but found {}", expected, quote(&tok.text)),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    fn unexpected_token(&self) -> SchemaError {
        let tok = self.current_token();
        if tok.text.is_empty() {
            return error("Unexpected end of file", tok.line, tok.column);
        }
        error(
            &format!("Unexpected token {}", quote(&tok.text)),
            tok.line,
            tok.column,
        )
    }

    fn expect_string(&mut self) -> Result<String, SchemaError> {
        let tok = self.expect(&STRING, "string")?;
        unquote(&tok.text).ok_or_else(|| {
            error(&format!("Invalid string {}", tok.text), tok.line, tok.column)
        })
    }

    fn expect_integer(&mut self) -> Result<(i128, &'a Token), SchemaError> {
        let tok = self.expect(&INTEGER, "integer")?;
        let value = parse_integer(&tok.text).ok_or_else(|| {
            error(&format!("Invalid integer {}", quote(&tok.text)), tok.line, tok.column)
        })?;
        Ok((value, tok))
    }

    fn parse_file(&mut self) -> Result<ProtoFile, SchemaError> {
        let mut file = ProtoFile::default();

        if self.eat_keyword("syntax") {
            self.expect(&EQUALS, "\"=\"")?;
            let tok = self.current_token();
            let syntax = self.expect_string()?;
            if syntax != "proto2" && syntax != "proto3" {
                return Err(error(
                    &format!("Unrecognized syntax identifier {}", quote(&syntax)),
                    tok.line,
                    tok.column,
                ));
            }
            self.proto3 = syntax == "proto3";
            self.expect(&SEMICOLON, "\";\"")?;
            file.syntax = Some(syntax);
        }

        while !self.at_eof() {
            if self.eat_keyword("package") {
                let tok = self.current_token();
                if file.package.is_some() {
                    return Err(error("Multiple package definitions", tok.line, tok.column));
                }
                let pkg = self.expect(&FULL_IDENT, "package name")?;
                file.package = Some(pkg.text.clone());
                self.expect(&SEMICOLON, "\";\"")?;
            } else if self.eat_keyword("import") {
                let tok = self.current_token();
                if !self.eat_keyword("public") {
                    self.eat_keyword("weak");
                }
                let path = self.expect_string()?;
                self.expect(&SEMICOLON, "\";\"")?;
                file.imports.push(Import { path, line: tok.line, column: tok.column });
            } else if self.eat_keyword("option") {
                self.skip_statement()?;
            } else if self.eat_keyword("message") {
                file.messages.push(self.parse_message()?);
            } else if self.eat_keyword("enum") {
                file.enums.push(self.parse_enum()?);
            } else if self.peek_keyword("service") || self.peek_keyword("extend") {
                let tok = self.current_token();
                debug!(keyword = %tok.text, line = tok.line, "skipping block");
                self.index += 1;
                self.skip_block()?;
            } else if self.eat(&SEMICOLON) {
                continue;
            } else {
                return Err(self.unexpected_token());
            }
        }

        Ok(file)
    }

    fn parse_message(&mut self) -> Result<MessageDef, SchemaError> {
        let name_tok = self.expect(&IDENTIFIER, "identifier")?;
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut message = MessageDef {
            name:     name_tok.text.clone(),
            line:     name_tok.line,
            column:   name_tok.column,
            fields:   Vec::new(),
            messages: Vec::new(),
            enums:    Vec::new(),
        };
        self.parse_message_body(&mut message)?;
        Ok(message)
    }

    /// Everything after a message's (or group's) opening brace, through the
    /// closing one.
    fn parse_message_body(&mut self, message: &mut MessageDef) -> Result<(), SchemaError> {
        while !self.eat(&RIGHT_BRACE) {
            if self.at_eof() {
                return Err(self.unexpected_token());
            }
            if self.eat_keyword("message") {
                message.messages.push(self.parse_message()?);
            } else if self.eat_keyword("enum") {
                message.enums.push(self.parse_enum()?);
            } else if self.eat_keyword("oneof") {
                self.expect(&IDENTIFIER, "identifier")?;
                self.expect(&LEFT_BRACE, "\"{\"")?;
                while !self.eat(&RIGHT_BRACE) {
                    if self.at_eof() {
                        return Err(self.unexpected_token());
                    }
                    if self.eat_keyword("option") {
                        self.skip_statement()?;
                    } else if !self.eat(&SEMICOLON) {
                        self.parse_field(Some(Label::Optional), message)?;
                    }
                }
            } else if self.eat_keyword("option")
                || self.eat_keyword("reserved")
                || self.eat_keyword("extensions")
            {
                self.skip_statement()?;
            } else if self.peek_keyword("extend") {
                self.index += 1;
                self.skip_block()?;
            } else if self.peek_keyword("map") && self.peek_next(&LEFT_ANGLE) {
                self.index += 1;
                self.parse_map_field(message)?;
            } else if self.eat(&SEMICOLON) {
                continue;
            } else {
                self.parse_field(None, message)?;
            }
        }
        Ok(())
    }

    /// `label type name = number [options];` or
    /// `label group Name = number [options] { ... }`. The field, and for a
    /// group its message, are added to `message`. A oneof member has no
    /// label and passes `Some(Label::Optional)`.
    fn parse_field(&mut self, implied_label: Option<Label>, message: &mut MessageDef) -> Result<(), SchemaError> {
        let label_tok = self.current_token();
        let label = if let Some(label) = implied_label {
            label
        } else if self.eat_keyword("optional") {
            Label::Optional
        } else if self.eat_keyword("required") {
            Label::Required
        } else if self.eat_keyword("repeated") {
            Label::Repeated
        } else if self.proto3 {
            Label::Optional
        } else {
            return Err(error(
                &format!("Expected \"required\", \"optional\", or \"repeated\" but found {}", quote(&label_tok.text)),
                label_tok.line,
                label_tok.column,
            ));
        };

        if self.peek_keyword("group") && self.peek_next(&IDENTIFIER) {
            self.index += 1;
            return self.parse_group(label, message);
        }

        let type_tok = self.expect(&FULL_IDENT, "type name")?;
        let name_tok = self.expect(&IDENTIFIER, "field name")?;
        let number = self.parse_field_number(&name_tok.text)?;
        let default = self.parse_options()?;
        self.expect(&SEMICOLON, "\";\"")?;

        message.fields.push(FieldDef {
            name:      name_tok.text.clone(),
            line:      name_tok.line,
            column:    name_tok.column,
            label,
            type_name: type_tok.text.clone(),
            number,
            default,
            is_group:  false,
        });
        Ok(())
    }

    /// A group declares a nested message named `Name` and a field of that
    /// type named `name`.
    fn parse_group(&mut self, label: Label, message: &mut MessageDef) -> Result<(), SchemaError> {
        let name_tok = self.expect(&IDENTIFIER, "group name")?;
        if !name_tok.text.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(error("Group names must start with a capital letter", name_tok.line, name_tok.column));
        }
        let number = self.parse_field_number(&name_tok.text)?;
        let default = self.parse_options()?;
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut group = MessageDef {
            name:     name_tok.text.clone(),
            line:     name_tok.line,
            column:   name_tok.column,
            fields:   Vec::new(),
            messages: Vec::new(),
            enums:    Vec::new(),
        };
        self.parse_message_body(&mut group)?;

        message.fields.push(FieldDef {
            name:      name_tok.text.to_ascii_lowercase(),
            line:      name_tok.line,
            column:    name_tok.column,
            label,
            type_name: name_tok.text.clone(),
            number,
            default,
            is_group:  true,
        });
        message.messages.push(group);
        Ok(())
    }

    /// `map<K, V> name = number [options];`, called after `map`. Becomes a
    /// repeated field of a generated `<Name>Entry` message holding `key = 1`
    /// and `value = 2`.
    fn parse_map_field(&mut self, message: &mut MessageDef) -> Result<(), SchemaError> {
        self.expect(&LEFT_ANGLE, "\"<\"")?;
        let key_tok = self.expect(&FULL_IDENT, "map key type")?;
        if !MAP_KEY_TYPES.contains(&key_tok.text.as_str()) {
            return Err(error(
                &format!("Key in map fields cannot be of type {}", quote(&key_tok.text)),
                key_tok.line,
                key_tok.column,
            ));
        }
        self.expect(&COMMA, "\",\"")?;
        let value_tok = self.expect(&FULL_IDENT, "map value type")?;
        self.expect(&RIGHT_ANGLE, "\">\"")?;
        let name_tok = self.expect(&IDENTIFIER, "field name")?;
        let number = self.parse_field_number(&name_tok.text)?;
        let default = self.parse_options()?;
        self.expect(&SEMICOLON, "\";\"")?;

        let entry_name = map_entry_name(&name_tok.text);
        let entry_field = |name: &str, type_name: &str, number: i32| FieldDef {
            name:      name.to_string(),
            line:      name_tok.line,
            column:    name_tok.column,
            label:     Label::Optional,
            type_name: type_name.to_string(),
            number,
            default:   None,
            is_group:  false,
        };
        message.messages.push(MessageDef {
            name:     entry_name.clone(),
            line:     name_tok.line,
            column:   name_tok.column,
            fields:   vec![entry_field("key", &key_tok.text, 1), entry_field("value", &value_tok.text, 2)],
            messages: Vec::new(),
            enums:    Vec::new(),
        });
        message.fields.push(FieldDef {
            name:      name_tok.text.clone(),
            line:      name_tok.line,
            column:    name_tok.column,
            label:     Label::Repeated,
            type_name: entry_name,
            number,
            default,
            is_group:  false,
        });
        Ok(())
    }

    /// `= number`, checked against the wire format's range.
    fn parse_field_number(&mut self, field_name: &str) -> Result<i32, SchemaError> {
        self.expect(&EQUALS, "\"=\"")?;
        let (number, number_tok) = self.expect_integer()?;
        if !(1..=MAX_FIELD_NUMBER as i128).contains(&number) {
            return Err(error(
                &format!("Field number {} is out of range for field {}", number, quote(field_name)),
                number_tok.line,
                number_tok.column,
            ));
        }
        Ok(number as i32)
    }

    fn parse_enum(&mut self) -> Result<EnumDef, SchemaError> {
        let name_tok = self.expect(&IDENTIFIER, "identifier")?;
        self.expect(&LEFT_BRACE, "\"{\"")?;

        let mut values = Vec::new();
        while !self.eat(&RIGHT_BRACE) {
            if self.at_eof() {
                return Err(self.unexpected_token());
            }
            if self.eat_keyword("option") || self.eat_keyword("reserved") {
                self.skip_statement()?;
                continue;
            }
            if self.eat(&SEMICOLON) {
                continue;
            }

            let v_name = self.expect(&IDENTIFIER, "identifier")?;
            self.expect(&EQUALS, "\"=\"")?;
            let (number, number_tok) = self.expect_integer()?;
            let number = i32::try_from(number).map_err(|_| {
                error(
                    &format!("Enum value {} is out of range", quote(&number_tok.text)),
                    number_tok.line,
                    number_tok.column,
                )
            })?;
            self.parse_options()?;
            self.expect(&SEMICOLON, "\";\"")?;

            values.push(EnumValueDef {
                name:   v_name.text.clone(),
                line:   v_name.line,
                column: v_name.column,
                number,
            });
        }

        Ok(EnumDef {
            name:   name_tok.text.clone(),
            line:   name_tok.line,
            column: name_tok.column,
            values,
        })
    }

    /// `[name = constant, ...]`. Returns the `default` constant if present;
    /// every other option is skipped.
    fn parse_options(&mut self) -> Result<Option<Constant>, SchemaError> {
        let mut default = None;
        if !self.eat(&LEFT_BRACKET) {
            return Ok(None);
        }

        loop {
            let name_tok = self.current_token();
            let name = if self.eat(&LEFT_PAREN) {
                let inner = self.expect(&FULL_IDENT, "option name")?;
                self.expect(&RIGHT_PAREN, "\")\"")?;
                let mut name = format!("({})", inner.text);
                let next = self.current_token();
                if next.text.starts_with('.') && self.eat(&FULL_IDENT) {
                    name.push_str(&next.text);
                }
                name
            } else {
                self.expect(&FULL_IDENT, "option name")?.text.clone()
            };
            self.expect(&EQUALS, "\"=\"")?;
            let value = self.parse_constant()?;

            if name == "default" {
                if default.is_some() {
                    return Err(error("Already set option \"default\"", name_tok.line, name_tok.column));
                }
                default = Some(value);
            } else {
                debug!(option = %name, line = name_tok.line, "ignoring field option");
            }

            if !self.eat(&COMMA) {
                break;
            }
        }

        self.expect(&RIGHT_BRACKET, "\"]\"")?;
        Ok(default)
    }

    /// A single literal or identifier. Adjacent string literals are joined.
    fn parse_constant(&mut self) -> Result<Constant, SchemaError> {
        let tok = self.current_token();
        if self.peek_keyword("{") {
            self.skip_braces()?;
            return Ok(Constant { text: String::new(), line: tok.line, column: tok.column });
        }
        if STRING.is_match(&tok.text) {
            let mut joined = String::new();
            while STRING.is_match(&self.current_token().text) {
                let part = self.current_token();
                let value = unquote(&part.text).ok_or_else(|| {
                    error(&format!("Invalid string {}", part.text), part.line, part.column)
                })?;
                joined.push_str(&value);
                self.index += 1;
            }
            return Ok(Constant { text: quote(&joined), line: tok.line, column: tok.column });
        }
        let tok = self.expect(&CONSTANT, "constant")?;
        Ok(Constant { text: tok.text.clone(), line: tok.line, column: tok.column })
    }

    /// Skips to and past the next `;`, stepping over any `{...}` aggregate.
    fn skip_statement(&mut self) -> Result<(), SchemaError> {
        loop {
            if self.at_eof() {
                return Err(self.unexpected_token());
            }
            if self.peek_keyword("{") {
                self.skip_braces()?;
                continue;
            }
            if self.eat(&SEMICOLON) {
                return Ok(());
            }
            self.index += 1;
        }
    }

    /// Skips a header up to `{` and then the balanced block it opens.
    fn skip_block(&mut self) -> Result<(), SchemaError> {
        while !self.peek_keyword("{") {
            if self.at_eof() {
                return Err(self.unexpected_token());
            }
            self.index += 1;
        }
        self.skip_braces()
    }

    fn skip_braces(&mut self) -> Result<(), SchemaError> {
        self.expect(&LEFT_BRACE, "\"{\"")?;
        let mut depth = 1;
        while depth > 0 {
            if self.at_eof() {
                return Err(self.unexpected_token());
            }
            if self.eat(&LEFT_BRACE) {
                depth += 1;
            } else if self.eat(&RIGHT_BRACE) {
                depth -= 1;
            } else {
                self.index += 1;
            }
        }
        Ok(())
    }
}
