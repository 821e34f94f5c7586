use crate::error::SchemaError;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> SchemaError {
    SchemaError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

pub fn verifier_error(msg: &str, line: usize, column: usize) -> SchemaError {
    SchemaError::VerifierError {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Strips the quotes from a string literal token and resolves its escapes.
pub fn unquote(literal: &str) -> Option<String> {
    let mut chars = literal.chars();
    let open = chars.next()?;
    if (open != '"' && open != '\'') || !literal.ends_with(open) || literal.len() < 2 {
        return None;
    }
    let body = &literal[1..literal.len() - 1];

    let mut out = String::with_capacity(body.len());
    let mut it = body.chars().peekable();
    while let Some(c) = it.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match it.next()? {
            'n'  => out.push('\n'),
            'r'  => out.push('\r'),
            't'  => out.push('\t'),
            '0'  => out.push('\0'),
            '\\' => out.push('\\'),
            '"'  => out.push('"'),
            '\'' => out.push('\''),
            'x'  => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match it.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            hex.push(*h);
                            it.next();
                        }
                        _ => break,
                    }
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}
