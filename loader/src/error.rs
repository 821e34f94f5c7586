use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Verifier error at line {line}, column {column}: {msg}")]
    VerifierError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    /// A parse or verifier error attributed to the file it came from.
    #[error("{file}@{line},{column}: {msg}")]
    Diagnostic {
        file:   String,
        line:   usize,
        column: usize,
        msg:    String,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Import cycle: {0}")]
    ImportCycle(String),
}

impl SchemaError {
    /// Attaches `file` to a located error. Other variants pass through.
    pub fn in_file(self, file: &str) -> SchemaError {
        match self {
            SchemaError::ParseError { msg, line, column }
            | SchemaError::VerifierError { msg, line, column } => SchemaError::Diagnostic {
                file: file.to_string(),
                line,
                column,
                msg,
            },
            other => other,
        }
    }
}
