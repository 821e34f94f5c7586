//! protodiff-loader
//!
//! Turns `.proto` files into [`SchemaFile`](protodiff_schema::SchemaFile)s:
//!  1) A tokenizer + parser for the proto2 definition language,
//!  2) A resolver that checks the schema (duplicate types, field ids, bad
//!     defaults, unknown types) and builds descriptors,
//!  3) An importer that follows `import` statements through a `SourceTree`,
//!  4) Error types (`SchemaError`) carrying file/line/column diagnostics.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod resolver;
pub mod source;

pub use error::SchemaError;
pub use source::{load_schema, DiskSourceTree, Importer, MemorySourceTree, SourceTree};
