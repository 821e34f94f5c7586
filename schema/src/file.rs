use crate::descriptor::{short_name, EnumDescriptor, MessageDescriptor};
use crate::pool::DescriptorPool;
use serde::Serialize;

/// One loaded `.proto` file: its own top-level types, in declaration order,
/// plus a pool covering the file and everything it imports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaFile {
    pub name:         String,
    pub package:      Option<String>,
    pub dependencies: Vec<String>,
    /// Qualified names of the top-level messages.
    pub messages:     Vec<String>,
    /// Qualified names of the top-level enums.
    pub enums:        Vec<String>,
    pub pool:         DescriptorPool,
}

impl SchemaFile {
    pub fn new(name: &str, package: Option<String>) -> Self {
        SchemaFile {
            name: name.to_string(),
            package,
            ..Default::default()
        }
    }

    /// Top-level messages in declaration order.
    pub fn message_types(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.iter().filter_map(|n| self.pool.find_message_type_by_name(n))
    }

    /// Top-level enums in declaration order.
    pub fn enum_types(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.enums.iter().filter_map(|n| self.pool.find_enum_type_by_name(n))
    }

    /// Finds a top-level message by its unqualified name.
    pub fn find_message_type_by_name(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages
            .iter()
            .find(|n| short_name(n) == name)
            .and_then(|n| self.pool.find_message_type_by_name(n))
    }

    /// Finds a top-level enum by its unqualified name.
    pub fn find_enum_type_by_name(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums
            .iter()
            .find(|n| short_name(n) == name)
            .and_then(|n| self.pool.find_enum_type_by_name(n))
    }
}
