use crate::descriptor::{EnumDescriptor, MessageDescriptor};
use serde::Serialize;
use std::collections::HashMap;

/// Registry of every message and enum known to one schema version.
///
/// Descriptors are stored in insertion order and indexed by qualified name.
/// Re-adding a name replaces nothing: the first definition wins and `false`
/// is returned, leaving duplicate handling to the loader.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DescriptorPool {
    messages: Vec<MessageDescriptor>,
    enums:    Vec<EnumDescriptor>,
    #[serde(skip)]
    index:    HashMap<String, Entry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Message(usize),
    Enum(usize),
}

impl DescriptorPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: MessageDescriptor) -> bool {
        if self.index.contains_key(&message.full_name) {
            return false;
        }
        self.index.insert(message.full_name.clone(), Entry::Message(self.messages.len()));
        self.messages.push(message);
        true
    }

    pub fn add_enum(&mut self, enum_: EnumDescriptor) -> bool {
        if self.index.contains_key(&enum_.full_name) {
            return false;
        }
        self.index.insert(enum_.full_name.clone(), Entry::Enum(self.enums.len()));
        self.enums.push(enum_);
        true
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.index.contains_key(full_name)
    }

    pub fn find_message_type_by_name(&self, full_name: &str) -> Option<&MessageDescriptor> {
        match self.index.get(full_name) {
            Some(Entry::Message(i)) => self.messages.get(*i),
            _ => None,
        }
    }

    pub fn find_enum_type_by_name(&self, full_name: &str) -> Option<&EnumDescriptor> {
        match self.index.get(full_name) {
            Some(Entry::Enum(i)) => self.enums.get(*i),
            _ => None,
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.enums.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::EnumValueDescriptor;

    #[test]
    fn test_lookup_is_kind_specific() {
        let mut pool = DescriptorPool::new();
        assert!(pool.add_message(MessageDescriptor::new("a.Thing", vec![])));
        assert!(pool.add_enum(EnumDescriptor::new("a.Kind", vec![EnumValueDescriptor::new("X", 0)])));

        assert!(pool.find_message_type_by_name("a.Thing").is_some());
        assert!(pool.find_enum_type_by_name("a.Thing").is_none());
        assert!(pool.find_enum_type_by_name("a.Kind").is_some());
        assert!(pool.find_message_type_by_name("Thing").is_none());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_first_definition_wins() {
        let mut pool = DescriptorPool::new();
        assert!(pool.add_message(MessageDescriptor::new("a.Thing", vec![])));
        assert!(!pool.add_enum(EnumDescriptor::new("a.Thing", vec![])));
        assert!(pool.find_enum_type_by_name("a.Thing").is_none());
        assert_eq!(pool.enums().count(), 0);
    }
}
