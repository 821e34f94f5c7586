use serde::Serialize;
use std::fmt;

/// One kind of pointwise difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    EnumValueIdChanged,
    EnumValueAdded,
    EnumValueRemoved,
    MessageFieldNameChanged,
    MessageFieldIdChanged,
    MessageFieldLabelChanged,
    MessageFieldTypeChanged,
    MessageFieldDefaultValueChanged,
    MessageFieldAdded,
    MessageFieldRemoved,
    FileMessageAdded,
    FileMessageRemoved,
    FileEnumAdded,
    FileEnumRemoved,
    NameMissing,
}

impl ItemType {
    pub fn description(&self) -> &'static str {
        match self {
            ItemType::EnumValueIdChanged              => "Value ID changed",
            ItemType::EnumValueAdded                  => "Value added",
            ItemType::EnumValueRemoved                => "Value removed",
            ItemType::MessageFieldNameChanged         => "Name changed",
            ItemType::MessageFieldIdChanged           => "ID changed",
            ItemType::MessageFieldLabelChanged        => "Label changed",
            ItemType::MessageFieldTypeChanged         => "Type changed",
            ItemType::MessageFieldDefaultValueChanged => "Default value changed",
            ItemType::MessageFieldAdded               => "Field added",
            ItemType::MessageFieldRemoved             => "Field removed",
            ItemType::FileMessageAdded                => "Message added",
            ItemType::FileMessageRemoved              => "Message removed",
            ItemType::FileEnumAdded                   => "Enum added",
            ItemType::FileEnumRemoved                 => "Enum removed",
            ItemType::NameMissing                     => "Name missing",
        }
    }
}

/// A single difference. What `before` and `after` hold depends on `kind`:
/// old/new ids for id changes, the entity name on one side for additions
/// and removals (the other side empty), nothing for label and default
/// value changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind:   ItemType,
    pub before: String,
    pub after:  String,
}

impl Item {
    pub fn new(kind: ItemType, before: impl Into<String>, after: impl Into<String>) -> Self {
        Item {
            kind,
            before: before.into(),
            after:  after.into(),
        }
    }

    pub fn message(&self) -> String {
        format!("{}: {} -> {}", self.kind.description(), self.before, self.after)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Which pair of entities a section compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Root,
    Message,
    MessageField,
    Enum,
    EnumValue,
}

/// A node of the comparison tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind:     SectionType,
    pub name_a:   String,
    pub name_b:   String,
    pub sections: Vec<Section>,
    pub items:    Vec<Item>,
}

impl Section {
    pub fn new(kind: SectionType, name_a: impl Into<String>, name_b: impl Into<String>) -> Self {
        Section {
            kind,
            name_a:   name_a.into(),
            name_b:   name_b.into(),
            sections: Vec::new(),
            items:    Vec::new(),
        }
    }

    pub fn root() -> Self {
        Section::new(SectionType::Root, "", "")
    }

    /// Appends an empty child section and returns it for filling in.
    pub fn add_section(&mut self, kind: SectionType, name_a: impl Into<String>, name_b: impl Into<String>) -> &mut Section {
        self.sections.push(Section::new(kind, name_a, name_b));
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn add_item(&mut self, kind: ItemType, before: impl Into<String>, after: impl Into<String>) {
        self.items.push(Item::new(kind, before, after));
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.items.is_empty()
    }

    /// Removes, bottom-up, every descendant that carries no items anywhere
    /// in its subtree. The section itself is kept even if it ends up empty.
    pub fn trim(&mut self) {
        self.sections.retain_mut(|s| {
            s.trim();
            !s.is_empty()
        });
    }

    /// First direct child comparing an entity named `name_a` on the first side.
    pub fn find_section(&self, name_a: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name_a == name_a)
    }

    /// Every item in this subtree, in rendering order.
    pub fn all_items(&self) -> Vec<&Item> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a Item>) {
        out.extend(self.items.iter());
        for section in &self.sections {
            section.collect_items(out);
        }
    }

    pub fn change_count(&self) -> usize {
        self.items.len() + self.sections.iter().map(Section::change_count).sum::<usize>()
    }

    /// The one-line heading for this section.
    pub fn message(&self) -> String {
        match self.kind {
            SectionType::Root         => "/".to_string(),
            SectionType::Message      => format!("Comparing messages: {} -> {}", self.name_a, self.name_b),
            SectionType::MessageField => format!("Comparing message fields: {} -> {}", self.name_a, self.name_b),
            SectionType::Enum         => format!("Comparing enums: {} -> {}", self.name_a, self.name_b),
            SectionType::EnumValue    => format!("Comparing enum values: {} -> {}", self.name_a, self.name_b),
        }
    }

    /// Indented dump of the whole subtree: heading, then `* item` lines,
    /// then child sections one level deeper.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, level: usize) {
        out.push_str(&" ".repeat(level * 2));
        out.push_str(&self.message());
        out.push('\n');

        let subprefix = " ".repeat((level + 1) * 2);
        for item in &self.items {
            out.push_str(&subprefix);
            out.push_str("* ");
            out.push_str(&item.message());
            out.push('\n');
        }

        for section in &self.sections {
            section.render_into(out, level + 1);
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
