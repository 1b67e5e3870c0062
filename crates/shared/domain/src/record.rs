//! Metastore records.
//!
//! A store holds two kinds of documents: element types (schemas living in their own folder) and
//! elements (values living as files inside that folder). Both are exposed through the
//! [`Describable`] capability set and can travel together as a tagged [`Record`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for the two document kinds a store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    ElementType,
    Element,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementType => f.write_str("element-type"),
            Self::Element => f.write_str("element"),
        }
    }
}

/// The identity surface shared by every record.
pub trait Describable {
    fn kind(&self) -> RecordKind;

    /// File-backed identifier. `None` until the record has been stored or loaded.
    fn id(&self) -> Option<&str>;

    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }
}

/// A schema definition owned by a namespace.
///
/// In a file-backed store the id is the name of the folder holding the type, so `id` and
/// `name` coincide once the type has been created.
///
/// A handle returned by a store is stamped with that store's name. Element mutations that
/// require an owned handle compare the stamp with the store they are sent to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub namespace: String,
    #[serde(skip)]
    store_name: Option<String>,
}

impl ElementType {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name of the store this handle was created in or retrieved from.
    #[must_use]
    pub fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    /// Binds the handle to a store.
    pub fn stamp(&mut self, store_name: impl Into<String>) {
        self.store_name = Some(store_name.into());
    }

    #[must_use]
    pub fn is_bound_to(&self, store_name: &str) -> bool {
        self.store_name.as_deref() == Some(store_name)
    }
}

impl Describable for ElementType {
    fn kind(&self) -> RecordKind {
        RecordKind::ElementType
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A node of an element's payload tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl Attribute {
    #[must_use]
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self { id: id.into(), value: Some(value.into()), children: Vec::new() }
    }

    /// An attribute without a value, used to group children.
    #[must_use]
    pub fn group(id: impl Into<String>) -> Self {
        Self { id: id.into(), value: None, children: Vec::new() }
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn child(&self, id: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.id == id)
    }
}

/// A named value stored under an element type.
///
/// The id is derived from the document filename; it is never trusted from the document body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: Option<String>,
    pub name: String,
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Attribute>,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Attribute) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn child(&self, id: &str) -> Option<&Attribute> {
        self.children.iter().find(|c| c.id == id)
    }
}

impl Describable for Element {
    fn kind(&self) -> RecordKind {
        RecordKind::Element
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Tagged union of the two record kinds, as seen at the codec boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Record {
    ElementType(ElementType),
    Element(Element),
}

impl Record {
    #[must_use]
    pub fn into_element_type(self) -> Option<ElementType> {
        match self {
            Self::ElementType(t) => Some(t),
            Self::Element(_) => None,
        }
    }

    #[must_use]
    pub fn into_element(self) -> Option<Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::ElementType(_) => None,
        }
    }
}

impl Describable for Record {
    fn kind(&self) -> RecordKind {
        match self {
            Self::ElementType(t) => t.kind(),
            Self::Element(e) => e.kind(),
        }
    }

    fn id(&self) -> Option<&str> {
        match self {
            Self::ElementType(t) => t.id(),
            Self::Element(e) => e.id(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::ElementType(t) => t.name(),
            Self::Element(e) => e.name(),
        }
    }

    fn description(&self) -> Option<&str> {
        match self {
            Self::ElementType(t) => t.description(),
            Self::Element(e) => e.description(),
        }
    }
}

impl From<ElementType> for Record {
    fn from(value: ElementType) -> Self {
        Self::ElementType(value)
    }
}

impl From<Element> for Record {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}
