use super::{CodecError, RecordCodec};
use mstore_domain::{Attribute, Element, ElementType, Record, RecordKind};
use serde::{Deserialize, Serialize};

/// Pretty-printed JSON documents carrying a `kind` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum Document {
    ElementType {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Element {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Attribute>,
    },
}

impl RecordCodec for JsonCodec {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        let doc = match record {
            Record::ElementType(t) => {
                Document::ElementType { name: t.name.clone(), description: t.description.clone() }
            },
            Record::Element(e) => Document::Element {
                name: e.name.clone(),
                value: e.value.clone(),
                children: e.children.clone(),
            },
        };
        let mut bytes = serde_json::to_vec_pretty(&doc)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn decode(&self, kind: RecordKind, bytes: &[u8]) -> Result<Record, CodecError> {
        let doc: Document = serde_json::from_slice(bytes)?;
        match (kind, doc) {
            (RecordKind::ElementType, Document::ElementType { name, description }) => {
                let mut t = ElementType::new(String::new(), name);
                t.description = description;
                Ok(Record::ElementType(t))
            },
            (RecordKind::Element, Document::Element { name, value, children }) => {
                Ok(Record::Element(Element { id: None, name, value, children }))
            },
            (expected, Document::ElementType { .. }) => {
                Err(CodecError::KindMismatch { expected, found: "element-type".into() })
            },
            (expected, Document::Element { .. }) => {
                Err(CodecError::KindMismatch { expected, found: "element".into() })
            },
        }
    }
}
