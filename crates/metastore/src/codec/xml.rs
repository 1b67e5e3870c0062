use super::{CodecError, RecordCodec};
use mstore_domain::{Attribute, Element, ElementType, Record, RecordKind};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const TYPE_ROOT: &str = "data-type";
const ELEMENT_ROOT: &str = "element";

/// XML documents, one file per record.
///
/// ```xml
/// <data-type>
///   <name>connections</name>
///   <description>Database connections</description>
/// </data-type>
/// ```
///
/// ```xml
/// <element>
///   <name>warehouse</name>
///   <children>
///     <child id="host"><value>db.local</value></child>
///   </children>
/// </element>
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "data-type")]
struct TypeDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "element")]
struct ElementDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "ChildList::is_empty")]
    children: ChildList,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChildList {
    #[serde(default)]
    child: Vec<ChildDocument>,
}

impl ChildList {
    const fn is_empty(&self) -> bool {
        self.child.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChildDocument {
    #[serde(rename = "@id")]
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "ChildList::is_empty")]
    children: ChildList,
}

impl From<&[Attribute]> for ChildList {
    fn from(attributes: &[Attribute]) -> Self {
        Self {
            child: attributes
                .iter()
                .map(|a| ChildDocument {
                    id: a.id.clone(),
                    value: a.value.clone(),
                    children: a.children.as_slice().into(),
                })
                .collect(),
        }
    }
}

impl From<ChildList> for Vec<Attribute> {
    fn from(list: ChildList) -> Self {
        list.child
            .into_iter()
            .map(|c| Attribute { id: c.id, value: c.value, children: c.children.into() })
            .collect()
    }
}

impl XmlCodec {
    fn to_document<T: Serialize>(doc: &T) -> Result<Vec<u8>, CodecError> {
        let mut out = String::from(DECLARATION);
        let mut ser = quick_xml::se::Serializer::new(&mut out);
        ser.indent(' ', 2);
        doc.serialize(ser)?;
        out.push('\n');
        Ok(out.into_bytes())
    }
}

impl RecordCodec for XmlCodec {
    fn extension(&self) -> &'static str {
        "xml"
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        match record {
            Record::ElementType(t) => Self::to_document(&TypeDocument {
                name: t.name.clone(),
                description: t.description.clone(),
            }),
            Record::Element(e) => Self::to_document(&ElementDocument {
                name: e.name.clone(),
                value: e.value.clone(),
                children: e.children.as_slice().into(),
            }),
        }
    }

    fn decode(&self, kind: RecordKind, bytes: &[u8]) -> Result<Record, CodecError> {
        let text = std::str::from_utf8(bytes)?;
        let root = root_tag(text)?;
        let expected = match kind {
            RecordKind::ElementType => TYPE_ROOT,
            RecordKind::Element => ELEMENT_ROOT,
        };
        if root != expected {
            return Err(CodecError::KindMismatch { expected: kind, found: root.into() });
        }

        let record = match kind {
            RecordKind::ElementType => {
                let doc: TypeDocument = quick_xml::de::from_str(text)?;
                let mut t = ElementType::new(String::new(), doc.name);
                t.description = doc.description;
                Record::ElementType(t)
            },
            RecordKind::Element => {
                let doc: ElementDocument = quick_xml::de::from_str(text)?;
                Record::Element(Element {
                    id: None,
                    name: doc.name,
                    value: doc.value,
                    children: doc.children.into(),
                })
            },
        };
        Ok(record)
    }
}

fn root_tag(text: &str) -> Result<String, CodecError> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            },
            Ok(Event::Eof) => {
                return Err(CodecError::Malformed { message: "document has no root tag".into() });
            },
            Ok(_) => {},
            Err(e) => return Err(CodecError::Malformed { message: e.to_string().into() }),
        }
    }
}
