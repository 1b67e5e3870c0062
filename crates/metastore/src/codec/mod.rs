//! Document encodings.
//!
//! A codec turns a single [`Record`] into bytes and back. It never decides identity: ids are
//! derived by the engine from folder and file names, so `decode` always yields records with
//! `id == None`.

mod json;
mod xml;

pub use json::JsonCodec;
pub use xml::XmlCodec;

use mstore_domain::config::CodecKind;
use mstore_domain::{Record, RecordKind};
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("XML parse error: {source}")]
    XmlRead { source: quick_xml::DeError },

    #[error("XML write error: {source}")]
    XmlWrite { source: quick_xml::SeError },

    #[error("JSON error: {source}")]
    Json { source: serde_json::Error },

    #[error("Document is not valid UTF-8: {source}")]
    Utf8 { source: std::str::Utf8Error },

    #[error("Malformed document: {message}")]
    Malformed { message: Cow<'static, str> },

    #[error("Expected {expected} document, found {found}")]
    KindMismatch { expected: RecordKind, found: Cow<'static, str> },
}

impl From<quick_xml::DeError> for CodecError {
    fn from(source: quick_xml::DeError) -> Self {
        Self::XmlRead { source }
    }
}

impl From<quick_xml::SeError> for CodecError {
    fn from(source: quick_xml::SeError) -> Self {
        Self::XmlWrite { source }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

impl From<std::str::Utf8Error> for CodecError {
    fn from(source: std::str::Utf8Error) -> Self {
        Self::Utf8 { source }
    }
}

/// Serializes and parses single store documents.
pub trait RecordCodec: Debug + Send + Sync + 'static {
    /// File extension of element documents, without the dot.
    fn extension(&self) -> &'static str;

    /// Reserved file name of the element-type document inside a type folder.
    fn type_file_name(&self) -> String {
        format!(".type.{}", self.extension())
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError>;

    /// Parses a document that must be of the given kind.
    fn decode(&self, kind: RecordKind, bytes: &[u8]) -> Result<Record, CodecError>;
}

/// Shared codec instance for a configured encoding.
#[must_use]
pub fn codec_for(kind: CodecKind) -> Arc<dyn RecordCodec> {
    match kind {
        CodecKind::Xml => Arc::new(XmlCodec),
        CodecKind::Json => Arc::new(JsonCodec),
    }
}
