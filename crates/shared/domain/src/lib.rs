//! # Domain Models
//!
//! This crate contains the pure metastore types with a single dependency (`serde`).
//! Keep it lean: no I/O, no filesystem access, no codecs. Just records, descriptors and
//! the configuration shapes shared by the engine and the applications.

pub mod config;
pub mod record;

pub use record::{Attribute, Describable, Element, ElementType, Record, RecordKind};
