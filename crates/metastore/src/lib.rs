//! A hierarchical metadata store persisted as one document per record.
//!
//! Records live in a directory tree on any [`mstore_vfs::FileSystem`]:
//!
//! ```text
//! <meta>/<namespace>/<element type>/.type.xml
//! <meta>/<namespace>/<element type>/<element id>.xml
//! ```
//!
//! # Components
//!
//! - **[`PathConvention`]**: validated, injective mapping from names to document paths.
//! - **[`CacheIndex`]**: advisory name-to-id associations and processed-file timestamps. It can
//!   be discarded at any time; the filesystem stays the source of truth.
//! - **[`StoreLock`]**: bounded-wait advisory lock shared by tasks and processes using the same
//!   store root.
//! - **[`RecordCodec`]**: XML (default) or JSON document encoding.
//! - **[`MetaStore`]**: the engine tying the above together.
//!
//! # Identity
//!
//! Ids are file-backed. An element type's id is its folder name and an element's id is its file
//! stem; both must equal the record's name. Decoded documents never supply an id of their own.

pub mod cache;
pub mod codec;
pub mod config;
mod engine;
mod error;
pub mod lock;
pub mod path;

pub use cache::{CacheIndex, CacheStats};
pub use codec::{CodecError, JsonCodec, RecordCodec, XmlCodec, codec_for};
pub use engine::{MetaStore, MetaStoreBuilder, NoFs, WithFs};
pub use error::{MetaStoreError, MetaStoreErrorExt, Result};
pub use lock::{LockGuard, StoreLock};
pub use path::PathConvention;

pub use mstore_domain as domain;
pub use mstore_vfs as vfs;
