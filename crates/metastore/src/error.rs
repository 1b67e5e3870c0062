use crate::codec::CodecError;
use mstore_domain::{Element, ElementType};
use mstore_vfs::VfsError;
use std::borrow::Cow;
use std::time::Duration;

pub type Result<T, E = MetaStoreError> = std::result::Result<T, E>;

/// Every failure a store operation can report.
///
/// Filesystem failures are always wrapped in [`MetaStoreError::Storage`]; codec failures in
/// [`MetaStoreError::Decode`] (reading) or [`MetaStoreError::Encode`] (writing).
#[derive(Debug, thiserror::Error)]
pub enum MetaStoreError {
    #[error("Invalid name{}: {message}", format_context(.context))]
    InvalidName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Namespace already exists{}: {namespace}", format_context(.context))]
    NamespaceExists { namespace: String, context: Option<Cow<'static, str>> },

    #[error("Element type already exists{}: {id}", format_context(.context))]
    ElementTypeExists {
        id: String,
        existing: Vec<ElementType>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Element already exists{}: {id}", format_context(.context))]
    ElementExists { id: String, existing: Vec<Element>, context: Option<Cow<'static, str>> },

    #[error("Dependencies exist{}: {message} [{}]", format_context(.context), .dependencies.join(", "))]
    DependencyExists {
        message: Cow<'static, str>,
        dependencies: Vec<String>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Foreign element type{}: {message}", format_context(.context))]
    ForeignElementType { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Store lock not acquired after {waited:?}{}", format_context(.context))]
    LockTimeout { waited: Duration, context: Option<Cow<'static, str>> },

    #[error("Storage failure{}: {source}", format_context(.context))]
    Storage { source: VfsError, context: Option<Cow<'static, str>> },

    #[error("Decode failure{}: {source}", format_context(.context))]
    Decode { source: CodecError, context: Option<Cow<'static, str>> },

    #[error("Encode failure{}: {source}", format_context(.context))]
    Encode { source: CodecError, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: Box<config::ConfigError>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl MetaStoreError {
    pub(crate) fn invalid_name(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidName { message: message.into(), context: None }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub(crate) fn dependencies(
        message: impl Into<Cow<'static, str>>,
        dependencies: Vec<String>,
    ) -> Self {
        Self::DependencyExists { message: message.into(), dependencies, context: None }
    }

    pub(crate) fn storage_refused(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Storage {
            source: VfsError::Io {
                source: std::io::Error::other("operation refused by the filesystem"),
                context: None,
            },
            context: Some(message.into()),
        }
    }

    /// Ids blocking a deletion, if this is a [`MetaStoreError::DependencyExists`].
    #[must_use]
    pub fn dependency_ids(&self) -> Option<&[String]> {
        match self {
            Self::DependencyExists { dependencies, .. } => Some(dependencies),
            _ => None,
        }
    }

    /// Replaces the context of this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        *self.context_slot() = Some(context.into());
        self
    }

    fn context_slot(&mut self) -> &mut Option<Cow<'static, str>> {
        match self {
            Self::InvalidName { context, .. }
            | Self::NamespaceExists { context, .. }
            | Self::ElementTypeExists { context, .. }
            | Self::ElementExists { context, .. }
            | Self::DependencyExists { context, .. }
            | Self::NotFound { context, .. }
            | Self::ForeignElementType { context, .. }
            | Self::LockTimeout { context, .. }
            | Self::Storage { context, .. }
            | Self::Decode { context, .. }
            | Self::Encode { context, .. }
            | Self::Config { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }
}

impl From<VfsError> for MetaStoreError {
    #[inline]
    fn from(source: VfsError) -> Self {
        Self::Storage { source, context: None }
    }
}

impl From<CodecError> for MetaStoreError {
    #[inline]
    fn from(source: CodecError) -> Self {
        Self::Decode { source, context: None }
    }
}

impl From<config::ConfigError> for MetaStoreError {
    #[inline]
    fn from(source: config::ConfigError) -> Self {
        Self::Config { source: Box::new(source), context: None }
    }
}

/// Adds `.context(...)` to results carrying a [`MetaStoreError`] or one of the errors it wraps.
pub trait MetaStoreErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T> MetaStoreErrorExt<T> for Result<T> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> MetaStoreErrorExt<T> for Result<T, VfsError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| MetaStoreError::Storage { source, context: Some(context.into()) })
    }
}

impl<T> MetaStoreErrorExt<T> for Result<T, CodecError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| MetaStoreError::Decode { source, context: Some(context.into()) })
    }
}

impl<T> MetaStoreErrorExt<T> for Result<T, config::ConfigError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| MetaStoreError::Config {
            source: Box::new(source),
            context: Some(context.into()),
        })
    }
}

#[allow(clippy::ref_option)]
fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
