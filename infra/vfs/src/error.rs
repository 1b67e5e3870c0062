use std::borrow::Cow;

/// A specialized [`VfsError`] enum of this crate.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Path traversal security violation{}: {message}", format_context(.context))]
    PathTraversal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

impl VfsError {
    pub(crate) fn not_found(path: &std::path::Path) -> Self {
        Self::NotFound { message: path.display().to_string().into(), context: None }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for VfsError {
    #[inline]
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

/// Adds `.context(...)` to results carrying a [`VfsError`] or a raw [`std::io::Error`].
pub trait VfsErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, VfsError>;
}

impl<T> VfsErrorExt<T> for Result<T, VfsError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                VfsError::NotFound { context: c, .. }
                | VfsError::PathTraversal { context: c, .. }
                | VfsError::Io { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> VfsErrorExt<T> for Result<T, std::io::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, VfsError> {
        self.map_err(|source| VfsError::Io { source, context: Some(context.into()) })
    }
}

#[allow(clippy::ref_option)]
fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
