use thiserror::Error;

/// Typed failures that callers need to tell apart from ordinary I/O or parse
/// errors. Everything else travels as `anyhow::Error`; these can be recovered
/// with `err.downcast_ref::<MetadataError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The provider (or every provider of a file) does not carry the field.
    #[error("unsupported metadata field")]
    NotSupported,

    /// The file can be read but not rewritten.
    #[error("file cannot be written: {0}")]
    Unsupported(String),

    /// The file had parse problems when read, so it must not be rewritten.
    #[error("file has problems and cannot be written: {0}")]
    Problems(String),

    /// Face regions can only be removed, never invented from a name.
    #[error("cannot add face region for {0:?}")]
    CannotAddFace(String),
}

/// Returns true if the error is (or wraps) [`MetadataError::NotSupported`].
pub fn is_not_supported(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<MetadataError>(),
        Some(MetadataError::NotSupported)
    )
}

/// Shorthand for the base-provider failure.
pub fn not_supported<T>() -> anyhow::Result<T> {
    Err(MetadataError::NotSupported.into())
}
