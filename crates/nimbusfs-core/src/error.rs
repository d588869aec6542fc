//! Error types for the crate.
//!
//! Each module defines its own error type; this module re-exports them and
//! provides [`FsError`], the composite error surfaced by node operations.
//!
//! Propagation policy: absence (`NotFound`-class results) is consumed inside
//! the attach state machine and never escapes as an error; everything else
//! propagates to the caller unchanged, wrapped with the operation and key,
//! and is never retried by the core.

use std::io;

use thiserror::Error;

pub use crate::backend::BackendError;
pub use crate::name::NameError;

/// Composite error for node-level operations.
#[derive(Error, Debug)]
pub enum FsError {
    /// The address could not be parsed; fatal to this resolution only.
    #[error(transparent)]
    Name(#[from] NameError),

    /// Transport/auth/service failure reported by the backend.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A random-access seek computed a negative position.
    #[error("invalid random-access position {position}")]
    InvalidPosition { position: i64 },

    /// A capability this backend or layer intentionally does not provide.
    #[error("operation '{operation}' is not supported")]
    Unsupported { operation: &'static str },

    /// A folder-only operation was invoked on a confirmed file.
    #[error("'{name}' is not a folder")]
    NotAFolder { name: String },

    /// A content operation was invoked on a confirmed folder.
    #[error("'{name}' is a folder and has no content")]
    NotAFile { name: String },

    /// Local stream failure while pumping content between backend streams.
    #[error("i/o failure during {operation} on '{key}': {source}")]
    Io {
        operation: &'static str,
        key: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub(crate) fn io(operation: &'static str, key: impl Into<String>, source: io::Error) -> Self {
        FsError::Io {
            operation,
            key: key.into(),
            source,
        }
    }
}
