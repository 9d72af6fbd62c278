//! Error types for the metadata store.
//!
//! Two kinds of failure are distinguished so a wrapping tool can report them
//! with different exit statuses:
//! - [`InputError`]: a record or its identifying attributes cannot be used
//! - [`StorageError`]: the workspace cannot be read or written, or its
//!   reference index is corrupt

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Any failure of a store operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    /// Process exit status a CLI should report for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            StoreError::Input(_) => InputError::EXIT_CODE,
            StoreError::Storage(_) => StorageError::EXIT_CODE,
        }
    }
}

/// A record that cannot be canonicalized or identified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("namespace '{uri}' used by <{element}> has no registered prefix")]
    UnregisteredNamespace { uri: String, element: String },

    #[error("namespace prefix '{prefix}' is already bound to '{existing}', cannot bind it to '{uri}'")]
    NamespaceConflict {
        prefix: String,
        existing: String,
        uri: String,
    },

    #[error("namespace '{uri}' already has prefix '{existing}', cannot also bind '{prefix}'")]
    DuplicateNamespace {
        uri: String,
        existing: String,
        prefix: String,
    },

    #[error("invalid XML name: '{0}'")]
    InvalidName(String),

    #[error("duplicate attribute '{name}' on <{element}>")]
    DuplicateAttribute { element: String, name: String },

    #[error("invalid record type '{0}': expected ASCII letters, digits or '_'")]
    InvalidRecordType(String),

    #[error("invalid content identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("file identifier must not be empty")]
    MissingFileIdentifier,

    #[error("stream index for '{0}' must not be empty")]
    EmptyStreamIndex(String),

    #[error("malformed XML fragment: {0}")]
    MalformedFragment(String),

    #[error("{field} {value:?} contains a character not allowed in XML")]
    IllegalCharacter { field: String, value: String },
}

impl InputError {
    pub const EXIT_CODE: u8 = 2;
}

/// A workspace that cannot be used safely
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reference index {} is corrupt: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Timed out after {timeout:?} waiting for workspace lock {}", path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },
}

impl StorageError {
    pub const EXIT_CODE: u8 = 3;

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
