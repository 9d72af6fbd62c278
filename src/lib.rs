//! techmd - content-addressed technical metadata for METS packages
//!
//! Records audioMD, videoMD and MIX metadata of digital objects into a
//! workspace, storing every distinct record once and keeping a single
//! reference index of which file or stream each record describes.
//!
//! # Architecture
//!
//! - Payloads are serialized canonically (fixed prefixes, sorted
//!   attributes, normalized whitespace) so equal content gives equal bytes
//! - A record's identifier is a digest of its type and canonical bytes
//! - A commit loads the reference index, writes records the workspace does
//!   not have yet, merges the references and saves the index once
//!
//! # Modules
//!
//! - `xml`: Element tree, namespace table, canonical serializer, fragment reader
//! - `identifier`: Record types and content identifiers
//! - `store`: Workspace, reference index, lock and commit orchestration
//! - `family`: audioMD, videoMD and MIX payload builders from probe output
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Record a WAV file described by ffprobe output
//! ffprobe -show_streams -print_format json a.wav > a.json
//! techmd audio a.wav --probe a.json --workspace ./workspace
//!
//! # Inspect the workspace
//! techmd references --workspace ./workspace
//! techmd verify --workspace ./workspace
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod family;
pub mod identifier;
pub mod store;
pub mod xml;

// Re-export main types at crate root for convenience
pub use error::{InputError, StorageError, StoreError};
pub use identifier::{ContentIdentifier, RecordType};
pub use store::{
    CommitReport, MetadataRecord, MetadataStore, ReferenceIndex, StreamRecord, Workspace,
    WorkspaceLock,
};
pub use xml::{CanonicalSerializer, Element, NamespaceTable};
