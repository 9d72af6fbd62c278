//! Content-addressed technical metadata store.
//!
//! # Storage Layout
//!
//! ```text
//! <workspace>/
//! ├── techmd-references.xml                 # (file, stream) -> record identifier
//! └── <digest>-<record_type>-techmd.xml     # one METS techMD per unique record
//! ```
//!
//! Identical records (same type, same canonical payload) are stored once and
//! referenced from every file or stream they describe.

pub mod envelope;
pub mod index;
pub mod lock;
pub mod orchestrator;
pub mod record;
pub mod workspace;

pub use index::{ReferenceEntry, ReferenceIndex, ReferenceKey, Upsert};
pub use lock::{WorkspaceLock, DEFAULT_LOCK_TIMEOUT};
pub use orchestrator::{
    verify, CommitReport, MetadataStore, RecordOutcome, RecordStatus, VerifyReport,
};
pub use record::{MetadataRecord, StreamRecord};
pub use workspace::{Workspace, REFERENCES_FILE};
