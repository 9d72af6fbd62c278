//! Commit orchestration.
//!
//! A commit runs in three phases:
//! 1. load the workspace reference index
//! 2. canonicalize and identify every record, then write the ones the
//!    workspace does not have yet and merge their references
//! 3. save the index
//!
//! Every payload is canonicalized before anything touches the disk, and the
//! index is only rewritten after all records succeeded, so a failed commit
//! never leaves a partially updated index.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::{InputError, StoreError};
use crate::identifier::ContentIdentifier;
use crate::xml::canonical::check_xml_chars;
use crate::xml::{CanonicalSerializer, NamespaceTable};

use super::envelope;
use super::index::{ReferenceEntry, ReferenceIndex, ReferenceKey, Upsert};
use super::record::{MetadataRecord, StreamRecord};
use super::workspace::Workspace;

/// What happened to one record during a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// A new record file was written
    Written,

    /// The workspace already had an identical record
    Deduplicated,
}

/// Outcome of one record in a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub key: ReferenceKey,
    pub identifier: ContentIdentifier,
    pub status: RecordStatus,
}

/// Summary of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub file: String,
    pub outcomes: Vec<RecordOutcome>,
}

impl CommitReport {
    pub fn written(&self) -> usize {
        self.count(RecordStatus::Written)
    }

    pub fn deduplicated(&self) -> usize {
        self.count(RecordStatus::Deduplicated)
    }

    fn count(&self, status: RecordStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Consistency report of a workspace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of index entries
    pub entries: usize,

    /// Entries whose record file does not exist
    pub missing: Vec<ReferenceEntry>,

    /// Record files no entry refers to
    pub orphans: Vec<String>,
}

impl VerifyReport {
    /// Orphans are harmless; only missing records make a workspace unusable
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty()
    }
}

struct Prepared {
    key: ReferenceKey,
    identifier: ContentIdentifier,
    canonical: Vec<u8>,
}

/// Content-addressed store for technical metadata records
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    serializer: CanonicalSerializer,
}

impl MetadataStore {
    pub fn new(serializer: CanonicalSerializer) -> Self {
        Self { serializer }
    }

    pub fn with_namespaces(namespaces: NamespaceTable) -> Self {
        Self::new(CanonicalSerializer::new(namespaces))
    }

    pub fn serializer(&self) -> &CanonicalSerializer {
        &self.serializer
    }

    /// Canonical bytes and identifier of a record
    pub fn identify(
        &self,
        record: &MetadataRecord,
    ) -> Result<(ContentIdentifier, Vec<u8>), InputError> {
        let canonical = self.serializer.serialize(record.payload())?;
        let identifier = ContentIdentifier::compute(record.record_type(), &canonical);
        Ok((identifier, canonical))
    }

    /// Store the records of one file and reference them from the index.
    ///
    /// Records already present in the workspace are not rewritten. Calling
    /// this twice with the same arguments leaves the workspace unchanged.
    /// Not safe against concurrent commits into the same workspace; see
    /// [`super::WorkspaceLock`].
    #[instrument(skip(self, workspace, records), fields(workspace = %workspace.root().display(), records = records.len()))]
    pub async fn commit(
        &self,
        workspace: &Workspace,
        file_identifier: &str,
        records: &[StreamRecord],
    ) -> Result<CommitReport, StoreError> {
        self.commit_at(workspace, file_identifier, records, Utc::now())
            .await
    }

    /// [`Self::commit`] with an explicit creation time for new record files
    pub async fn commit_at(
        &self,
        workspace: &Workspace,
        file_identifier: &str,
        records: &[StreamRecord],
        created: DateTime<Utc>,
    ) -> Result<CommitReport, StoreError> {
        if file_identifier.trim().is_empty() {
            return Err(InputError::MissingFileIdentifier.into());
        }
        check_xml_chars("file identifier", file_identifier)?;

        // Phase 1: load
        let mut index = ReferenceIndex::load(workspace).await?;

        // Phase 2: canonicalize everything, then write and merge
        let prepared = records
            .iter()
            .map(|r| self.prepare(file_identifier, r))
            .collect::<Result<Vec<_>, InputError>>()?;

        workspace.ensure_dir().await?;

        let mut outcomes = Vec::with_capacity(prepared.len());
        for Prepared {
            key,
            identifier,
            canonical,
        } in prepared
        {
            let status = if workspace.has_record(&identifier).await? {
                debug!(%key, id = %identifier, "Record already in workspace");
                RecordStatus::Deduplicated
            } else {
                let path = workspace.record_path(&identifier);
                workspace
                    .write_atomic(&path, envelope::render(&identifier, created, &canonical))
                    .await?;
                info!(%key, id = %identifier, record_type = %identifier.record_type(), "Record written");
                RecordStatus::Written
            };

            let entry = ReferenceEntry {
                key: key.clone(),
                identifier: identifier.clone(),
            };
            if let Upsert::Replaced { previous } = index.upsert(entry) {
                warn!(%key, previous = %previous, current = %identifier, "Reference replaced");
            }

            outcomes.push(RecordOutcome {
                key,
                identifier,
                status,
            });
        }

        // Phase 3: save
        index.save(workspace).await?;

        let report = CommitReport {
            file: file_identifier.to_string(),
            outcomes,
        };
        info!(
            file = file_identifier,
            written = report.written(),
            deduplicated = report.deduplicated(),
            "Commit complete"
        );

        Ok(report)
    }

    fn prepare(&self, file: &str, record: &StreamRecord) -> Result<Prepared, InputError> {
        if let Some(stream) = &record.stream {
            if stream.trim().is_empty() {
                return Err(InputError::EmptyStreamIndex(file.to_string()));
            }
            check_xml_chars("stream index", stream)?;
        }

        let (identifier, canonical) = self.identify(&record.record)?;
        Ok(Prepared {
            key: ReferenceKey::new(file, record.stream.clone()),
            identifier,
            canonical,
        })
    }
}

/// Check that every index entry has its record file
pub async fn verify(workspace: &Workspace) -> Result<VerifyReport, StoreError> {
    let index = ReferenceIndex::load(workspace).await?;

    let mut missing = Vec::new();
    for entry in index.iter() {
        if !workspace.has_record(&entry.identifier).await? {
            missing.push(entry.clone());
        }
    }

    let referenced: std::collections::HashSet<String> =
        index.iter().map(|e| e.identifier.file_name()).collect();
    let orphans = if workspace.root().is_dir() {
        workspace
            .list_records()?
            .into_iter()
            .filter(|name| !referenced.contains(name))
            .collect()
    } else {
        Vec::new()
    };

    Ok(VerifyReport {
        entries: index.len(),
        missing,
        orphans,
    })
}
