//! The workspace reference index (`techmd-references.xml`).
//!
//! Maps every (file, stream) pair to the identifier of the record that
//! describes it. The index is loaded, merged and rewritten as a whole on
//! every commit; entries are never dropped by a merge.
//!
//! Entries are kept in first-insertion order. Replacing the value of an
//! existing key keeps its position, so the file only changes where the
//! content changes.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <techmdReferences>
//!   <techmdReference file="a.wav" stream="1" type="AudioMD">_0123...</techmdReference>
//! </techmdReferences>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::fs;
use tracing::debug;

use crate::error::StorageError;
use crate::identifier::{ContentIdentifier, RecordType};
use crate::xml::canonical::{escape_attr, escape_text};

use super::workspace::Workspace;

const ROOT_TAG: &str = "techmdReferences";
const ENTRY_TAG: &str = "techmdReference";

/// Key of an index entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey {
    /// Source object path as the caller records it
    pub file: String,

    /// Stream index within the file, `None` for the whole file
    pub stream: Option<String>,
}

impl ReferenceKey {
    pub fn new(file: impl Into<String>, stream: Option<String>) -> Self {
        Self {
            file: file.into(),
            stream,
        }
    }

    pub fn whole_file(file: impl Into<String>) -> Self {
        Self::new(file, None)
    }

    pub fn stream(file: impl Into<String>, stream: impl Into<String>) -> Self {
        Self::new(file, Some(stream.into()))
    }
}

impl std::fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.stream {
            Some(stream) => write!(f, "{}#{}", self.file, stream),
            None => write!(f, "{}", self.file),
        }
    }
}

/// One (file, stream) -> record mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub key: ReferenceKey,
    pub identifier: ContentIdentifier,
}

/// Result of [`ReferenceIndex::upsert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// New key
    Inserted,

    /// Key existed with a different identifier
    Replaced { previous: ContentIdentifier },

    /// Key existed with the same identifier
    Unchanged,
}

/// Ordered, key-unique collection of reference entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the workspace index; a workspace without one yields an empty index.
    ///
    /// A file that exists but cannot be parsed is reported as
    /// [`StorageError::CorruptIndex`] and left as it is.
    pub async fn load(workspace: &Workspace) -> Result<Self, StorageError> {
        let path = workspace.references_path();

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No reference index yet");
                return Ok(Self::new());
            }
            Err(e) => return Err(StorageError::io("read reference index", path, e)),
        };

        let text = String::from_utf8(content).map_err(|e| StorageError::CorruptIndex {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Self::parse(&text).map_err(|reason| StorageError::CorruptIndex { path, reason })
    }

    /// Parse the on-disk representation
    pub fn parse(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut index = Self::new();
        let mut in_root = false;
        let mut root_closed = false;
        let mut pending: Option<(ReferenceKey, RecordType, String)> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                format!("XML error at byte {}: {}", reader.buffer_position(), e)
            })?;

            match event {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Start(start) if !in_root && !root_closed => {
                    expect_name(&start, ROOT_TAG)?;
                    in_root = true;
                }
                Event::Empty(start) if !in_root && !root_closed => {
                    expect_name(&start, ROOT_TAG)?;
                    root_closed = true;
                }
                Event::Start(start) if in_root && pending.is_none() => {
                    expect_name(&start, ENTRY_TAG)?;
                    let (key, record_type) = entry_attributes(&start)?;
                    pending = Some((key, record_type, String::new()));
                }
                Event::Text(text) if pending.is_some() => {
                    let text = text.unescape().map_err(|e| e.to_string())?;
                    if let Some((_, _, id)) = pending.as_mut() {
                        id.push_str(&text);
                    }
                }
                Event::End(_) if pending.is_some() => {
                    if let Some((key, record_type, id)) = pending.take() {
                        let identifier = ContentIdentifier::from_xml_id(id.trim(), record_type)
                            .map_err(|e| format!("entry for '{}': {}", key, e))?;
                        if index.get(&key.file, key.stream.as_deref()).is_some() {
                            return Err(format!("duplicate entry for '{}'", key));
                        }
                        index.entries.push(ReferenceEntry { key, identifier });
                    }
                }
                Event::End(_) if in_root => {
                    in_root = false;
                    root_closed = true;
                }
                Event::Eof => break,
                other => return Err(format!("unexpected content: {:?}", other)),
            }
        }

        if !root_closed {
            return Err(format!("missing or unterminated <{}> element", ROOT_TAG));
        }

        Ok(index)
    }

    /// Insert or replace the entry for `entry.key`
    pub fn upsert(&mut self, entry: ReferenceEntry) -> Upsert {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == entry.key) {
            if existing.identifier == entry.identifier {
                return Upsert::Unchanged;
            }
            let previous = std::mem::replace(&mut existing.identifier, entry.identifier);
            Upsert::Replaced { previous }
        } else {
            self.entries.push(entry);
            Upsert::Inserted
        }
    }

    /// Entry for a file/stream key
    pub fn get(&self, file: &str, stream: Option<&str>) -> Option<&ReferenceEntry> {
        self.entries
            .iter()
            .find(|e| e.key.file == file && e.key.stream.as_deref() == stream)
    }

    /// All entries of one file, whole-file and per-stream
    pub fn entries_for_file(&self, file: &str) -> Vec<&ReferenceEntry> {
        self.entries.iter().filter(|e| e.key.file == file).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize in entry order
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        if self.entries.is_empty() {
            out.push_str(&format!("<{}/>\n", ROOT_TAG));
            return out;
        }

        out.push_str(&format!("<{}>\n", ROOT_TAG));
        for entry in &self.entries {
            out.push_str(&format!("  <{} file=\"{}\"", ENTRY_TAG, escape_attr(&entry.key.file)));
            if let Some(stream) = &entry.key.stream {
                out.push_str(&format!(" stream=\"{}\"", escape_attr(stream)));
            }
            out.push_str(&format!(
                " type=\"{}\">{}</{}>\n",
                escape_attr(entry.identifier.record_type().as_str()),
                escape_text(&entry.identifier.xml_id()),
                ENTRY_TAG
            ));
        }
        out.push_str(&format!("</{}>\n", ROOT_TAG));

        out
    }

    /// Atomically replace the workspace index with this one
    pub async fn save(&self, workspace: &Workspace) -> Result<(), StorageError> {
        let path = workspace.references_path();
        workspace.write_atomic(&path, self.to_xml().into_bytes()).await?;
        debug!(path = %path.display(), entries = self.entries.len(), "Reference index saved");
        Ok(())
    }
}

fn expect_name(start: &BytesStart<'_>, expected: &str) -> Result<(), String> {
    let name = start.name();
    if name.as_ref() != expected.as_bytes() {
        return Err(format!(
            "expected <{}>, found <{}>",
            expected,
            String::from_utf8_lossy(name.as_ref())
        ));
    }
    Ok(())
}

fn entry_attributes(start: &BytesStart<'_>) -> Result<(ReferenceKey, RecordType), String> {
    let mut file = None;
    let mut stream = None;
    let mut record_type = None;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        match attr.key.as_ref() {
            b"file" => file = Some(value),
            b"stream" => stream = Some(value),
            b"type" => record_type = Some(value),
            other => {
                return Err(format!(
                    "unknown attribute '{}' on <{}>",
                    String::from_utf8_lossy(other),
                    ENTRY_TAG
                ))
            }
        }
    }

    let file = file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| format!("<{}> without file attribute", ENTRY_TAG))?;
    let record_type = record_type
        .ok_or_else(|| format!("<{}> for '{}' without type attribute", ENTRY_TAG, file))?;
    let record_type = RecordType::new(record_type).map_err(|e| e.to_string())?;

    Ok((ReferenceKey::new(file, stream), record_type))
}
