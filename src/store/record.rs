//! Metadata records handed to the store.

use crate::identifier::RecordType;
use crate::xml::Element;

/// One techMD payload of a known family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    record_type: RecordType,
    payload: Element,
}

impl MetadataRecord {
    pub fn new(record_type: RecordType, payload: Element) -> Self {
        Self {
            record_type,
            payload,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn payload(&self) -> &Element {
        &self.payload
    }
}

/// A record together with the stream it describes (`None` = whole file)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub stream: Option<String>,
    pub record: MetadataRecord,
}

impl StreamRecord {
    pub fn whole_file(record: MetadataRecord) -> Self {
        Self {
            stream: None,
            record,
        }
    }

    pub fn stream(stream: impl Into<String>, record: MetadataRecord) -> Self {
        Self {
            stream: Some(stream.into()),
            record,
        }
    }
}
