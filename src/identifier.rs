//! Content identifiers for metadata records.
//!
//! An identifier is the SHA-256 digest of the record type tag and the
//! canonical payload bytes, truncated to 16 bytes (32 hex chars). Hex digits
//! are filesystem-safe, and the record type takes part in the digest so two
//! families never share an identifier even for equal payload bytes.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::InputError;

/// Length of the hex digest
pub const DIGEST_HEX_LEN: usize = 32;

/// Metadata family tag (`AudioMD`, `VideoMD`, `NISOIMG`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordType(String);

impl RecordType {
    pub const AUDIO_MD: &'static str = "AudioMD";
    pub const VIDEO_MD: &'static str = "VideoMD";
    pub const NISO_IMG: &'static str = "NISOIMG";

    /// Validate a record type tag
    pub fn new(tag: impl Into<String>) -> Result<Self, InputError> {
        let tag = tag.into();
        let valid = !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(InputError::InvalidRecordType(tag));
        }
        Ok(Self(tag))
    }

    pub fn audio_md() -> Self {
        Self(Self::AUDIO_MD.to_string())
    }

    pub fn video_md() -> Self {
        Self(Self::VIDEO_MD.to_string())
    }

    pub fn niso_img() -> Self {
        Self(Self::NISO_IMG.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// METS `mdWrap` attributes for records of this type
    pub fn md_wrap(&self) -> MdWrap {
        match self.0.as_str() {
            Self::AUDIO_MD | Self::VIDEO_MD => MdWrap {
                mdtype: "OTHER",
                other_mdtype: Some(self.0.clone()),
                version: Some("2.0"),
            },
            Self::NISO_IMG => MdWrap {
                mdtype: "NISOIMG",
                other_mdtype: None,
                version: Some("2.0"),
            },
            other => MdWrap {
                mdtype: "OTHER",
                other_mdtype: Some(other.to_string()),
                version: None,
            },
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// `MDTYPE` / `OTHERMDTYPE` / `MDTYPEVERSION` of a METS `mdWrap`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdWrap {
    pub mdtype: &'static str,
    pub other_mdtype: Option<String>,
    pub version: Option<&'static str>,
}

/// Identifier of one unique metadata record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentIdentifier {
    digest: String,
    record_type: RecordType,
}

impl ContentIdentifier {
    /// Derive the identifier of canonical payload bytes
    pub fn compute(record_type: &RecordType, canonical: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(record_type.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical);
        let result = hasher.finalize();

        Self {
            digest: hex::encode(&result[..DIGEST_HEX_LEN / 2]),
            record_type: record_type.clone(),
        }
    }

    /// Rebuild an identifier from a stored digest
    pub fn from_digest(digest: &str, record_type: RecordType) -> Result<Self, InputError> {
        let valid = digest.len() == DIGEST_HEX_LEN
            && digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            return Err(InputError::InvalidIdentifier(digest.to_string()));
        }

        Ok(Self {
            digest: digest.to_string(),
            record_type,
        })
    }

    /// Rebuild an identifier from a METS ID (`_<digest>`)
    pub fn from_xml_id(id: &str, record_type: RecordType) -> Result<Self, InputError> {
        let digest = id
            .strip_prefix('_')
            .ok_or_else(|| InputError::InvalidIdentifier(id.to_string()))?;
        Self::from_digest(digest, record_type)
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// METS ID of the techMD section; XML IDs may not start with a digit
    pub fn xml_id(&self) -> String {
        format!("_{}", self.digest)
    }

    /// Basename of the record file in a workspace
    pub fn file_name(&self) -> String {
        format!("{}-{}-techmd.xml", self.digest, self.record_type)
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digest)
    }
}
