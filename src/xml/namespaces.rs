//! Namespace URI to prefix mapping.
//!
//! The table is a plain immutable value handed to the serializer. Changing a
//! prefix changes the canonical bytes of every record using that namespace,
//! and therefore its identifier, so built-in prefixes are fixed.

use std::collections::BTreeMap;

use crate::error::InputError;

pub const METS_NS: &str = "http://www.loc.gov/METS/";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const PREMIS_NS: &str = "info:lc/xmlns/premis-v2";
pub const AUDIOMD_NS: &str = "http://www.loc.gov/audioMD/";
pub const VIDEOMD_NS: &str = "http://www.loc.gov/videoMD/";
pub const MIX_NS: &str = "http://www.loc.gov/mix/v20";
pub const ADDML_NS: &str = "http://www.arkivverket.no/standarder/addml";
pub const TEXTMD_NS: &str = "info:lc/xmlns/textMD-v3";

const BUILTIN: &[(&str, &str)] = &[
    ("mets", METS_NS),
    ("xlink", XLINK_NS),
    ("xsi", XSI_NS),
    ("xml", XML_NS),
    ("premis", PREMIS_NS),
    ("amd", AUDIOMD_NS),
    ("vmd", VIDEOMD_NS),
    ("mix", MIX_NS),
    ("addml", ADDML_NS),
    ("textmd", TEXTMD_NS),
];

/// Immutable URI -> prefix mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    by_uri: BTreeMap<String, String>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NamespaceTable {
    /// An empty table
    pub fn empty() -> Self {
        Self {
            by_uri: BTreeMap::new(),
        }
    }

    /// The prefixes used by METS packages and the supported metadata families
    pub fn builtin() -> Self {
        Self {
            by_uri: BUILTIN
                .iter()
                .map(|(prefix, uri)| (uri.to_string(), prefix.to_string()))
                .collect(),
        }
    }

    /// Return a copy of the table with one more binding.
    ///
    /// Rebinding a URI to the prefix it already has is a no-op; binding a
    /// prefix or URI that is already taken is rejected.
    pub fn with(mut self, prefix: &str, uri: &str) -> Result<Self, InputError> {
        if !super::canonical::is_xml_name(prefix) || prefix.eq_ignore_ascii_case("xmlns") {
            return Err(InputError::InvalidName(prefix.to_string()));
        }

        if let Some(existing) = self.by_uri.get(uri) {
            if existing == prefix {
                return Ok(self);
            }
            return Err(InputError::DuplicateNamespace {
                uri: uri.to_string(),
                existing: existing.clone(),
                prefix: prefix.to_string(),
            });
        }

        if let Some(existing) = self.uri(prefix) {
            return Err(InputError::NamespaceConflict {
                prefix: prefix.to_string(),
                existing: existing.to_string(),
                uri: uri.to_string(),
            });
        }

        self.by_uri.insert(uri.to_string(), prefix.to_string());
        Ok(self)
    }

    /// Prefix registered for a namespace URI
    pub fn prefix(&self, uri: &str) -> Option<&str> {
        self.by_uri.get(uri).map(String::as_str)
    }

    /// Namespace URI bound to a prefix
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.by_uri
            .iter()
            .find(|(_, p)| p.as_str() == prefix)
            .map(|(uri, _)| uri.as_str())
    }

    /// Iterate (prefix, uri) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_uri.iter().map(|(uri, prefix)| (prefix.as_str(), uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }
}
