//! Canonical serialization of metadata fragments.
//!
//! Two independently built trees carrying the same information serialize to
//! the same bytes:
//! - attributes are written sorted by (prefix, local name), plain attributes
//!   first, never in construction order
//! - every namespace in the fragment is declared once on its root element,
//!   sorted by prefix, using the prefix from the [`NamespaceTable`]
//! - text is trimmed and inner whitespace runs collapse to a single space
//! - no indentation is emitted; childless, textless elements are self-closed
//!
//! Child order is significant and kept as given.

use std::collections::BTreeMap;

use crate::error::InputError;

use super::element::Element;
use super::namespaces::{NamespaceTable, XML_NS};

/// Deterministic serializer bound to one namespace table
#[derive(Debug, Clone, Default)]
pub struct CanonicalSerializer {
    namespaces: NamespaceTable,
}

impl CanonicalSerializer {
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self { namespaces }
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Serialize a fragment to its canonical bytes
    pub fn serialize(&self, root: &Element) -> Result<Vec<u8>, InputError> {
        self.serialize_to_string(root).map(String::into_bytes)
    }

    /// Serialize a fragment to a canonical string
    pub fn serialize_to_string(&self, root: &Element) -> Result<String, InputError> {
        let mut declared = BTreeMap::new();
        self.collect_namespaces(root, &mut declared)?;

        let mut out = String::new();
        self.write_element(root, Some(&declared), &mut out)?;
        Ok(out)
    }

    fn prefix_for(&self, uri: &str, element: &str) -> Result<&str, InputError> {
        self.namespaces
            .prefix(uri)
            .ok_or_else(|| InputError::UnregisteredNamespace {
                uri: uri.to_string(),
                element: element.to_string(),
            })
    }

    fn collect_namespaces(
        &self,
        element: &Element,
        declared: &mut BTreeMap<String, String>,
    ) -> Result<(), InputError> {
        let uris = element
            .namespace
            .iter()
            .chain(element.attributes.iter().filter_map(|a| a.namespace.as_ref()));

        for uri in uris {
            let prefix = self.prefix_for(uri, &element.name)?;
            if uri != XML_NS {
                declared.insert(prefix.to_string(), uri.clone());
            }
        }

        for child in &element.children {
            self.collect_namespaces(child, declared)?;
        }

        Ok(())
    }

    fn qualified_name(
        &self,
        namespace: Option<&str>,
        name: &str,
        element: &str,
    ) -> Result<String, InputError> {
        if !is_xml_name(name) {
            return Err(InputError::InvalidName(name.to_string()));
        }

        match namespace {
            Some(uri) => Ok(format!("{}:{}", self.prefix_for(uri, element)?, name)),
            None => Ok(name.to_string()),
        }
    }

    fn write_element(
        &self,
        element: &Element,
        declarations: Option<&BTreeMap<String, String>>,
        out: &mut String,
    ) -> Result<(), InputError> {
        let tag = self.qualified_name(element.namespace.as_deref(), &element.name, &element.name)?;

        out.push('<');
        out.push_str(&tag);

        if let Some(declarations) = declarations {
            for (prefix, uri) in declarations {
                out.push_str(" xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
                escape_attr_into(uri, out);
                out.push('"');
            }
        }

        let mut attributes = Vec::with_capacity(element.attributes.len());
        for attr in &element.attributes {
            let prefix = match &attr.namespace {
                Some(uri) => Some(self.prefix_for(uri, &element.name)?),
                None => None,
            };
            let qname = self.qualified_name(attr.namespace.as_deref(), &attr.name, &element.name)?;
            if !attr.value.chars().all(is_xml_char) {
                check_xml_chars(&format!("attribute {} of <{}>", qname, tag), &attr.value)?;
            }
            attributes.push(((prefix, attr.name.as_str()), qname, attr.value.as_str()));
        }
        attributes.sort_by(|a, b| a.0.cmp(&b.0));

        for pair in attributes.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(InputError::DuplicateAttribute {
                    element: element.name.clone(),
                    name: pair[1].1.clone(),
                });
            }
        }

        for (_, qname, value) in &attributes {
            out.push(' ');
            out.push_str(qname);
            out.push_str("=\"");
            escape_attr_into(value, out);
            out.push('"');
        }

        let text = element.text.as_deref().map(normalize_text).unwrap_or_default();
        if !text.chars().all(is_xml_char) {
            check_xml_chars(&format!("text of <{}>", tag), &text)?;
        }

        if text.is_empty() && element.children.is_empty() {
            out.push_str("/>");
            return Ok(());
        }

        out.push('>');
        escape_text_into(&text, out);
        for child in &element.children {
            self.write_element(child, None, out)?;
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');

        Ok(())
    }
}

/// Collapse whitespace runs and trim
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `c` is allowed in an XML 1.0 document
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Reject values that would make the output ill-formed
pub(crate) fn check_xml_chars(field: &str, value: &str) -> Result<(), InputError> {
    if value.chars().all(is_xml_char) {
        return Ok(());
    }
    Err(InputError::IllegalCharacter {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Whether `name` is usable as an unprefixed XML name
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub(crate) fn escape_attr_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
}

pub(crate) fn escape_text_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_attr_into(value, &mut out);
    out
}

pub(crate) fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_text_into(value, &mut out);
    out
}
