//! Read XML fragment files into [`Element`] trees.
//!
//! Used by `techmd commit --payload` for records produced outside the
//! built-in families. Prefixes are resolved to namespace URIs, so the
//! fragment's own prefix choice does not affect its canonical form.
//! Comments, processing instructions and the XML declaration are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::InputError;

use super::element::{Attribute, Element};

/// Parse a single-rooted XML fragment
pub fn parse_fragment(xml: &str) -> Result<Element, InputError> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                ensure_single_root(&root, &stack)?;
                stack.push(element_from(&reader, &start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&root, &stack)?;
                let element = element_from(&reader, &start)?;
                attach(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| InputError::MalformedFragment("unbalanced end tag".to_string()))?;
                attach(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|e| InputError::MalformedFragment(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(InputError::MalformedFragment(
            "unexpected end of document".to_string(),
        ));
    }

    root.ok_or_else(|| InputError::MalformedFragment("no root element".to_string()))
}

fn malformed(err: impl std::fmt::Display) -> InputError {
    InputError::MalformedFragment(err.to_string())
}

fn ensure_single_root(root: &Option<Element>, stack: &[Element]) -> Result<(), InputError> {
    if root.is_some() && stack.is_empty() {
        return Err(InputError::MalformedFragment(
            "more than one root element".to_string(),
        ));
    }
    Ok(())
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [Element], text: &str) -> Result<(), InputError> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let current = stack.last_mut().ok_or_else(|| {
        InputError::MalformedFragment("text outside the root element".to_string())
    })?;

    match &mut current.text {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => current.text = Some(text.to_string()),
    }
    Ok(())
}

fn namespace_of(resolved: ResolveResult<'_>) -> Result<Option<String>, InputError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(InputError::MalformedFragment(format!(
            "undeclared prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn element_from(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, InputError> {
    let (resolved, local) = reader.resolve_element(start.name());
    let namespace = namespace_of(resolved)?;
    let name = String::from_utf8_lossy(local.as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = namespace_of(resolved)?;
        let value = attr.unescape_value().map_err(malformed)?;

        attributes.push(Attribute {
            namespace,
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(Element {
        namespace,
        name,
        attributes,
        children: Vec::new(),
        text: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::canonical::CanonicalSerializer;
    use crate::xml::namespaces::{AUDIOMD_NS, NamespaceTable};

    #[test]
    fn test_parse_resolves_prefixes() {
        let xml = r#"<?xml version="1.0"?>
            <a:AUDIOMD xmlns:a="http://www.loc.gov/audioMD/" ANALOGDIGITALFLAG="FileDigital">
              <!-- probe output -->
              <a:audioInfo>
                <a:numChannels>1</a:numChannels>
              </a:audioInfo>
            </a:AUDIOMD>"#;

        let el = parse_fragment(xml).unwrap();
        assert_eq!(el.namespace.as_deref(), Some(AUDIOMD_NS));
        assert_eq!(el.name, "AUDIOMD");
        assert_eq!(el.attr("ANALOGDIGITALFLAG"), Some("FileDigital"));
        assert_eq!(el.text_at(&["audioInfo", "numChannels"]), Some("1"));
    }

    #[test]
    fn test_prefix_choice_does_not_change_canonical_form() {
        let one = parse_fragment(
            r#"<x:AUDIOMD xmlns:x="http://www.loc.gov/audioMD/"><x:dataRate>768</x:dataRate></x:AUDIOMD>"#,
        )
        .unwrap();
        let two = parse_fragment(
            r#"<AUDIOMD xmlns="http://www.loc.gov/audioMD/">
                 <dataRate> 768 </dataRate>
               </AUDIOMD>"#,
        )
        .unwrap();

        let serializer = CanonicalSerializer::new(NamespaceTable::builtin());
        assert_eq!(
            serializer.serialize(&one).unwrap(),
            serializer.serialize(&two).unwrap()
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(parse_fragment("").is_err());
        assert!(parse_fragment("<a><b></a>").is_err());
        assert!(parse_fragment("<a/><b/>").is_err());
        assert!(parse_fragment("<p:a/>").is_err());
    }
}
