//! Canonical Serialization Integration Tests
//!
//! Equal payloads must map to one identifier however they were built, and
//! any difference in content must change the identifier.

use std::collections::HashSet;

use techmd::xml::namespaces::{MIX_NS, VIDEOMD_NS, XLINK_NS};
use techmd::xml::parse_fragment;
use techmd::{CanonicalSerializer, Element, MetadataRecord, MetadataStore, RecordType};

fn frame(attr_order_reversed: bool, width: &str) -> Element {
    let mut el = Element::new(VIDEOMD_NS, "frame");
    let attrs = [("a", "1"), ("b", "2"), ("c", "3")];
    let ordered: Vec<_> = if attr_order_reversed {
        attrs.iter().rev().collect()
    } else {
        attrs.iter().collect()
    };
    for (name, value) in ordered {
        el.set_attr(*name, *value);
    }
    el.with_child(Element::leaf(VIDEOMD_NS, "pixelsHorizontal", width))
}

#[test]
fn test_attribute_order_does_not_change_identifier() {
    let store = MetadataStore::default();
    let a = MetadataRecord::new(RecordType::video_md(), frame(false, "1920"));
    let b = MetadataRecord::new(RecordType::video_md(), frame(true, "1920"));

    assert_eq!(store.identify(&a).unwrap(), store.identify(&b).unwrap());
}

#[test]
fn test_whitespace_and_prefixes_of_fragments_do_not_matter() {
    let compact = parse_fragment(
        r#"<mix:mix xmlns:mix="http://www.loc.gov/mix/v20"><mix:byteOrder>little endian</mix:byteOrder></mix:mix>"#,
    )
    .unwrap();
    let indented = parse_fragment(
        r#"<m:mix xmlns:m="http://www.loc.gov/mix/v20">
             <m:byteOrder>
               little   endian
             </m:byteOrder>
           </m:mix>"#,
    )
    .unwrap();
    let built = Element::new(MIX_NS, "mix").with_child(Element::leaf(MIX_NS, "byteOrder", "little endian"));

    let serializer = CanonicalSerializer::default();
    let expected = serializer.serialize(&built).unwrap();
    assert_eq!(serializer.serialize(&compact).unwrap(), expected);
    assert_eq!(serializer.serialize(&indented).unwrap(), expected);
}

#[test]
fn test_record_type_is_part_of_identifier() {
    let store = MetadataStore::default();
    let payload = frame(false, "640");

    let (audio, _) = store
        .identify(&MetadataRecord::new(RecordType::audio_md(), payload.clone()))
        .unwrap();
    let (video, _) = store
        .identify(&MetadataRecord::new(RecordType::video_md(), payload))
        .unwrap();

    assert_ne!(audio, video);
    assert_eq!(audio.digest().len(), video.digest().len());
}

#[test]
fn test_distinct_values_give_distinct_identifiers() {
    let store = MetadataStore::default();
    let mut seen = HashSet::new();

    for width in 0..2000 {
        let record = MetadataRecord::new(RecordType::video_md(), frame(false, &width.to_string()));
        let (id, _) = store.identify(&record).unwrap();
        assert!(seen.insert(id.digest().to_string()), "collision at {}", width);
    }

    // attribute values count too
    let base = frame(false, "1");
    let mut changed = base.clone();
    changed.set_attr("b", "20");
    let (a, _) = store.identify(&MetadataRecord::new(RecordType::video_md(), base)).unwrap();
    let (b, _) = store.identify(&MetadataRecord::new(RecordType::video_md(), changed)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_namespaced_attributes_are_declared_once_on_root() {
    let el = Element::new(MIX_NS, "mix")
        .with_ns_attr(XLINK_NS, "href", "a.tif")
        .with_child(Element::leaf(MIX_NS, "byteOrder", "big endian"));

    let xml = CanonicalSerializer::default().serialize_to_string(&el).unwrap();

    assert!(xml.starts_with(
        r#"<mix:mix xmlns:mix="http://www.loc.gov/mix/v20" xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="a.tif">"#
    ));
    assert_eq!(xml.matches("xmlns:mix").count(), 1);
}

#[test]
fn test_serialization_is_repeatable() {
    let serializer = CanonicalSerializer::default();
    let el = frame(true, "1080");

    let first = serializer.serialize(&el).unwrap();
    for _ in 0..10 {
        assert_eq!(serializer.serialize(&el).unwrap(), first);
    }
}
