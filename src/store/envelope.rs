//! METS wrapper written around each stored record.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::identifier::ContentIdentifier;
use crate::xml::canonical::escape_attr;
use crate::xml::namespaces::METS_NS;

/// Wrap canonical payload bytes in a `mets:techMD` section.
///
/// The payload is embedded byte for byte; only the wrapper carries the
/// creation time, so the identifier never depends on it.
pub fn render(id: &ContentIdentifier, created: DateTime<Utc>, canonical: &[u8]) -> Vec<u8> {
    let wrap = id.record_type().md_wrap();

    let mut md_wrap = format!("<mets:mdWrap MDTYPE=\"{}\"", wrap.mdtype);
    if let Some(other) = &wrap.other_mdtype {
        md_wrap.push_str(&format!(" OTHERMDTYPE=\"{}\"", escape_attr(other)));
    }
    if let Some(version) = wrap.version {
        md_wrap.push_str(&format!(" MDTYPEVERSION=\"{}\"", version));
    }
    md_wrap.push('>');

    let head = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <mets:mets xmlns:mets=\"{}\"><mets:amdSec>\
         <mets:techMD ID=\"{}\" CREATED=\"{}\">{}<mets:xmlData>",
        METS_NS,
        id.xml_id(),
        created.to_rfc3339_opts(SecondsFormat::Secs, true),
        md_wrap
    );
    let tail = "</mets:xmlData></mets:mdWrap></mets:techMD></mets:amdSec></mets:mets>\n";

    let mut out = Vec::with_capacity(head.len() + canonical.len() + tail.len());
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(canonical);
    out.extend_from_slice(tail.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::RecordType;
    use chrono::TimeZone;

    #[test]
    fn test_render_wraps_payload() {
        let payload = b"<amd:AUDIOMD xmlns:amd=\"http://www.loc.gov/audioMD/\"/>";
        let id = ContentIdentifier::compute(&RecordType::audio_md(), payload);
        let created = Utc.with_ymd_and_hms(2026, 10, 16, 12, 30, 0).unwrap();

        let out = String::from_utf8(render(&id, created, payload)).unwrap();

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<mets:mets"));
        assert!(out.contains(&format!("<mets:techMD ID=\"_{}\" CREATED=\"2026-10-16T12:30:00Z\">", id.digest())));
        assert!(out.contains(
            "<mets:mdWrap MDTYPE=\"OTHER\" OTHERMDTYPE=\"AudioMD\" MDTYPEVERSION=\"2.0\"><mets:xmlData>"
        ));
        assert!(out.contains(std::str::from_utf8(payload).unwrap()));
        assert!(out.ends_with("</mets:mets>\n"));
    }

    #[test]
    fn test_render_niso_img_has_no_other_mdtype() {
        let id = ContentIdentifier::compute(&RecordType::niso_img(), b"<mix:mix/>");
        let out = String::from_utf8(render(&id, Utc::now(), b"<mix:mix/>")).unwrap();

        assert!(out.contains("<mets:mdWrap MDTYPE=\"NISOIMG\" MDTYPEVERSION=\"2.0\">"));
        assert!(!out.contains("OTHERMDTYPE"));
    }
}
