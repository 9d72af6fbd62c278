//! MIX (NISO still image) records.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::identifier::RecordType;
use crate::store::MetadataRecord;
use crate::xml::namespaces::MIX_NS;
use crate::xml::Element;

/// Image properties reported by an image probe
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageInfo {
    pub compression: String,
    pub byteorder: String,
    pub width: String,
    pub height: String,
    pub colorspace: String,
    pub bitspersample: String,
    pub bpsunit: String,
    pub samplesperpixel: String,
}

impl ImageInfo {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse image probe JSON")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read image probe: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid image probe: {}", path.display()))
    }
}

fn mix(name: &str) -> Element {
    Element::new(MIX_NS, name)
}

fn leaf(name: &str, text: &str) -> Element {
    Element::leaf(MIX_NS, name, text)
}

/// `mix:mix` element for one image
pub fn build(info: &ImageInfo) -> Element {
    let object = mix("BasicDigitalObjectInformation").with_children([
        leaf("byteOrder", &info.byteorder),
        mix("Compression").with_child(leaf("compressionScheme", &info.compression)),
    ]);

    let image = mix("BasicImageInformation").with_child(
        mix("BasicImageCharacteristics").with_children([
            leaf("imageWidth", &info.width),
            leaf("imageHeight", &info.height),
            mix("PhotometricInterpretation").with_child(leaf("colorSpace", &info.colorspace)),
        ]),
    );

    let assessment = mix("ImageAssessmentMetadata").with_child(
        mix("ImageColorEncoding").with_children([
            mix("BitsPerSample").with_children([
                leaf("bitsPerSampleValue", &info.bitspersample),
                leaf("bitsPerSampleUnit", &info.bpsunit),
            ]),
            leaf("samplesPerPixel", &info.samplesperpixel),
        ]),
    );

    mix("mix").with_children([object, image, assessment])
}

pub fn record(info: &ImageInfo) -> MetadataRecord {
    MetadataRecord::new(RecordType::niso_img(), build(info))
}
