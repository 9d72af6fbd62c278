//! videoMD records for video streams.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::identifier::RecordType;
use crate::store::MetadataRecord;
use crate::xml::namespaces::VIDEOMD_NS;
use crate::xml::Element;

use super::format::{decimal, iso8601_duration};
use super::probe::{ratio, ProbeStream};
use super::UNAV;

/// Chroma subsampling codes recognised in a pixel format name, in match order
const SAMPLING_CODES: [&str; 6] = ["444", "422", "420", "440", "411", "410"];

/// How `gray` pixel formats are classified.
///
/// `Legacy` reproduces the classification existing workspaces were built
/// with, where `gray` ends up as `Color`. Switching policy changes the
/// identifiers of affected records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPolicy {
    #[default]
    Legacy,
    DetectGrayscale,
}

/// `color` value for a pixel format
pub fn classify_color(pix_fmt: &str, policy: ColorPolicy) -> &'static str {
    match (pix_fmt, policy) {
        ("monob" | "monow", _) => "B&W",
        ("gray", ColorPolicy::DetectGrayscale) => "Grayscale",
        ("gray", ColorPolicy::Legacy) => {
            warn!(
                pix_fmt,
                "Grayscale pixel format classified as Color; set video.grayscale_detection to change"
            );
            "Color"
        }
        _ => "Color",
    }
}

/// `4:2:0` style sampling of a pixel format, `(:unav)` when unknown
pub fn sampling(pix_fmt: &str) -> String {
    SAMPLING_CODES
        .iter()
        .find(|code| pix_fmt.contains(*code))
        .map(|code| {
            code.chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(":")
        })
        .unwrap_or_else(|| UNAV.to_string())
}

/// Values of one video stream needed for a videoMD record
#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub index: u32,
    pub codec_long_name: String,
    /// bits per second
    pub bit_rate: f64,
    /// seconds
    pub duration: f64,
    pub bits_per_raw_sample: Option<String>,
    pub width: u32,
    pub height: u32,
    pub pix_fmt: String,
    pub avg_frame_rate: String,
    pub sample_aspect_ratio: String,
    pub display_aspect_ratio: String,
    /// Whether the container also carries audio
    pub sound: bool,
}

impl VideoStream {
    pub fn from_probe(stream: &ProbeStream, sound: bool) -> Result<Self> {
        let text = |field, value: &Option<String>| -> Result<String> {
            Ok(stream.required(field, value)?.to_string())
        };

        Ok(Self {
            index: stream.index,
            codec_long_name: stream.codec_long_name()?.to_string(),
            bit_rate: stream.number("bit_rate", &stream.bit_rate)?,
            duration: stream.number("duration", &stream.duration)?,
            bits_per_raw_sample: stream.bits_per_raw_sample.clone(),
            width: stream.count("width", stream.width)?,
            height: stream.count("height", stream.height)?,
            pix_fmt: text("pix_fmt", &stream.pix_fmt)?,
            avg_frame_rate: text("avg_frame_rate", &stream.avg_frame_rate)?,
            sample_aspect_ratio: text("sample_aspect_ratio", &stream.sample_aspect_ratio)?,
            display_aspect_ratio: text("display_aspect_ratio", &stream.display_aspect_ratio)?,
            sound,
        })
    }

    /// Numerator of the average frame rate
    pub fn frame_rate(&self) -> &str {
        self.avg_frame_rate
            .split('/')
            .next()
            .unwrap_or(&self.avg_frame_rate)
    }

    pub fn par(&self) -> Result<String> {
        let value = ratio(&self.sample_aspect_ratio)
            .with_context(|| format!("Stream {} has invalid sample_aspect_ratio", self.index))?;
        Ok(decimal(value))
    }

    pub fn dar(&self) -> String {
        self.display_aspect_ratio.replace(':', "/")
    }
}

fn vmd(name: &str, text: impl Into<String>) -> Element {
    Element::leaf(VIDEOMD_NS, name, text)
}

/// `vmd:VIDEOMD` element for one stream
pub fn build(stream: &VideoStream, policy: ColorPolicy) -> Result<Element> {
    let compression = Element::new(VIDEOMD_NS, "compression").with_children([
        vmd("codecCreatorApp", UNAV),
        vmd("codecCreatorAppVersion", UNAV),
        vmd("codecName", stream.codec_long_name.as_str()),
        vmd("codecQuality", UNAV),
    ]);

    let frame = Element::new(VIDEOMD_NS, "frame").with_children([
        vmd("pixelsHorizontal", stream.width.to_string()),
        vmd("pixelsVertical", stream.height.to_string()),
        vmd("PAR", stream.par()?),
        vmd("DAR", stream.dar()),
    ]);

    let file_data = Element::new(VIDEOMD_NS, "fileData").with_children([
        vmd("duration", iso8601_duration(stream.duration)),
        vmd("dataRate", decimal(stream.bit_rate / 1_000_000.0)),
        vmd(
            "bitsPerSample",
            stream.bits_per_raw_sample.as_deref().unwrap_or("0"),
        ),
        vmd("color", classify_color(&stream.pix_fmt, policy)),
        compression,
        vmd("dataRateMode", "Fixed"),
        frame,
        vmd("frameRate", stream.frame_rate()),
        vmd("sampling", sampling(&stream.pix_fmt)),
        vmd("signalFormat", UNAV),
        vmd("sound", if stream.sound { "Yes" } else { "No" }),
    ]);

    Ok(Element::new(VIDEOMD_NS, "VIDEOMD")
        .with_attr("ANALOGDIGITALFLAG", "FileDigital")
        .with_child(file_data))
}

pub fn record(stream: &VideoStream, policy: ColorPolicy) -> Result<MetadataRecord> {
    Ok(MetadataRecord::new(
        RecordType::video_md(),
        build(stream, policy)?,
    ))
}
