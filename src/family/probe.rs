//! Probe output consumed by the metadata families.
//!
//! Audio and video streams come from `ffprobe -show_streams -print_format json`.
//! ffprobe prints most rates and durations as JSON strings, so those fields
//! are kept raw here and parsed by the accessor that needs them.

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Top level of an ffprobe JSON document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

impl ProbeOutput {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse ffprobe JSON")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read probe output: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid probe output: {}", path.display()))
    }

    pub fn streams_of<'a>(&'a self, codec_type: &'a str) -> impl Iterator<Item = &'a ProbeStream> + 'a {
        self.streams
            .iter()
            .filter(move |s| s.codec_type.as_deref() == Some(codec_type))
    }

    pub fn has_audio(&self) -> bool {
        self.streams_of("audio").next().is_some()
    }
}

/// One entry of `streams`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_long_name: Option<String>,

    // audio
    pub bits_per_sample: Option<u32>,
    pub sample_rate: Option<String>,
    pub channels: Option<u32>,

    // video
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pix_fmt: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub sample_aspect_ratio: Option<String>,
    pub display_aspect_ratio: Option<String>,
    pub bits_per_raw_sample: Option<String>,

    pub bit_rate: Option<String>,
    pub duration: Option<String>,
}

impl ProbeStream {
    /// A string field that must be present
    pub fn required<'a>(&self, field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| anyhow!("Stream {} has no {}", self.index, field))
    }

    /// A string field parsed as a number
    pub fn number<T>(&self, field: &'static str, value: &Option<String>) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = self.required(field, value)?;
        raw.trim()
            .parse()
            .with_context(|| format!("Stream {} has invalid {}: '{}'", self.index, field, raw))
    }

    /// A numeric field ffprobe prints as a JSON number
    pub fn count(&self, field: &'static str, value: Option<u32>) -> Result<u32> {
        value.ok_or_else(|| anyhow!("Stream {} has no {}", self.index, field))
    }

    pub fn codec_long_name(&self) -> Result<&str> {
        self.required("codec_long_name", &self.codec_long_name)
    }
}

/// `a:b` or `a/b` as a float
pub fn ratio(value: &str) -> Result<f64> {
    let (num, den) = value
        .split_once([':', '/'])
        .ok_or_else(|| anyhow!("Not a ratio: '{}'", value))?;
    let num: f64 = num
        .trim()
        .parse()
        .with_context(|| format!("Invalid ratio numerator: '{}'", value))?;
    let den: f64 = den
        .trim()
        .parse()
        .with_context(|| format!("Invalid ratio denominator: '{}'", value))?;
    if den == 0.0 {
        return Err(anyhow!("Ratio with zero denominator: '{}'", value));
    }
    Ok(num / den)
}
