//! audioMD records for audio streams.

use anyhow::Result;

use crate::identifier::RecordType;
use crate::store::MetadataRecord;
use crate::xml::namespaces::AUDIOMD_NS;
use crate::xml::Element;

use super::format::{decimal, iso8601_duration};
use super::probe::ProbeStream;
use super::{UNAP, UNAV};

/// Values of one audio stream needed for an audioMD record
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub index: u32,
    pub codec_long_name: String,
    pub bits_per_sample: u32,
    /// bits per second
    pub bit_rate: f64,
    /// Hz
    pub sample_rate: f64,
    /// seconds
    pub duration: f64,
    pub channels: u32,
}

impl AudioStream {
    pub fn from_probe(stream: &ProbeStream) -> Result<Self> {
        Ok(Self {
            index: stream.index,
            codec_long_name: stream.codec_long_name()?.to_string(),
            bits_per_sample: stream.count("bits_per_sample", stream.bits_per_sample)?,
            bit_rate: stream.number("bit_rate", &stream.bit_rate)?,
            sample_rate: stream.number("sample_rate", &stream.sample_rate)?,
            duration: stream.number("duration", &stream.duration)?,
            channels: stream.count("channels", stream.channels)?,
        })
    }

    /// `PCM` for any PCM variant, the full codec name otherwise
    pub fn encoding(&self) -> &str {
        match self.codec_long_name.split_whitespace().next() {
            Some("PCM") => "PCM",
            _ => &self.codec_long_name,
        }
    }

    pub fn is_pcm(&self) -> bool {
        self.encoding() == "PCM"
    }
}

/// bit/s as whole kbit/s, ties to even
fn kbit_per_second(bit_rate: f64) -> String {
    format!("{}", (bit_rate / 1000.0).round_ties_even() as i64)
}

fn amd(name: &str, text: impl Into<String>) -> Element {
    Element::leaf(AUDIOMD_NS, name, text)
}

/// `amd:AUDIOMD` element for one stream
pub fn build(stream: &AudioStream) -> Element {
    let (app, version, codec, quality) = if stream.is_pcm() {
        (UNAP, UNAP, UNAP, "lossless")
    } else {
        (UNAV, UNAV, UNAV, UNAV)
    };

    let compression = Element::new(AUDIOMD_NS, "compression").with_children([
        amd("codecCreatorApp", app),
        amd("codecCreatorAppVersion", version),
        amd("codecName", codec),
        amd("codecQuality", quality),
    ]);

    let file_data = Element::new(AUDIOMD_NS, "fileData").with_children([
        amd("audioDataEncoding", stream.encoding()),
        amd("bitsPerSample", stream.bits_per_sample.to_string()),
        compression,
        amd("dataRate", kbit_per_second(stream.bit_rate)),
        amd("dataRateMode", "Fixed"),
        amd("samplingFrequency", decimal(stream.sample_rate / 1000.0)),
    ]);

    let audio_info = Element::new(AUDIOMD_NS, "audioInfo").with_children([
        amd("duration", iso8601_duration(stream.duration)),
        amd("numChannels", stream.channels.to_string()),
    ]);

    Element::new(AUDIOMD_NS, "AUDIOMD")
        .with_attr("ANALOGDIGITALFLAG", "FileDigital")
        .with_child(file_data)
        .with_child(audio_info)
}

pub fn record(stream: &AudioStream) -> MetadataRecord {
    MetadataRecord::new(RecordType::audio_md(), build(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav() -> AudioStream {
        AudioStream {
            index: 0,
            codec_long_name: "PCM signed 16-bit little-endian".into(),
            bits_per_sample: 16,
            bit_rate: 768000.0,
            sample_rate: 48000.0,
            duration: 0.77,
            channels: 1,
        }
    }

    #[test]
    fn test_pcm_wav_values() {
        let el = build(&wav());

        assert_eq!(el.attr("ANALOGDIGITALFLAG"), Some("FileDigital"));
        assert_eq!(el.text_at(&["fileData", "audioDataEncoding"]), Some("PCM"));
        assert_eq!(el.text_at(&["fileData", "bitsPerSample"]), Some("16"));
        assert_eq!(el.text_at(&["fileData", "compression", "codecCreatorApp"]), Some("(:unap)"));
        assert_eq!(el.text_at(&["fileData", "compression", "codecName"]), Some("(:unap)"));
        assert_eq!(el.text_at(&["fileData", "compression", "codecQuality"]), Some("lossless"));
        assert_eq!(el.text_at(&["fileData", "dataRate"]), Some("768"));
        assert_eq!(el.text_at(&["fileData", "dataRateMode"]), Some("Fixed"));
        assert_eq!(el.text_at(&["fileData", "samplingFrequency"]), Some("48"));
        assert_eq!(el.text_at(&["audioInfo", "duration"]), Some("PT0.77S"));
        assert_eq!(el.text_at(&["audioInfo", "numChannels"]), Some("1"));
    }

    #[test]
    fn test_compressed_codec_keeps_full_name() {
        let stream = AudioStream {
            codec_long_name: "MP3 (MPEG audio layer 3)".into(),
            bit_rate: 128_456.0,
            sample_rate: 44100.0,
            ..wav()
        };
        let el = build(&stream);

        assert_eq!(
            el.text_at(&["fileData", "audioDataEncoding"]),
            Some("MP3 (MPEG audio layer 3)")
        );
        assert_eq!(el.text_at(&["fileData", "compression", "codecQuality"]), Some("(:unav)"));
        assert_eq!(el.text_at(&["fileData", "dataRate"]), Some("128"));
        assert_eq!(el.text_at(&["fileData", "samplingFrequency"]), Some("44.1"));
    }

    #[test]
    fn test_data_rate_rounds_half_to_even() {
        let rate = |bit_rate| {
            build(&AudioStream { bit_rate, ..wav() })
                .text_at(&["fileData", "dataRate"])
                .map(str::to_string)
        };

        assert_eq!(rate(128_500.0).as_deref(), Some("128"));
        assert_eq!(rate(129_500.0).as_deref(), Some("130"));
        assert_eq!(rate(500.0).as_deref(), Some("0"));
        assert_eq!(rate(128_501.0).as_deref(), Some("129"));
    }

    #[test]
    fn test_pcm_must_be_first_word() {
        let stream = AudioStream {
            codec_long_name: "ADPCM IMA WAV".into(),
            ..wav()
        };
        assert!(!stream.is_pcm());
    }
}
