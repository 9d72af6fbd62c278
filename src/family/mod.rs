//! Metadata families: turn probe output into records for the store.
//!
//! Each family only builds payload trees; deduplication and referencing are
//! the store's job.
//!
//! | Family  | Record type | Source                 |
//! |---------|-------------|------------------------|
//! | audioMD | `AudioMD`   | ffprobe audio streams  |
//! | videoMD | `VideoMD`   | ffprobe video streams  |
//! | MIX     | `NISOIMG`   | image probe JSON       |

pub mod audiomd;
pub mod format;
pub mod mix;
pub mod probe;
pub mod videomd;

use anyhow::{bail, Result};

use crate::store::StreamRecord;

pub use audiomd::AudioStream;
pub use mix::ImageInfo;
pub use probe::{ProbeOutput, ProbeStream};
pub use videomd::{ColorPolicy, VideoStream};

/// Value not applicable
pub const UNAP: &str = "(:unap)";

/// Value not available
pub const UNAV: &str = "(:unav)";

fn keyed(per_stream: bool, index: u32, record: crate::store::MetadataRecord) -> StreamRecord {
    if per_stream {
        StreamRecord::stream(index.to_string(), record)
    } else {
        StreamRecord::whole_file(record)
    }
}

/// One audioMD record per audio stream.
///
/// Without `per_stream` every record is keyed to the whole file, so with
/// several audio streams the last one wins in the index.
pub fn audio_records(probe: &ProbeOutput, per_stream: bool) -> Result<Vec<StreamRecord>> {
    let mut records = Vec::new();
    for stream in probe.streams_of("audio") {
        let audio = AudioStream::from_probe(stream)?;
        records.push(keyed(per_stream, audio.index, audiomd::record(&audio)));
    }

    if records.is_empty() {
        bail!("No audio streams in probe output");
    }
    Ok(records)
}

/// One videoMD record per video stream (same keying as [`audio_records`])
pub fn video_records(
    probe: &ProbeOutput,
    per_stream: bool,
    policy: ColorPolicy,
) -> Result<Vec<StreamRecord>> {
    let sound = probe.has_audio();

    let mut records = Vec::new();
    for stream in probe.streams_of("video") {
        let video = VideoStream::from_probe(stream, sound)?;
        records.push(keyed(per_stream, video.index, videomd::record(&video, policy)?));
    }

    if records.is_empty() {
        bail!("No video streams in probe output");
    }
    Ok(records)
}

/// The MIX record of a still image, always keyed to the whole file
pub fn image_record(info: &ImageInfo) -> StreamRecord {
    StreamRecord::whole_file(mix::record(info))
}
