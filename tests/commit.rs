//! Commit Integration Tests
//!
//! Tests for deduplication, reference merging and failure behavior of
//! commits against a real workspace directory.

use std::path::Path;

use filetime::FileTime;
use tempfile::TempDir;
use techmd::family::{self, ProbeOutput};
use techmd::store::{MetadataStore, ReferenceIndex, ReferenceKey, StreamRecord, Workspace};
use techmd::xml::namespaces::AUDIOMD_NS;
use techmd::{Element, MetadataRecord, RecordType, StorageError, StoreError};

const WAV_PROBE: &str = r#"{
    "streams": [
        {
            "index": 0,
            "codec_name": "pcm_s16le",
            "codec_long_name": "PCM signed 16-bit little-endian",
            "codec_type": "audio",
            "sample_rate": "48000",
            "channels": 1,
            "bits_per_sample": 16,
            "duration": "0.770000",
            "bit_rate": "768000"
        }
    ]
}"#;

const STEREO_TRACKS_PROBE: &str = r#"{
    "streams": [
        {
            "index": 1,
            "codec_long_name": "PCM signed 24-bit little-endian",
            "codec_type": "audio",
            "sample_rate": "96000",
            "channels": 2,
            "bits_per_sample": 24,
            "duration": "12.5",
            "bit_rate": "4608000"
        },
        {
            "index": 2,
            "codec_long_name": "MP3 (MPEG audio layer 3)",
            "codec_type": "audio",
            "sample_rate": "44100",
            "channels": 2,
            "bits_per_sample": 0,
            "duration": "12.5",
            "bit_rate": "320000"
        }
    ]
}"#;

fn wav_records() -> Vec<StreamRecord> {
    let probe = ProbeOutput::from_json(WAV_PROBE).unwrap();
    family::audio_records(&probe, false).unwrap()
}

fn tracks(per_stream: bool) -> Vec<StreamRecord> {
    let probe = ProbeOutput::from_json(STEREO_TRACKS_PROBE).unwrap();
    family::audio_records(&probe, per_stream).unwrap()
}

fn audio_record(rate: &str) -> MetadataRecord {
    MetadataRecord::new(
        RecordType::audio_md(),
        Element::new(AUDIOMD_NS, "AUDIOMD")
            .with_child(Element::leaf(AUDIOMD_NS, "samplingFrequency", rate)),
    )
}

/// Every file in the workspace with its contents, sorted by name
fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (
                e.file_name().to_string_lossy().into_owned(),
                std::fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

async fn index(ws: &Workspace) -> ReferenceIndex {
    ReferenceIndex::load(ws).await.unwrap()
}

#[tokio::test]
async fn test_wav_files_share_one_record() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    store.commit(&ws, "a.wav", &wav_records()).await.unwrap();
    let records = ws.list_records().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].ends_with("-AudioMD-techmd.xml"));

    let idx = index(&ws).await;
    assert_eq!(idx.len(), 1);
    assert!(idx.get("a.wav", None).is_some());

    store.commit(&ws, "b.wav", &wav_records()).await.unwrap();
    assert_eq!(ws.list_records().unwrap(), records);

    let idx = index(&ws).await;
    assert_eq!(idx.len(), 2);
    assert_eq!(
        idx.get("a.wav", None).unwrap().identifier,
        idx.get("b.wav", None).unwrap().identifier
    );
}

#[tokio::test]
async fn test_commit_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    store.commit(&ws, "a.wav", &tracks(true)).await.unwrap();
    let before = snapshot(temp.path());

    let report = store.commit(&ws, "a.wav", &tracks(true)).await.unwrap();
    assert_eq!(report.written(), 0);
    assert_eq!(report.deduplicated(), 2);
    assert_eq!(snapshot(temp.path()), before);
}

#[tokio::test]
async fn test_later_commit_keeps_earlier_references() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    store
        .commit(&ws, "a.wav", &[StreamRecord::whole_file(audio_record("48"))])
        .await
        .unwrap();
    store
        .commit(&ws, "b.wav", &[StreamRecord::whole_file(audio_record("44.1"))])
        .await
        .unwrap();

    let idx = index(&ws).await;
    let files: Vec<_> = idx.iter().map(|e| e.key.file.as_str()).collect();
    assert_eq!(files, vec!["a.wav", "b.wav"]);
    assert_eq!(ws.list_records().unwrap().len(), 2);
}

#[tokio::test]
async fn test_streams_of_one_file_are_independent() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());

    MetadataStore::default()
        .commit(&ws, "tracks.mka", &tracks(true))
        .await
        .unwrap();

    let idx = index(&ws).await;
    let keys: Vec<_> = idx.iter().map(|e| e.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            ReferenceKey::stream("tracks.mka", "1"),
            ReferenceKey::stream("tracks.mka", "2"),
        ]
    );
    assert_ne!(
        idx.get("tracks.mka", Some("1")).unwrap().identifier,
        idx.get("tracks.mka", Some("2")).unwrap().identifier
    );
    assert_eq!(ws.list_records().unwrap().len(), 2);
}

#[tokio::test]
async fn test_whole_file_streams_last_one_wins() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());

    let report = MetadataStore::default()
        .commit(&ws, "tracks.mka", &tracks(false))
        .await
        .unwrap();

    let idx = index(&ws).await;
    assert_eq!(idx.len(), 1);
    assert_eq!(
        idx.get("tracks.mka", None).unwrap().identifier,
        report.outcomes[1].identifier
    );
    // both records are still stored
    assert_eq!(ws.list_records().unwrap().len(), 2);
}

#[tokio::test]
async fn test_replaced_reference_keeps_position() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    for (file, rate) in [("a.wav", "48"), ("b.wav", "48"), ("a.wav", "96")] {
        store
            .commit(&ws, file, &[StreamRecord::whole_file(audio_record(rate))])
            .await
            .unwrap();
    }

    let idx = index(&ws).await;
    let files: Vec<_> = idx.iter().map(|e| e.key.file.as_str()).collect();
    assert_eq!(files, vec!["a.wav", "b.wav"]);

    let (expected, _) = store.identify(&audio_record("96")).unwrap();
    assert_eq!(idx.get("a.wav", None).unwrap().identifier, expected);
}

#[tokio::test]
async fn test_existing_record_is_not_rewritten() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    let report = store.commit(&ws, "a.wav", &wav_records()).await.unwrap();
    let path = ws.record_path(&report.outcomes[0].identifier);
    let before = std::fs::read(&path).unwrap();

    let old = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&path, old).unwrap();

    store.commit(&ws, "b.wav", &wav_records()).await.unwrap();

    let meta = std::fs::metadata(&path).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), old);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_corrupt_index_is_reported_and_kept() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    store.commit(&ws, "a.wav", &wav_records()).await.unwrap();

    let corrupt = b"<techmdReferences><techmdReference file=\"a.wav\"".to_vec();
    std::fs::write(ws.references_path(), &corrupt).unwrap();

    let result = store.commit(&ws, "b.wav", &wav_records()).await;
    match result {
        Err(err @ StoreError::Storage(_)) => assert_eq!(err.exit_code(), 3),
        other => panic!("expected storage error, got {:?}", other),
    }
    assert_eq!(std::fs::read(ws.references_path()).unwrap(), corrupt);
}

#[tokio::test]
async fn test_input_error_leaves_workspace_untouched() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    store.commit(&ws, "a.wav", &wav_records()).await.unwrap();
    let before = snapshot(temp.path());

    let unregistered = MetadataRecord::new(
        RecordType::audio_md(),
        Element::new("urn:example:unregistered", "AUDIOMD"),
    );
    let result = store
        .commit(
            &ws,
            "b.wav",
            &[
                StreamRecord::stream("0", audio_record("22.05")),
                StreamRecord::stream("1", unregistered),
            ],
        )
        .await;

    match result {
        Err(err @ StoreError::Input(_)) => assert_eq!(err.exit_code(), 2),
        other => panic!("expected input error, got {:?}", other),
    }
    assert_eq!(snapshot(temp.path()), before);
}

#[tokio::test]
async fn test_record_file_wraps_payload() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());

    let report = MetadataStore::default()
        .commit(&ws, "a.wav", &wav_records())
        .await
        .unwrap();
    let id = &report.outcomes[0].identifier;
    let xml = std::fs::read_to_string(ws.record_path(id)).unwrap();

    assert!(xml.contains(&format!("ID=\"{}\"", id.xml_id())));
    assert!(xml.contains("OTHERMDTYPE=\"AudioMD\""));
    assert!(xml.contains("<amd:samplingFrequency>48</amd:samplingFrequency>"));
    assert!(xml.contains("<amd:duration>PT0.77S</amd:duration>"));
}

#[tokio::test]
async fn test_first_commit_creates_workspace_directory() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path().join("nested").join("workspace"));

    MetadataStore::default()
        .commit(&ws, "a.wav", &wav_records())
        .await
        .unwrap();

    assert!(ws.references_path().exists());
    assert_eq!(ws.list_records().unwrap().len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unwritable_workspace_is_storage_error() {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    let store = MetadataStore::default();

    store.commit(&ws, "a.wav", &wav_records()).await.unwrap();
    let before = std::fs::read(ws.references_path()).unwrap();

    std::fs::set_permissions(temp.path(), Permissions::from_mode(0o555)).unwrap();

    // root ignores directory permissions
    let check = temp.path().join(".write-check");
    if std::fs::write(&check, b"").is_ok() {
        std::fs::remove_file(&check).unwrap();
        std::fs::set_permissions(temp.path(), Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = store
        .commit(&ws, "b.wav", &[StreamRecord::whole_file(audio_record("96"))])
        .await;
    std::fs::set_permissions(temp.path(), Permissions::from_mode(0o755)).unwrap();

    match result {
        Err(err @ StoreError::Storage(StorageError::Io { .. })) => assert_eq!(err.exit_code(), 3),
        other => panic!("expected I/O storage error, got {:?}", other),
    }
    assert_eq!(std::fs::read(ws.references_path()).unwrap(), before);
    assert_eq!(ws.list_records().unwrap().len(), 1);
}
