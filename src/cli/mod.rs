//! Command-line interface for techmd.
//!
//! Provides commands for recording audioMD, videoMD and MIX metadata of
//! one file per invocation, committing hand-written fragments, and
//! inspecting a workspace.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, ResolvedConfig};
use crate::error::{InputError, StorageError, StoreError};
use crate::family::{self, ImageInfo, ProbeOutput};
use crate::identifier::RecordType;
use crate::store::{
    self, CommitReport, MetadataRecord, MetadataStore, RecordStatus, ReferenceIndex,
    StreamRecord, Workspace, WorkspaceLock,
};
use crate::xml::parse_fragment;

/// techmd - content-addressed technical metadata for METS packages
#[derive(Parser, Debug)]
#[command(name = "techmd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory (overrides configuration)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record audioMD metadata for an audio file
    Audio {
        /// File identifier to record (path of the audio file)
        file: String,

        /// ffprobe JSON output for the file
        #[arg(short, long)]
        probe: PathBuf,

        /// Reference each stream separately
        #[arg(long)]
        streams: bool,
    },

    /// Record videoMD metadata for a video file
    Video {
        /// File identifier to record (path of the video file)
        file: String,

        /// ffprobe JSON output for the file
        #[arg(short, long)]
        probe: PathBuf,

        /// Reference each stream separately
        #[arg(long)]
        streams: bool,
    },

    /// Record MIX metadata for a still image
    Image {
        /// File identifier to record (path of the image)
        file: String,

        /// Image probe JSON for the file
        #[arg(short, long)]
        probe: PathBuf,
    },

    /// Commit a prepared metadata fragment
    Commit {
        /// File identifier to record
        file: String,

        /// Record type tag (e.g. AudioMD, VideoMD, NISOIMG)
        #[arg(short, long)]
        record_type: String,

        /// XML fragment holding the payload
        #[arg(short, long)]
        payload: PathBuf,

        /// Stream index within the file
        #[arg(short, long)]
        stream: Option<String>,
    },

    /// List reference index entries
    References {
        /// Only show entries of this file
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Check that every reference points at a stored record
    Verify,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;
        let workspace = Workspace::new(self.workspace.unwrap_or_else(|| cfg.workspace.clone()));

        match self.command {
            Commands::Audio {
                file,
                probe,
                streams,
            } => {
                let probe = ProbeOutput::load(&probe).await?;
                let records = family::audio_records(&probe, streams)?;
                commit(cfg, &workspace, &file, &records).await
            }
            Commands::Video {
                file,
                probe,
                streams,
            } => {
                let probe = ProbeOutput::load(&probe).await?;
                let records = family::video_records(&probe, streams, cfg.color_policy)?;
                commit(cfg, &workspace, &file, &records).await
            }
            Commands::Image { file, probe } => {
                let info = ImageInfo::load(&probe).await?;
                commit(cfg, &workspace, &file, &[family::image_record(&info)]).await
            }
            Commands::Commit {
                file,
                record_type,
                payload,
                stream,
            } => {
                let record = load_fragment(&record_type, &payload).await?;
                let records = [StreamRecord { stream, record }];
                commit(cfg, &workspace, &file, &records).await
            }
            Commands::References { file } => {
                list_references(&workspace, file.as_deref()).await
            }
            Commands::Verify => verify(&workspace).await,
            Commands::Config => show_config(cfg, &workspace),
        }
    }
}

/// Map an error to the process exit status: 2 for input errors, 3 for
/// storage errors, 1 for anything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return e.exit_code();
        }
        if cause.is::<InputError>() {
            return InputError::EXIT_CODE;
        }
        if cause.is::<StorageError>() {
            return StorageError::EXIT_CODE;
        }
    }
    1
}

/// Normalize a file path lexically into the identifier recorded in the
/// index: `.` segments dropped, `..` folded, `/` separators.
pub fn normalize_file_identifier(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;

    for component in Path::new(path).components() {
        match component {
            Component::RootDir => absolute = true,
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().into_owned())
            }
            Component::CurDir => {}
            Component::ParentDir => match parts.last().map(String::as_str) {
                Some("..") | None if !absolute => parts.push("..".to_string()),
                Some(_) => {
                    parts.pop();
                }
                None => {}
            },
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Read a payload fragment file into a record
async fn load_fragment(record_type: &str, payload: &Path) -> Result<MetadataRecord> {
    let record_type = RecordType::new(record_type)?;
    let xml = tokio::fs::read_to_string(payload)
        .await
        .with_context(|| format!("Failed to read payload: {}", payload.display()))?;
    let element = parse_fragment(&xml)
        .with_context(|| format!("Invalid payload: {}", payload.display()))?;

    Ok(MetadataRecord::new(record_type, element))
}

/// Commit records of one file under the workspace lock
async fn commit(
    cfg: &ResolvedConfig,
    workspace: &Workspace,
    file: &str,
    records: &[StreamRecord],
) -> Result<()> {
    let file = normalize_file_identifier(file);
    let store = MetadataStore::with_namespaces(cfg.namespaces.clone());

    let lock = WorkspaceLock::acquire(workspace, cfg.lock_timeout).await?;
    let report = store.commit(workspace, &file, records).await;
    drop(lock);

    print_report(&report?);
    Ok(())
}

fn print_report(report: &CommitReport) {
    for outcome in &report.outcomes {
        let status = match outcome.status {
            RecordStatus::Written => "written",
            RecordStatus::Deduplicated => "exists",
        };
        println!(
            "{:<8} {:<40} {}",
            status,
            outcome.key,
            outcome.identifier.file_name()
        );
    }
}

/// List reference index entries
async fn list_references(workspace: &Workspace, file: Option<&str>) -> Result<()> {
    let index = ReferenceIndex::load(workspace).await?;
    let file = file.map(normalize_file_identifier);

    let entries: Vec<_> = match &file {
        Some(file) => index.entries_for_file(file),
        None => index.iter().collect(),
    };

    if entries.is_empty() {
        println!("No references found");
        return Ok(());
    }

    println!("{:<40} {:<8} {:<10} {}", "FILE", "STREAM", "TYPE", "ID");
    println!("{}", "-".repeat(95));

    for entry in entries {
        println!(
            "{:<40} {:<8} {:<10} {}",
            entry.key.file,
            entry.key.stream.as_deref().unwrap_or("-"),
            entry.identifier.record_type(),
            entry.identifier.xml_id()
        );
    }

    Ok(())
}

/// Check the workspace for missing and unreferenced records
async fn verify(workspace: &Workspace) -> Result<()> {
    let report = store::verify(workspace).await?;

    println!("References: {}", report.entries);
    for entry in &report.missing {
        println!("missing  {:<40} {}", entry.key, entry.identifier.file_name());
    }
    for orphan in &report.orphans {
        println!("orphan   {}", orphan);
    }

    if !report.is_consistent() {
        anyhow::bail!(
            "{} reference(s) point at missing records in {}",
            report.missing.len(),
            workspace.root().display()
        );
    }

    println!("Workspace is consistent");
    Ok(())
}

fn show_config(cfg: &ResolvedConfig, workspace: &Workspace) -> Result<()> {
    println!("techmd configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Workspace:");
    println!("  Directory:  {}", workspace.root().display());
    println!("  References: {}", workspace.references_path().display());
    println!("  Lock file:  {}", workspace.lock_path().display());
    println!("  Lock wait:  {}s", cfg.lock_timeout.as_secs());
    println!();
    println!("Video color policy: {:?}", cfg.color_policy);
    println!();
    println!("Namespaces:");
    for (prefix, uri) in cfg.namespaces.iter() {
        println!("  {:<8} {}", prefix, uri);
    }

    Ok(())
}
