//! Save/Load for player progress.
//!
//! The storage record is a bincode-encoded [`SaveData`]: a format version,
//! the checksum of the snapshot, and the snapshot itself. Exports use JSON
//! so a backup can be inspected by hand; imports go through the same
//! checksum and structure checks as a load.

use std::io::{Read, Write};

use ecoquest_logic::integrity::{compute_checksum, validate_structure, Checksum, IntegrityViolation};
use ecoquest_logic::progress::PlayerProgress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version number for the save format (increment when the format changes)
pub const SAVE_VERSION: u32 = 1;

/// Tag identifying an export file.
pub const EXPORT_FORMAT: &str = "ecoquest-progress";

/// The persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Checksum of `progress` at save time
    pub checksum: Checksum,
    pub progress: PlayerProgress,
}

impl SaveData {
    /// Wrap a snapshot with the current version and a fresh checksum.
    pub fn new(progress: PlayerProgress) -> Self {
        Self {
            version: SAVE_VERSION,
            checksum: compute_checksum(&progress),
            progress,
        }
    }
}

/// Offline backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    pub format: String,
    pub version: u32,
    pub checksum: Checksum,
    pub progress: PlayerProgress,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("Not an EcoQuest export (format {0:?})")]
    UnknownFormat(String),
    #[error("Checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: Checksum, computed: Checksum },
    #[error("Save failed integrity checks ({} violations)", .0.len())]
    Integrity(Vec<IntegrityViolation>),
    #[error("Save belongs to {found:?}, not {expected:?}")]
    PlayerMismatch { expected: String, found: String },
}

/// Encode a snapshot for storage, attaching a fresh checksum.
pub fn encode_save(progress: &PlayerProgress) -> Result<Vec<u8>, SaveError> {
    let mut buffer = Vec::new();
    save_progress(&mut buffer, progress)?;
    Ok(buffer)
}

/// Write a snapshot to any writer.
pub fn save_progress<W: Write>(writer: W, progress: &PlayerProgress) -> Result<(), SaveError> {
    let save_data = SaveData::new(progress.clone());
    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Read and fully validate a snapshot from any reader.
pub fn load_progress<R: Read>(reader: R) -> Result<PlayerProgress, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;
    verify(save_data.version, save_data.checksum, save_data.progress)
}

/// Decode a storage record, reporting why it was rejected.
pub fn decode_save(bytes: &[u8]) -> Result<PlayerProgress, SaveError> {
    load_progress(bytes)
}

/// Decode a storage record; any failure means "no saved progress".
pub fn load_and_validate(bytes: &[u8]) -> Option<PlayerProgress> {
    match decode_save(bytes) {
        Ok(progress) => Some(progress),
        Err(e) => {
            log::warn!("Discarding saved progress: {}", e);
            None
        }
    }
}

/// Serialize a snapshot as a pretty JSON backup.
pub fn export_json(progress: &PlayerProgress) -> Result<String, SaveError> {
    let export = ExportData {
        format: EXPORT_FORMAT.to_string(),
        version: SAVE_VERSION,
        checksum: compute_checksum(progress),
        progress: progress.clone(),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Parse and validate a JSON backup.
pub fn import_json(json: &str) -> Result<PlayerProgress, SaveError> {
    let export: ExportData = serde_json::from_str(json)?;
    if export.format != EXPORT_FORMAT {
        return Err(SaveError::UnknownFormat(export.format));
    }
    verify(export.version, export.checksum, export.progress)
}

fn verify(
    version: u32,
    stored: Checksum,
    progress: PlayerProgress,
) -> Result<PlayerProgress, SaveError> {
    if version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: version,
        });
    }
    let computed = compute_checksum(&progress);
    if computed != stored {
        return Err(SaveError::ChecksumMismatch { stored, computed });
    }
    let violations = validate_structure(&progress);
    if !violations.is_empty() {
        return Err(SaveError::Integrity(violations));
    }
    Ok(progress)
}
