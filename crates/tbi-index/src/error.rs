//! Error and Result types for index operations.

use crate::index::BulletinId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A convenience `Result` type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised while encoding or decoding the binary index format.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream ended in the middle of a field.
    #[error("Unexpected end of stream while reading {context}")]
    UnexpectedEof {
        /// Field being read when the stream ran out.
        context: &'static str,
    },

    /// A length prefix announced more bytes than the stream still holds.
    #[error("Length prefix of {context} declares {declared} bytes, only {available} remain")]
    LengthOverrun {
        /// Field being read.
        context: &'static str,
        /// Length announced by the prefix.
        declared: u32,
        /// Bytes actually available.
        available: usize,
    },

    /// A signed count field holds a negative value.
    #[error("Negative {context}: {count}")]
    NegativeCount {
        /// Field being read.
        context: &'static str,
        /// Value found.
        count: i32,
    },

    /// A stored day number does not map to a calendar date.
    #[error("Invalid release date: julian day {0}")]
    InvalidDate(i64),

    /// A length or count is too large for its on-disk field.
    #[error("{context} count {count} does not fit the on-disk field")]
    CountOverflow {
        /// Field being written.
        context: &'static str,
        /// Offending count.
        count: usize,
    },

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Numeric result code of a save, as reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SaveStatus {
    /// The index was fully written.
    Success = 0,
    /// The live index could not be moved to the backup path.
    BackupFailed = 1,
    /// Writing the header or a record failed.
    WriteFailed = 2,
    /// The index file could not be opened for writing.
    CouldNotOpenFile = 3,
}

impl SaveStatus {
    /// Returns the status of a finished save attempt.
    pub fn of<T>(result: &std::result::Result<T, SaveError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.status(),
        }
    }
}

/// Errors raised by [`crate::saver::IndexSaver::save`].
///
/// Each variant names the step that failed so the caller can choose
/// between retrying, saving without a backup, or abandoning.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The live index could not be renamed to the backup path.
    #[error("Could not create backup {}: {source}", path.display())]
    BackupFailed {
        /// Backup destination.
        path: PathBuf,
        /// Rename failure.
        #[source]
        source: io::Error,
    },

    /// The index file could not be opened for writing.
    #[error("Could not open {} for writing: {source}", path.display())]
    CouldNotOpenFile {
        /// Index path.
        path: PathBuf,
        /// Open failure.
        #[source]
        source: io::Error,
    },

    /// Writing aborted part way through.
    #[error("Failed to write index after {written} records: {source}")]
    WriteFailed {
        /// Records fully written before the failure.
        written: usize,
        /// Encoding or I/O failure.
        #[source]
        source: CodecError,
    },
}

impl SaveError {
    /// Returns the result code matching this failure.
    pub fn status(&self) -> SaveStatus {
        match self {
            Self::BackupFailed { .. } => SaveStatus::BackupFailed,
            Self::CouldNotOpenFile { .. } => SaveStatus::CouldNotOpenFile,
            Self::WriteFailed { .. } => SaveStatus::WriteFailed,
        }
    }
}

/// An insert refused by the merge policy.
///
/// Conflicts are decisions handed back to the caller, not failures of the
/// index itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// A bulletin with the same number is already indexed.
    #[error("TB {title} already exists in the database")]
    DuplicateNumber {
        /// Conflicting number.
        number: String,
        /// Title of the candidate.
        title: String,
    },

    /// The candidate is superseded by a bulletin already indexed.
    #[error("A new version of TB {title} already exists in the database")]
    NewerVersionExists {
        /// Number of the newer, indexed bulletin.
        number: String,
        /// Title of the newer, indexed bulletin.
        title: String,
    },
}

/// The error type for index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Binary format error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Save failure.
    #[error(transparent)]
    Save(#[from] SaveError),

    /// Insert refused by the merge policy.
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// No bulletin with this identifier is held by the index.
    #[error("Unknown bulletin id: {0}")]
    UnknownBulletin(BulletinId),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
