//! Index persistence.
//!
//! Saving always writes the current format version. With a backup
//! requested, the live file is first renamed to the backup path and the new
//! file is then written in its place:
//!
//! ```text
//! remove old backup → rename index → backup → create index → header → records → fsync
//! ```
//!
//! A crash between the rename and the final fsync leaves no live index; the
//! previous contents survive under the backup name only.

use crate::bulletin::Bulletin;
use crate::config::IndexConfig;
use crate::error::{CodecError, SaveError};
use crate::format::IndexHeader;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Number of records written.
    pub records_written: usize,
    /// Where the previous index was moved, if a backup was made.
    pub backup: Option<PathBuf>,
}

/// Writes a current-version index, header then records, to `writer`.
///
/// Returns the number of records written.
///
/// # Errors
///
/// Returns [`SaveError::WriteFailed`] at the first header or record that
/// cannot be written; nothing after it is attempted.
pub fn write_index<'a, W, I>(writer: &mut W, bulletins: I) -> Result<usize, SaveError>
where
    W: Write,
    I: IntoIterator<Item = &'a Bulletin>,
    I::IntoIter: ExactSizeIterator,
{
    let bulletins = bulletins.into_iter();
    IndexHeader::write_current(writer, bulletins.len())
        .map_err(|source| SaveError::WriteFailed { written: 0, source })?;

    let mut written = 0;
    for bulletin in bulletins {
        bulletin
            .write_to(writer)
            .map_err(|source| SaveError::WriteFailed { written, source })?;
        written += 1;
    }
    Ok(written)
}

/// Saves bulletins to the index file. Stateless: the caller owns the
/// modified flag.
#[derive(Debug, Clone)]
pub struct IndexSaver {
    index_path: PathBuf,
    backup_path: PathBuf,
}

impl IndexSaver {
    /// Creates a saver writing `index_path` and backing up to `backup_path`.
    pub fn new(index_path: impl AsRef<Path>, backup_path: impl AsRef<Path>) -> Self {
        Self {
            index_path: index_path.as_ref().to_path_buf(),
            backup_path: backup_path.as_ref().to_path_buf(),
        }
    }

    /// Creates a saver from the session configuration.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(&config.index_path, &config.backup_path)
    }

    /// Returns the index path.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Returns the backup path.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Saves `bulletins` in sequence order.
    ///
    /// # Arguments
    ///
    /// * `bulletins` - Records to persist, in display order
    /// * `make_backup` - Move the current index to the backup path first
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The backup rename fails (`BackupFailed`); nothing was written and
    ///   the caller may retry without a backup
    /// - The index cannot be created (`CouldNotOpenFile`)
    /// - A write, flush or sync fails (`WriteFailed`)
    pub fn save<'a, I>(&self, bulletins: I, make_backup: bool) -> Result<SaveReport, SaveError>
    where
        I: IntoIterator<Item = &'a Bulletin>,
        I::IntoIter: ExactSizeIterator,
    {
        let backup = if make_backup { self.backup()? } else { None };

        let file = File::create(&self.index_path).map_err(|source| {
            warn!("Couldn't open {}: {}", self.index_path.display(), source);
            SaveError::CouldNotOpenFile {
                path: self.index_path.clone(),
                source,
            }
        })?;

        let mut writer = BufWriter::new(file);
        let records_written = write_index(&mut writer, bulletins).map_err(|e| {
            warn!("Failed to save {}: {}", self.index_path.display(), e);
            e
        })?;

        let sync_failed = |source: io::Error| SaveError::WriteFailed {
            written: records_written,
            source: CodecError::Io(source),
        };
        writer.flush().map_err(sync_failed)?;
        let file = writer
            .into_inner()
            .map_err(|e| sync_failed(e.into_error()))?;
        file.sync_all().map_err(sync_failed)?;

        info!(
            "Saved {} bulletins to {}",
            records_written,
            self.index_path.display()
        );
        Ok(SaveReport {
            records_written,
            backup,
        })
    }

    /// Moves the live index to the backup path.
    ///
    /// Returns `None` when there is no live index to back up.
    fn backup(&self) -> Result<Option<PathBuf>, SaveError> {
        if let Ok(false) = self.index_path.try_exists() {
            debug!(
                "No index at {}, nothing to back up",
                self.index_path.display()
            );
            return Ok(None);
        }

        // rename() does not replace an existing file on every platform.
        match fs::remove_file(&self.backup_path) {
            Ok(()) => debug!("Removed previous backup {}", self.backup_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!(
                "Could not remove previous backup {}: {}",
                self.backup_path.display(),
                e
            ),
        }

        fs::rename(&self.index_path, &self.backup_path).map_err(|source| {
            warn!(
                "Couldn't create backup {}: {}",
                self.backup_path.display(),
                source
            );
            SaveError::BackupFailed {
                path: self.backup_path.clone(),
                source,
            }
        })?;

        debug!(
            "Backed up {} to {}",
            self.index_path.display(),
            self.backup_path.display()
        );
        Ok(Some(self.backup_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SaveStatus;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Writer failing after a byte budget is spent.
    struct FailingWriter {
        budget: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_index_layout() {
        let bulletins = vec![Bulletin::new("TB-1", "One"), Bulletin::new("TB-2", "Two")];
        let mut buf = Vec::new();
        assert_eq!(write_index(&mut buf, &bulletins).unwrap(), 2);

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            IndexHeader::read_from(&mut cursor).unwrap().record_count(),
            Some(2)
        );
        assert_eq!(Bulletin::read_from(&mut cursor).unwrap(), bulletins[0]);
        assert_eq!(Bulletin::read_from(&mut cursor).unwrap(), bulletins[1]);
    }

    #[test]
    fn test_write_failure_reports_progress() {
        let bulletins = vec![Bulletin::new("TB-1", "One"), Bulletin::new("TB-2", "Two")];
        let mut header = Vec::new();
        IndexHeader::write_current(&mut header, 2).unwrap();
        let first_len = bulletins[0].to_bytes().unwrap().len();

        let mut writer = FailingWriter {
            budget: header.len() + first_len + 3,
        };
        let err = write_index(&mut writer, &bulletins).unwrap_err();
        assert!(matches!(err, SaveError::WriteFailed { written: 1, .. }));
        assert_eq!(err.status(), SaveStatus::WriteFailed);
    }

    #[test]
    fn test_save_without_existing_index_skips_backup() {
        let dir = TempDir::new().unwrap();
        let saver = IndexSaver::new(dir.path().join("index.tbi"), dir.path().join("index.bak"));

        let report = saver.save(&[Bulletin::new("TB-1", "One")], true).unwrap();
        assert_eq!(report.records_written, 1);
        assert_eq!(report.backup, None);
        assert!(!saver.backup_path().exists());
    }

    #[test]
    fn test_save_into_missing_directory_cannot_open() {
        let dir = TempDir::new().unwrap();
        let saver = IndexSaver::new(
            dir.path().join("missing").join("index.tbi"),
            dir.path().join("index.bak"),
        );
        let result = saver.save(&[], false);
        assert_eq!(SaveStatus::of(&result), SaveStatus::CouldNotOpenFile);
    }
}
