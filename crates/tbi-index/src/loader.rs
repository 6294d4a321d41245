//! Background index loading.
//!
//! Loading happens on one dedicated worker thread so a caller driving a
//! user interface stays responsive while a large index is decoded.
//!
//! # Architecture
//!
//! ```text
//! open → header detection → record decode loop → Finished(outcome)
//!            │                     │
//!            └─ HeaderParsed        └─ Progress every N records
//! ```
//!
//! The worker owns the file and the decoded bulletins until it finishes,
//! then hands them over inside the terminal [`LoadEvent::Finished`] event.
//! Events arrive in emission order: `Started`, then `HeaderParsed`, then
//! `Progress` events, then exactly one `Finished`. A file that cannot be
//! opened, is not a regular file, has a foreign magic or an unknown
//! version skips straight from `Started` to `Finished`.
//!
//! # Example
//!
//! ```rust,ignore
//! use tbi_index::loader::{IndexLoader, LoadEvent};
//!
//! let handle = IndexLoader::new("index.tbi").spawn()?;
//! for event in handle.events() {
//!     match event {
//!         LoadEvent::Progress { records_read } => println!("{records_read} read"),
//!         LoadEvent::Finished(outcome) => break,
//!         _ => {}
//!     }
//! }
//! ```

use crate::bulletin::Bulletin;
use crate::config::IndexConfig;
use crate::error::CodecError;
use crate::format::{FormatVersion, IndexHeader};
use crossbeam::channel::{self, Receiver, TryRecvError};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// Default number of records between two progress events.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Upper bound for the record vector sized from an untrusted header.
const MAX_PREALLOC_RECORDS: usize = 16 * 1024;

/// Name of the loader worker thread.
const LOADER_THREAD_NAME: &str = "tbi-index-loader";

/// Terminal state of one load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No index file exists yet. This is the normal first-run case.
    NoIndexFound,
    /// The file exists but could not be opened.
    OpenFailed {
        /// Kind of the open failure.
        kind: io::ErrorKind,
        /// Human readable description.
        message: String,
    },
    /// Every announced record was decoded.
    Success {
        /// Number of records decoded.
        count: usize,
    },
    /// The file is versioned but carries a foreign magic string.
    InvalidMagic {
        /// The string found in place of the magic.
        found: String,
    },
    /// The file was written by a newer version of the format.
    TooRecent {
        /// Version found.
        version: i32,
    },
    /// Decoding stopped early; the records before the failure were kept.
    PartialFailure {
        /// Records decoded before the failure.
        records_read: usize,
    },
}

impl LoadStatus {
    /// Returns true if the load ended with every record available.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::NoIndexFound | Self::Success { .. })
    }
}

/// Result of a load: a status and the bulletins decoded, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Terminal state.
    pub status: LoadStatus,
    /// Decoded bulletins. Empty unless the status is `Success` or
    /// `PartialFailure`.
    pub bulletins: Vec<Bulletin>,
}

impl LoadOutcome {
    fn empty(status: LoadStatus) -> Self {
        Self {
            status,
            bulletins: Vec::new(),
        }
    }
}

/// Notification emitted while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// The load attempt started.
    Started {
        /// Index path.
        path: PathBuf,
    },
    /// The header was read.
    HeaderParsed {
        /// Format generation.
        version: FormatVersion,
        /// Records announced by the header.
        count: u32,
    },
    /// Progress side channel; `records_read` records are decoded so far.
    Progress {
        /// Records decoded so far.
        records_read: usize,
    },
    /// The load reached a terminal state. Always the last event.
    Finished(LoadOutcome),
}

/// Decodes an index from any reader.
///
/// Emits [`LoadEvent::HeaderParsed`] and [`LoadEvent::Progress`] through
/// `on_event`; the caller is responsible for `Started` and `Finished`.
/// `HeaderParsed` is only emitted for a readable generation: an invalid
/// magic or an unknown version ends the load without it, and the version
/// found is carried by the terminal status instead.
/// Progress is emitted before records `0, interval, 2 * interval, ...`;
/// an interval of 0 disables it.
pub fn read_index<R: Read>(
    reader: &mut R,
    progress_interval: usize,
    on_event: &mut dyn FnMut(LoadEvent),
) -> LoadOutcome {
    let header = match IndexHeader::read_from(reader) {
        Ok(header) => header,
        Err(e) => {
            warn!("Unreadable index header: {}", e);
            return LoadOutcome::empty(LoadStatus::PartialFailure { records_read: 0 });
        }
    };

    let (version, count) = match header {
        IndexHeader::Legacy { count } => (FormatVersion::Legacy, count),
        IndexHeader::Versioned { version, count } => (version, count),
        IndexHeader::EmptyLegacy => {
            debug!("Empty legacy index");
            return LoadOutcome::empty(LoadStatus::Success { count: 0 });
        }
        IndexHeader::InvalidMagic { found } => {
            warn!("Invalid index identifier: {:?}", found);
            return LoadOutcome::empty(LoadStatus::InvalidMagic { found });
        }
        IndexHeader::TooRecent { version } => {
            warn!("Index version {} is too recent", version);
            return LoadOutcome::empty(LoadStatus::TooRecent { version });
        }
    };

    on_event(LoadEvent::HeaderParsed { version, count });

    // Every known generation shares the record layout.
    let (bulletins, failure) = read_records(reader, count as usize, progress_interval, on_event);
    match failure {
        None => LoadOutcome {
            status: LoadStatus::Success {
                count: bulletins.len(),
            },
            bulletins,
        },
        Some(e) => {
            warn!(
                "Index reading failed after {} of {} records: {}",
                bulletins.len(),
                count,
                e
            );
            LoadOutcome {
                status: LoadStatus::PartialFailure {
                    records_read: bulletins.len(),
                },
                bulletins,
            }
        }
    }
}

/// Reads up to `count` records, stopping at the first decode failure.
fn read_records<R: Read>(
    reader: &mut R,
    count: usize,
    progress_interval: usize,
    on_event: &mut dyn FnMut(LoadEvent),
) -> (Vec<Bulletin>, Option<CodecError>) {
    let mut bulletins = Vec::with_capacity(count.min(MAX_PREALLOC_RECORDS));

    for i in 0..count {
        if progress_interval != 0 && i % progress_interval == 0 {
            on_event(LoadEvent::Progress { records_read: i });
        }

        match Bulletin::read_from(reader) {
            Ok(bulletin) => bulletins.push(bulletin),
            Err(e) => return (bulletins, Some(e)),
        }
    }

    (bulletins, None)
}

/// Loads the index file named by its configuration.
#[derive(Debug, Clone)]
pub struct IndexLoader {
    path: PathBuf,
    progress_interval: usize,
}

impl IndexLoader {
    /// Creates a loader for `path` with the default progress interval.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Creates a loader from the session configuration.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(&config.index_path).with_progress_interval(config.progress_interval)
    }

    /// Sets the number of records between progress events (0 disables them).
    pub fn with_progress_interval(mut self, progress_interval: usize) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    /// Returns the index path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the index on the calling thread.
    ///
    /// Emits `Started`, `HeaderParsed` and `Progress` events through
    /// `on_event` and returns the outcome instead of a `Finished` event.
    pub fn load(&self, mut on_event: impl FnMut(LoadEvent)) -> LoadOutcome {
        on_event(LoadEvent::Started {
            path: self.path.clone(),
        });

        let file = match self.open() {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No index found at {}", self.path.display());
                return LoadOutcome::empty(LoadStatus::NoIndexFound);
            }
            Err(e) => {
                warn!("Failed to open index {}: {}", self.path.display(), e);
                return LoadOutcome::empty(LoadStatus::OpenFailed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        };

        let mut reader = BufReader::new(file);
        let outcome = read_index(&mut reader, self.progress_interval, &mut on_event);
        info!(
            "Index {} loaded: {:?}",
            self.path.display(),
            outcome.status
        );
        outcome
    }

    /// Opens the index, rejecting anything that is not a regular file.
    ///
    /// Some platforms open directories successfully and only fail on the
    /// first read.
    fn open(&self) -> io::Result<File> {
        let file = File::open(&self.path)?;
        if !file.metadata()?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", self.path.display()),
            ));
        }
        Ok(file)
    }

    /// Starts loading on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<LoadHandle> {
        let (tx, rx) = channel::unbounded();
        let join = thread::Builder::new()
            .name(LOADER_THREAD_NAME.to_string())
            .spawn(move || {
                // A dropped receiver means nobody waits for the result.
                let outcome = self.load(|event| {
                    let _ = tx.send(event);
                });
                let _ = tx.send(LoadEvent::Finished(outcome));
            })?;

        Ok(LoadHandle { events: rx, join })
    }
}

/// Receiving end of a background load.
#[derive(Debug)]
pub struct LoadHandle {
    events: Receiver<LoadEvent>,
    join: thread::JoinHandle<()>,
}

impl LoadHandle {
    #[cfg(test)]
    pub(crate) fn from_parts(events: Receiver<LoadEvent>, join: thread::JoinHandle<()>) -> Self {
        Self { events, join }
    }

    /// Returns the event channel. Iterating it blocks until the next event.
    pub fn events(&self) -> &Receiver<LoadEvent> {
        &self.events
    }

    /// Returns the next pending event without blocking.
    ///
    /// `Disconnected` means the worker is gone and every event it sent has
    /// been received.
    pub fn try_next(&self) -> Result<LoadEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Returns true once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Blocks until the load finishes and returns its outcome.
    ///
    /// Events not yet received are discarded. A panic on the worker thread
    /// is resumed on the calling thread.
    pub fn wait(self) -> LoadOutcome {
        for event in self.events.iter() {
            if let LoadEvent::Finished(outcome) = event {
                // The worker returns right after sending.
                let _ = self.join.join();
                return outcome;
            }
        }

        match self.join.join() {
            Err(payload) => std::panic::resume_unwind(payload),
            Ok(()) => LoadOutcome::empty(LoadStatus::OpenFailed {
                kind: io::ErrorKind::Other,
                message: "loader finished without a result".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IndexHeader;
    use std::io::Cursor;

    fn encode_versioned(bulletins: &[Bulletin]) -> Vec<u8> {
        let mut buf = Vec::new();
        IndexHeader::write_current(&mut buf, bulletins.len()).unwrap();
        for tb in bulletins {
            tb.write_to(&mut buf).unwrap();
        }
        buf
    }

    fn numbered(n: usize) -> Vec<Bulletin> {
        (0..n)
            .map(|i| Bulletin::new(format!("TB-{}", i), format!("Bulletin {}", i)))
            .collect()
    }

    fn collect(bytes: Vec<u8>, interval: usize) -> (LoadOutcome, Vec<LoadEvent>) {
        let mut events = Vec::new();
        let outcome = read_index(&mut Cursor::new(bytes), interval, &mut |e| events.push(e));
        (outcome, events)
    }

    #[test]
    fn test_versioned_success() {
        let bulletins = numbered(3);
        let (outcome, events) = collect(encode_versioned(&bulletins), 100);
        assert_eq!(outcome.status, LoadStatus::Success { count: 3 });
        assert_eq!(outcome.bulletins, bulletins);
        assert_eq!(
            events[0],
            LoadEvent::HeaderParsed {
                version: FormatVersion::V1,
                count: 3
            }
        );
    }

    #[test]
    fn test_progress_cadence() {
        let (outcome, events) = collect(encode_versioned(&numbered(250)), 100);
        assert_eq!(outcome.status, LoadStatus::Success { count: 250 });
        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                LoadEvent::Progress { records_read } => Some(*records_read),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![0, 100, 200]);
    }

    #[test]
    fn test_progress_disabled() {
        let (_, events) = collect(encode_versioned(&numbered(10)), 0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_truncated_header_is_partial_failure() {
        let mut bytes = encode_versioned(&[]);
        bytes.truncate(bytes.len() - 2);
        let (outcome, events) = collect(bytes, 100);
        assert_eq!(
            outcome.status,
            LoadStatus::PartialFailure { records_read: 0 }
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        let mut bytes = 0x7FFF_FFFFi32.to_be_bytes().to_vec();
        bytes.extend(Bulletin::new("TB-1", "One").to_bytes().unwrap());
        let (outcome, _) = collect(bytes, 0);
        assert_eq!(
            outcome.status,
            LoadStatus::PartialFailure { records_read: 1 }
        );
    }

    #[test]
    fn test_directory_is_open_failure() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut events = Vec::new();
        let outcome = IndexLoader::new(temp_dir.path()).load(|e| events.push(e));
        assert!(matches!(
            outcome.status,
            LoadStatus::OpenFailed {
                kind: io::ErrorKind::InvalidInput,
                ..
            }
        ));
        assert!(outcome.bulletins.is_empty());
        assert!(!events
            .iter()
            .any(|e| matches!(e, LoadEvent::HeaderParsed { .. })));
    }

    #[test]
    fn test_wait_without_result_reports_failure() {
        let (tx, rx) = channel::unbounded::<LoadEvent>();
        let join = thread::spawn(move || drop(tx));
        let outcome = LoadHandle::from_parts(rx, join).wait();
        assert!(matches!(outcome.status, LoadStatus::OpenFailed { .. }));
    }

    #[test]
    fn test_is_success() {
        assert!(LoadStatus::NoIndexFound.is_success());
        assert!(LoadStatus::Success { count: 1 }.is_success());
        assert!(!LoadStatus::TooRecent { version: 2 }.is_success());
        assert!(!LoadStatus::PartialFailure { records_read: 1 }.is_success());
    }
}
