//! Index file format.
//!
//! This module provides the binary layout of `index.tbi` files: primitive
//! field encodings, header detection across format generations, and the
//! per-bulletin record encoding.
//!
//! ## File Structure
//!
//! All integers are big-endian.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Discriminant: i32                                           │
//! │  - != 0: legacy file, the value is the record count          │
//! │  - == 0: versioned file, header continues below              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Versioned header (discriminant == 0 only)                   │
//! │  - Magic: string "TBI_DB_BY_MARTIAL_DEMOLINS"                │
//! │  - Version: i32 = 1                                          │
//! │  - Count: i32                                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Records (repeated `count` times)                            │
//! │  - number, title, category, rebuilding kit, tech pub,        │
//! │    comment: string                                           │
//! │  - release date: i64 julian day (i64::MIN = no date)         │
//! │  - registered by, replaces, replaced by: string              │
//! │  - keywords: u32 count + string × count                      │
//! └─────────────────────────────────────────────────────────────┘
//!
//! string = u32 byte length (0xFFFF_FFFF = null) + UTF-8 bytes
//! ```

pub mod header;
pub mod record;
pub(crate) mod stream;

pub use header::IndexHeader;

/// Magic string identifying a versioned index.
pub const INDEX_MAGIC: &str = "TBI_DB_BY_MARTIAL_DEMOLINS";

/// Version written by this crate.
pub const CURRENT_VERSION: i32 = 1;

/// Default index file name.
pub const INDEX_FILENAME: &str = "index.tbi";

/// Default backup file name.
pub const BACKUP_FILENAME: &str = "index.bak";

/// Index format generations this crate can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    /// Unversioned layout, identified by a nonzero leading count.
    Legacy,
    /// Versioned layout 1.
    V1,
}

impl FormatVersion {
    /// Returns the numeric version; legacy files report 0.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Legacy => 0,
            Self::V1 => 1,
        }
    }

    /// Maps a stored version number to a known generation.
    ///
    /// Only versioned generations are returned; 0 is never stored in a
    /// versioned header.
    pub fn from_stored(version: i32) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::V1 => write!(f, "v1"),
        }
    }
}
