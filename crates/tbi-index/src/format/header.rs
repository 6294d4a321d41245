//! Container header detection.
//!
//! The first version of the index was not versioned: it started with the
//! record count. Later versions write a zero there, followed by a magic
//! string and a version number. Old readers therefore see an empty file,
//! and this reader can tell every generation apart.

use super::stream::{read_bytes, read_count, read_i32, write_count, write_i32, write_string};
use super::{FormatVersion, CURRENT_VERSION, INDEX_MAGIC};
use crate::error::CodecError;
use std::io::{Read, Write};
use tracing::debug;

/// What the start of an index stream turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexHeader {
    /// Unversioned layout; the discriminant was the record count.
    Legacy {
        /// Number of records that follow.
        count: u32,
    },
    /// A zero discriminant with no readable magic after it.
    ///
    /// Old tools wrote zero-record files this way. A stream too short to
    /// hold the discriminant is reported the same way.
    EmptyLegacy,
    /// Versioned layout of a known generation.
    Versioned {
        /// Format generation.
        version: FormatVersion,
        /// Number of records that follow.
        count: u32,
    },
    /// A string was found where the magic belongs, but it is not the magic.
    InvalidMagic {
        /// The string found.
        found: String,
    },
    /// Valid magic followed by a version this crate does not know.
    TooRecent {
        /// Version found.
        version: i32,
    },
}

impl IndexHeader {
    /// Reads and classifies the header at the start of `reader`.
    ///
    /// On return the reader is positioned at the first record for
    /// [`IndexHeader::Legacy`] and [`IndexHeader::Versioned`].
    ///
    /// # Errors
    ///
    /// Returns an error if the discriminant is negative, if a versioned
    /// header is cut short after its magic, or on I/O errors other than
    /// end of stream.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let discriminant = match read_i32(reader, "header discriminant") {
            Ok(value) => value,
            Err(CodecError::UnexpectedEof { .. }) => {
                debug!("Index shorter than its discriminant, treating as empty legacy file");
                return Ok(Self::EmptyLegacy);
            }
            Err(e) => return Err(e),
        };

        if discriminant != 0 {
            let count = u32::try_from(discriminant).map_err(|_| CodecError::NegativeCount {
                context: "legacy record count",
                count: discriminant,
            })?;
            debug!("Legacy index with {} records", count);
            return Ok(Self::Legacy { count });
        }

        // Any failure while reading the magic means an empty legacy file.
        let magic = match read_bytes(reader, "magic") {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("No magic after zero discriminant ({}), empty legacy file", e);
                return Ok(Self::EmptyLegacy);
            }
        };

        if magic != INDEX_MAGIC.as_bytes() {
            return Ok(Self::InvalidMagic {
                found: String::from_utf8_lossy(&magic).into_owned(),
            });
        }

        let version = read_i32(reader, "version")?;
        match FormatVersion::from_stored(version) {
            Some(version) => {
                let count = read_count(reader, "record count")?;
                debug!("Index version {} with {} records", version, count);
                Ok(Self::Versioned { version, count })
            }
            None => Ok(Self::TooRecent { version }),
        }
    }

    /// Writes a header for the current version announcing `count` records.
    ///
    /// # Errors
    ///
    /// Returns an error if `count` does not fit the count field or writing
    /// fails.
    pub fn write_current<W: Write>(writer: &mut W, count: usize) -> Result<(), CodecError> {
        // Zero first, so readers of the legacy layout see an empty index.
        write_i32(writer, 0)?;
        write_string(writer, INDEX_MAGIC, "magic")?;
        write_i32(writer, CURRENT_VERSION)?;
        write_count(writer, count, "record count")
    }

    /// Returns the record count announced by a readable header.
    pub fn record_count(&self) -> Option<u32> {
        match self {
            Self::Legacy { count } | Self::Versioned { count, .. } => Some(*count),
            Self::EmptyLegacy => Some(0),
            Self::InvalidMagic { .. } | Self::TooRecent { .. } => None,
        }
    }
}
