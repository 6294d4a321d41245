//! TBI - Technical Bulletin Indexer storage core
//!
//! This crate keeps a catalogue of Technical Bulletins in a single binary
//! index file and provides everything needed around it.
//!
//! # Components
//!
//! - [`Bulletin`]: the catalogued record
//! - [`format`]: versioned, backward-compatible binary codec
//! - [`IndexLoader`]: background loader reporting progress over a channel
//! - [`IndexSaver`]: writer with optional backup of the previous file
//! - [`BulletinIndex`]: in-memory collection with the merge policy of
//!   [`merge`] applied on insert
//! - [`search`], [`import`], [`links`]: keyword search, text interchange and
//!   download links
//! - [`Session`]: assembly of all of the above around an [`IndexConfig`]
//!
//! # Example
//!
//! ```rust,ignore
//! use tbi_index::{Bulletin, IndexConfig, Resolution, Session};
//!
//! let mut session = Session::new(IndexConfig::in_dir("/srv/tbi"));
//! session.load_blocking(|_| {});
//!
//! let tb = Bulletin::new("TB-101", "Pump seal, new design")
//!     .replacing("TB-100")
//!     .with_keywords(["pump", "seal"]);
//! session.insert(tb, |_| Resolution::ReplaceAndMergeKeywords)?;
//!
//! for id in session.search("seal") {
//!     println!("{}", session.index().get(id).unwrap().title);
//! }
//! session.save(true)?;
//! ```

#![deny(missing_docs)]

pub mod bulletin;
pub mod config;
pub mod error;
pub mod format;
pub mod import;
pub mod index;
pub mod links;
pub mod loader;
pub mod merge;
pub mod saver;
pub mod search;
pub mod session;

pub use bulletin::Bulletin;
pub use config::{CategoryList, IndexConfig};
pub use error::{CodecError, Conflict, IndexError, Result, SaveError, SaveStatus};
pub use format::{FormatVersion, IndexHeader};
pub use index::{BulletinId, BulletinIndex};
pub use loader::{IndexLoader, LoadEvent, LoadHandle, LoadOutcome, LoadStatus};
pub use merge::{InsertOutcome, MergePlan, Resolution, Supersession};
pub use saver::{IndexSaver, SaveReport};
pub use search::{SearchFields, SearchOptions, SearchQuery};
pub use session::Session;
