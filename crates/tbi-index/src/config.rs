//! Session configuration.
//!
//! An [`IndexConfig`] is built once by the application and handed to the
//! loader, the saver and the session. It can be read from a TOML document
//! where every key is optional:
//!
//! ```toml
//! index_path = "/srv/tbi/index.tbi"
//! backup_path = "/srv/tbi/index.bak"
//! progress_interval = 250
//! categories = ["Electrical", "Mechanical"]
//!
//! [search]
//! whole_words_only = true
//!
//! [search.fields]
//! comment = true
//!
//! [links]
//! technical_bulletin = "https://example.com/tb/%1"
//! ```

use crate::error::Result;
use crate::format::{BACKUP_FILENAME, INDEX_FILENAME};
use crate::links::LinkTemplates;
use crate::loader::DEFAULT_PROGRESS_INTERVAL;
use crate::search::SearchOptions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of one indexing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Live index file.
    pub index_path: PathBuf,
    /// Backup written before each save.
    pub backup_path: PathBuf,
    /// Records between two load progress events; 0 disables them.
    pub progress_interval: usize,
    /// Search behaviour.
    pub search: SearchOptions,
    /// Download link templates.
    pub links: LinkTemplates,
    /// Category suggest-list.
    pub categories: CategoryList,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(INDEX_FILENAME),
            backup_path: PathBuf::from(BACKUP_FILENAME),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            search: SearchOptions::default(),
            links: LinkTemplates::default(),
            categories: CategoryList::default(),
        }
    }
}

impl IndexConfig {
    /// Default configuration with the index and its backup in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            index_path: dir.join(INDEX_FILENAME),
            backup_path: dir.join(BACKUP_FILENAME),
            ..Self::default()
        }
    }

    /// Parses a TOML document. Missing keys take their default.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IndexError::Config`] if the document is not valid
    /// TOML or a key has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Category suggest-list, unique and sorted ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryList {
    categories: Vec<String>,
}

impl CategoryList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `category` unless an entry equal ignoring case exists.
    ///
    /// Returns true if the list changed. Blank categories are ignored.
    pub fn add(&mut self, category: &str) -> bool {
        let category = category.trim();
        if category.is_empty() {
            return false;
        }
        match self
            .categories
            .binary_search_by(|probe| compare_ignore_case(probe, category))
        {
            Ok(_) => false,
            Err(position) => {
                self.categories.insert(position, category.to_owned());
                true
            }
        }
    }

    /// Returns true if a category equal ignoring case is listed.
    pub fn contains(&self, category: &str) -> bool {
        self.categories
            .binary_search_by(|probe| compare_ignore_case(probe, category.trim()))
            .is_ok()
    }

    /// Removes every category.
    pub fn clear(&mut self) {
        self.categories.clear();
    }

    /// Returns the number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Iterates in display order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for CategoryList {
    fn from(categories: Vec<String>) -> Self {
        let mut list = Self::new();
        for category in &categories {
            list.add(category);
        }
        list
    }
}

impl From<CategoryList> for Vec<String> {
    fn from(list: CategoryList) -> Self {
        list.categories
    }
}

fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
