//! Application-level assembly of configuration, loading, editing and
//! saving.
//!
//! A [`Session`] is what a front end drives: it starts the background load,
//! applies the result, routes inserts through the merge policy and saves.
//!
//! ```rust,ignore
//! use tbi_index::{IndexConfig, Resolution, Session};
//!
//! let mut session = Session::new(IndexConfig::in_dir("/srv/tbi"));
//! session.start_load()?;
//! let status = session.wait_load(|event| println!("{event:?}"));
//! session.import("Bulletin No:\tTB-1\n", |_| Resolution::Replace)?;
//! session.save(true)?;
//! ```

use crate::bulletin::Bulletin;
use crate::config::IndexConfig;
use crate::error::{Conflict, SaveError};
use crate::import::import_bulletin;
use crate::index::{BulletinId, BulletinIndex};
use crate::links::{resource_links, ResourceLink};
use crate::loader::{IndexLoader, LoadEvent, LoadHandle, LoadOutcome, LoadStatus};
use crate::merge::{InsertOutcome, Resolution, Supersession};
use crate::saver::{IndexSaver, SaveReport};
use crate::search::SearchQuery;
use crossbeam::channel::TryRecvError;
use std::io;
use tracing::{debug, info};

/// One indexing session over a configured index file.
#[derive(Debug)]
pub struct Session {
    config: IndexConfig,
    index: BulletinIndex,
    pending_load: Option<LoadHandle>,
}

impl Session {
    /// Creates a session with an empty index. Nothing is read until a load
    /// is started.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            index: BulletinIndex::new(),
            pending_load: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Returns the configuration for editing.
    pub fn config_mut(&mut self) -> &mut IndexConfig {
        &mut self.config
    }

    /// Returns the index.
    pub fn index(&self) -> &BulletinIndex {
        &self.index
    }

    /// Returns the index for direct edits.
    pub fn index_mut(&mut self) -> &mut BulletinIndex {
        &mut self.index
    }

    /// Returns true while a background load is pending.
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Loads the index on the calling thread and applies the result.
    pub fn load_blocking(&mut self, on_event: impl FnMut(LoadEvent)) -> LoadStatus {
        let outcome = IndexLoader::from_config(&self.config).load(on_event);
        self.apply_outcome(outcome)
    }

    /// Starts loading the index on the loader thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn start_load(&mut self) -> io::Result<()> {
        let handle = IndexLoader::from_config(&self.config).spawn()?;
        self.pending_load = Some(handle);
        Ok(())
    }

    /// Hands pending load events to `on_event` without blocking.
    ///
    /// Returns the final status once the load has finished and its
    /// bulletins have replaced the index, or `None` while it is running.
    pub fn poll_load(&mut self, mut on_event: impl FnMut(&LoadEvent)) -> Option<LoadStatus> {
        loop {
            let event = match self.pending_load.as_ref()?.try_next() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    // Worker gone without a terminal event.
                    let handle = self.pending_load.take()?;
                    return Some(self.apply_outcome(handle.wait()));
                }
            };
            if let Some(status) = self.dispatch(event, &mut on_event) {
                return Some(status);
            }
        }
    }

    /// Blocks until the pending load finishes, handing every event to
    /// `on_event`.
    ///
    /// Returns `None` if no load was started.
    pub fn wait_load(&mut self, mut on_event: impl FnMut(&LoadEvent)) -> Option<LoadStatus> {
        loop {
            let event = self.pending_load.as_ref()?.events().recv().ok();
            let Some(event) = event else {
                // Worker gone without a terminal event.
                let handle = self.pending_load.take()?;
                return Some(self.apply_outcome(handle.wait()));
            };
            if let Some(status) = self.dispatch(event, &mut on_event) {
                return Some(status);
            }
        }
    }

    fn dispatch(
        &mut self,
        event: LoadEvent,
        on_event: &mut impl FnMut(&LoadEvent),
    ) -> Option<LoadStatus> {
        match event {
            LoadEvent::Finished(outcome) => {
                self.pending_load = None;
                let status = self.apply_outcome(outcome);
                on_event(&LoadEvent::Finished(LoadOutcome {
                    status: status.clone(),
                    bulletins: Vec::new(),
                }));
                Some(status)
            }
            event => {
                on_event(&event);
                None
            }
        }
    }

    /// Replaces the index with a load result.
    ///
    /// Ids issued before the load stay retired. A partial failure marks the index modified so the salvaged records
    /// get written back on the next save.
    pub fn apply_outcome(&mut self, outcome: LoadOutcome) -> LoadStatus {
        let LoadOutcome { status, bulletins } = outcome;
        self.index.replace_loaded(bulletins);
        if let LoadStatus::PartialFailure { records_read } = status {
            debug!("Keeping {} salvaged bulletins as unsaved", records_read);
            self.index.mark_modified();
        }
        status
    }

    /// Inserts a bulletin through the merge policy and records its category.
    ///
    /// # Errors
    ///
    /// Returns the [`Conflict`] if the insert is refused.
    pub fn insert<F>(&mut self, bulletin: Bulletin, decide: F) -> Result<InsertOutcome, Conflict>
    where
        F: FnOnce(&Supersession<'_>) -> Resolution,
    {
        let category = bulletin.category.clone();
        let outcome = self.index.insert(bulletin, decide)?;
        if outcome.inserted().is_some() {
            self.add_category(&category);
        }
        Ok(outcome)
    }

    /// Imports a bulletin from pasted or dropped text.
    ///
    /// # Errors
    ///
    /// Returns the [`Conflict`] if the imported bulletin is refused.
    pub fn import<F>(&mut self, text: &str, decide: F) -> Result<InsertOutcome, Conflict>
    where
        F: FnOnce(&Supersession<'_>) -> Resolution,
    {
        self.insert(import_bulletin(text), decide)
    }

    /// Returns the bulletins matching `text` under the configured options.
    pub fn search(&self, text: &str) -> Vec<BulletinId> {
        self.index
            .search(&SearchQuery::parse(text), &self.config.search)
    }

    /// Returns the download links of a bulletin.
    pub fn links(&self, id: BulletinId) -> Option<Vec<ResourceLink>> {
        self.index
            .get(id)
            .map(|bulletin| resource_links(bulletin, &self.config.links))
    }

    /// Adds a category to the suggest-list. Returns true if it was new.
    pub fn add_category(&mut self, category: &str) -> bool {
        self.config.categories.add(category)
    }

    /// Saves the index, optionally moving the previous file to the backup
    /// path first. The modified flag is cleared only on success.
    ///
    /// # Errors
    ///
    /// Returns the failing save step; see [`IndexSaver::save`].
    pub fn save(&mut self, make_backup: bool) -> Result<SaveReport, SaveError> {
        let report = IndexSaver::from_config(&self.config).save(self.index.bulletins(), make_backup)?;
        self.index.mark_saved();
        info!("Session saved {} bulletins", report.records_written);
        Ok(report)
    }
}
