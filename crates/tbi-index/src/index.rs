//! The in-memory bulletin collection.

use crate::bulletin::Bulletin;
use crate::error::{Conflict, IndexError, Result};
use crate::merge::{merge_keywords, plan_insert, InsertOutcome, MergePlan, Resolution, Supersession};
use crate::search::{SearchOptions, SearchQuery};
use std::fmt;
use tracing::debug;

/// Stable handle to a bulletin held by a [`BulletinIndex`].
///
/// Identifiers are assigned in increasing order and never reused by the
/// same index, so a handle held by a view stays valid or becomes unknown;
/// it never points at another bulletin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BulletinId(u64);

impl BulletinId {
    /// Returns the raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BulletinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: BulletinId,
    bulletin: Bulletin,
}

/// Ordered bulletin collection with a modified flag.
///
/// Sequence order is display and save order.
#[derive(Debug, Clone, Default)]
pub struct BulletinIndex {
    entries: Vec<Entry>,
    next_id: u64,
    modified: bool,
}

impl BulletinIndex {
    /// Creates an empty, unmodified index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unmodified index holding loaded bulletins in file order.
    pub fn from_loaded(bulletins: Vec<Bulletin>) -> Self {
        let mut index = Self::new();
        index.entries.reserve(bulletins.len());
        for bulletin in bulletins {
            index.push_entry(bulletin);
        }
        index
    }

    /// Replaces every bulletin with loaded ones and clears the modified flag.
    ///
    /// Ids keep counting from where they were, so an id handed out before
    /// the reload never resolves to a loaded bulletin.
    pub fn replace_loaded(&mut self, bulletins: Vec<Bulletin>) {
        self.entries.clear();
        self.entries.reserve(bulletins.len());
        for bulletin in bulletins {
            self.push_entry(bulletin);
        }
        self.modified = false;
    }

    /// Returns the number of bulletins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no bulletin.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `candidate` according to the merge policy.
    ///
    /// `decide` is called only when the candidate supersedes an indexed
    /// bulletin, and picks what happens to it.
    ///
    /// # Errors
    ///
    /// Returns the [`Conflict`] when the insert is refused; the index is
    /// left unchanged.
    pub fn insert<F>(
        &mut self,
        mut candidate: Bulletin,
        decide: F,
    ) -> std::result::Result<InsertOutcome, Conflict>
    where
        F: FnOnce(&Supersession<'_>) -> Resolution,
    {
        match plan_insert(self.bulletins(), &candidate) {
            MergePlan::Reject(conflict) => {
                debug!("Insert of {} refused: {}", candidate.number, conflict);
                Err(conflict)
            }
            MergePlan::Append => Ok(InsertOutcome::Appended(self.push_unchecked(candidate))),
            MergePlan::Supersede { position } => {
                let existing = &self.entries[position].bulletin;
                let resolution = decide(&Supersession {
                    existing,
                    candidate: &candidate,
                });
                match resolution {
                    Resolution::Cancel => return Ok(InsertOutcome::Cancelled),
                    Resolution::ReplaceAndMergeKeywords => {
                        candidate.keywords = merge_keywords(&candidate.keywords, &existing.keywords);
                    }
                    Resolution::Replace => {}
                }

                let removed = self.entries.remove(position).bulletin;
                debug!("{} supersedes {}", candidate.number, removed.number);
                let id = self.push_unchecked(candidate);
                Ok(InsertOutcome::Replaced { id, removed })
            }
        }
    }

    /// Appends a bulletin without any merge check.
    pub fn push_unchecked(&mut self, bulletin: Bulletin) -> BulletinId {
        self.modified = true;
        self.push_entry(bulletin)
    }

    /// Replaces the bulletin behind `id`, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::UnknownBulletin`] if `id` is not held.
    pub fn update(&mut self, id: BulletinId, bulletin: Bulletin) -> Result<()> {
        let position = self.position(id).ok_or(IndexError::UnknownBulletin(id))?;
        self.entries[position].bulletin = bulletin;
        self.modified = true;
        Ok(())
    }

    /// Removes and returns the bulletin behind `id`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::UnknownBulletin`] if `id` is not held.
    pub fn remove(&mut self, id: BulletinId) -> Result<Bulletin> {
        let position = self.position(id).ok_or(IndexError::UnknownBulletin(id))?;
        self.modified = true;
        Ok(self.entries.remove(position).bulletin)
    }

    /// Returns the bulletin behind `id`.
    pub fn get(&self, id: BulletinId) -> Option<&Bulletin> {
        self.position(id).map(|position| &self.entries[position].bulletin)
    }

    /// Returns the sequence position of `id`.
    pub fn position(&self, id: BulletinId) -> Option<usize> {
        // Ids grow with insertion order, and removals keep relative order.
        self.entries.binary_search_by_key(&id, |entry| entry.id).ok()
    }

    /// Iterates over identifiers and bulletins in sequence order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (BulletinId, &Bulletin)> {
        self.entries.iter().map(|entry| (entry.id, &entry.bulletin))
    }

    /// Iterates over bulletins in sequence order.
    pub fn bulletins(&self) -> impl ExactSizeIterator<Item = &Bulletin> {
        self.entries.iter().map(|entry| &entry.bulletin)
    }

    /// Returns the identifiers of bulletins matching `query`, in order.
    pub fn search(&self, query: &SearchQuery, options: &SearchOptions) -> Vec<BulletinId> {
        self.iter()
            .filter(|(_, bulletin)| query.matches(bulletin, options))
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns true if the index changed since it was loaded or saved.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Flags the index as changed.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Clears the modified flag after a successful save.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    fn push_entry(&mut self, bulletin: Bulletin) -> BulletinId {
        let id = BulletinId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, bulletin });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &Supersession<'_>) -> Resolution {
        panic!("unexpected supersession choice-point")
    }

    fn numbers(index: &BulletinIndex) -> Vec<&str> {
        index.bulletins().map(|b| b.number.as_str()).collect()
    }

    #[test]
    fn test_loaded_index_is_unmodified() {
        let index = BulletinIndex::from_loaded(vec![Bulletin::new("TB-1", "One")]);
        assert_eq!(index.len(), 1);
        assert!(!index.is_modified());
    }

    #[test]
    fn test_reload_never_reuses_ids() {
        let mut index = BulletinIndex::from_loaded(vec![Bulletin::new("TB-1", "One")]);
        let (old, _) = index.iter().next().unwrap();
        index.insert(Bulletin::new("TB-2", "Two"), never).unwrap();

        index.replace_loaded(vec![
            Bulletin::new("TB-9", "Nine"),
            Bulletin::new("TB-8", "Eight"),
        ]);
        assert!(!index.is_modified());
        assert_eq!(numbers(&index), vec!["TB-9", "TB-8"]);
        assert!(index.get(old).is_none());
        assert!(index.iter().all(|(id, _)| id.get() > 1));
    }

    #[test]
    fn test_insert_appends_and_marks_modified() {
        let mut index = BulletinIndex::from_loaded(vec![Bulletin::new("TB-1", "One")]);
        let outcome = index.insert(Bulletin::new("TB-2", "Two"), never).unwrap();
        let id = outcome.inserted().unwrap();
        assert_eq!(index.position(id), Some(1));
        assert!(index.is_modified());
    }

    #[test]
    fn test_duplicate_leaves_index_unchanged() {
        let mut index = BulletinIndex::from_loaded(vec![Bulletin::new("TB-100", "A")]);
        let err = index.insert(Bulletin::new("TB-100", "B"), never).unwrap_err();
        assert!(matches!(err, Conflict::DuplicateNumber { .. }));
        assert_eq!(numbers(&index), vec!["TB-100"]);
        assert!(!index.is_modified());
    }

    #[test]
    fn test_replace_moves_candidate_to_end() {
        let mut index = BulletinIndex::from_loaded(vec![
            Bulletin::new("TB-1", "Old"),
            Bulletin::new("TB-2", "Other"),
        ]);
        let candidate = Bulletin::new("TB-3", "New")
            .replacing("TB-1")
            .with_keywords(["valve"]);
        let outcome = index.insert(candidate, |_| Resolution::Replace).unwrap();

        match outcome {
            InsertOutcome::Replaced { removed, .. } => assert_eq!(removed.number, "TB-1"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(numbers(&index), vec!["TB-2", "TB-3"]);
        assert_eq!(index.bulletins().last().unwrap().keywords, vec!["valve"]);
    }

    #[test]
    fn test_cancel_keeps_index() {
        let mut index = BulletinIndex::from_loaded(vec![Bulletin::new("TB-1", "Old")]);
        let candidate = Bulletin::new("TB-3", "New").replacing("TB-1");
        let outcome = index
            .insert(candidate, |choice| {
                assert_eq!(choice.existing.number, "TB-1");
                assert_eq!(choice.candidate.number, "TB-3");
                Resolution::Cancel
            })
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Cancelled);
        assert_eq!(numbers(&index), vec!["TB-1"]);
        assert!(!index.is_modified());
    }

    #[test]
    fn test_ids_survive_removal() {
        let mut index = BulletinIndex::new();
        let a = index.push_unchecked(Bulletin::new("A", ""));
        let b = index.push_unchecked(Bulletin::new("B", ""));
        let c = index.push_unchecked(Bulletin::new("C", ""));

        assert_eq!(index.remove(b).unwrap().number, "B");
        assert_eq!(index.get(a).unwrap().number, "A");
        assert_eq!(index.get(c).unwrap().number, "C");
        assert_eq!(index.position(c), Some(1));
        assert!(index.get(b).is_none());
        assert!(matches!(index.remove(b), Err(IndexError::UnknownBulletin(id)) if id == b));

        let d = index.push_unchecked(Bulletin::new("D", ""));
        assert!(d > c);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut index = BulletinIndex::from_loaded(vec![
            Bulletin::new("TB-1", "One"),
            Bulletin::new("TB-2", "Two"),
        ]);
        let (id, _) = index.iter().next().unwrap();
        index.update(id, Bulletin::new("TB-1", "Uno")).unwrap();
        assert_eq!(index.get(id).unwrap().title, "Uno");
        assert_eq!(index.position(id), Some(0));
        assert!(index.is_modified());

        index.mark_saved();
        assert!(!index.is_modified());
    }
}
