//! Insert planning and conflict resolution.
//!
//! Inserting a bulletin is a two step affair: [`plan_insert`] scans the
//! existing sequence once and returns a [`MergePlan`]; the index then
//! applies it. Precedence over the whole sequence:
//!
//! 1. same `number` anywhere → [`Conflict::DuplicateNumber`]
//! 2. an existing bulletin numbered `candidate.replaced_by` →
//!    [`Conflict::NewerVersionExists`]
//! 3. an existing bulletin numbered `candidate.replaces` →
//!    [`MergePlan::Supersede`], a choice-point answered by a [`Resolution`]
//! 4. otherwise → [`MergePlan::Append`]
//!
//! Only the first match of rules 2 and 3 is considered. Chains of several
//! supersessions are not followed.

use crate::bulletin::Bulletin;
use crate::error::Conflict;
use crate::index::BulletinId;

/// Caller's answer to a supersession choice-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Drop the existing bulletin and insert the candidate as-is.
    Replace,
    /// Drop the existing bulletin and insert the candidate with the
    /// existing keywords merged in.
    ReplaceAndMergeKeywords,
    /// Leave the index unchanged.
    Cancel,
}

/// A candidate that supersedes an indexed bulletin.
#[derive(Debug, Clone, Copy)]
pub struct Supersession<'a> {
    /// The indexed bulletin named by `candidate.replaces`.
    pub existing: &'a Bulletin,
    /// The bulletin being inserted.
    pub candidate: &'a Bulletin,
}

/// Outcome of [`plan_insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePlan {
    /// No relation found; append at the end.
    Append,
    /// The insert must be refused.
    Reject(Conflict),
    /// The candidate supersedes the bulletin at `position`.
    Supersede {
        /// Position of the superseded bulletin in the sequence.
        position: usize,
    },
}

/// What an insert did to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The candidate was appended.
    Appended(BulletinId),
    /// The candidate replaced a superseded bulletin.
    Replaced {
        /// Identifier of the inserted candidate.
        id: BulletinId,
        /// The bulletin that was dropped.
        removed: Bulletin,
    },
    /// The caller cancelled at the supersession choice-point.
    Cancelled,
}

impl InsertOutcome {
    /// Returns the identifier of the inserted bulletin, if any.
    pub fn inserted(&self) -> Option<BulletinId> {
        match self {
            Self::Appended(id) | Self::Replaced { id, .. } => Some(*id),
            Self::Cancelled => None,
        }
    }
}

/// Evaluates the insert precedence of `candidate` against `existing`.
///
/// Empty `replaces` and `replaced_by` fields never match.
pub fn plan_insert<'a, I>(existing: I, candidate: &Bulletin) -> MergePlan
where
    I: IntoIterator<Item = &'a Bulletin>,
{
    let mut newer: Option<&Bulletin> = None;
    let mut superseded: Option<usize> = None;

    for (position, bulletin) in existing.into_iter().enumerate() {
        if bulletin.number == candidate.number {
            return MergePlan::Reject(Conflict::DuplicateNumber {
                number: candidate.number.clone(),
                title: candidate.title.clone(),
            });
        }
        if newer.is_none()
            && !candidate.replaced_by.is_empty()
            && bulletin.number == candidate.replaced_by
        {
            newer = Some(bulletin);
        }
        if superseded.is_none()
            && !candidate.replaces.is_empty()
            && bulletin.number == candidate.replaces
        {
            superseded = Some(position);
        }
    }

    if let Some(newer) = newer {
        return MergePlan::Reject(Conflict::NewerVersionExists {
            number: newer.number.clone(),
            title: newer.title.clone(),
        });
    }
    match superseded {
        Some(position) => MergePlan::Supersede { position },
        None => MergePlan::Append,
    }
}

/// Returns `new` followed by every keyword of `old` not already present.
///
/// Comparison is exact. Order of both inputs is kept.
pub fn merge_keywords(new: &[String], old: &[String]) -> Vec<String> {
    let mut merged = new.to_vec();
    for keyword in old {
        if !merged.contains(keyword) {
            merged.push(keyword.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_no_relation_appends() {
        let existing = vec![Bulletin::new("TB-1", "One")];
        let plan = plan_insert(&existing, &Bulletin::new("TB-2", "Two"));
        assert_eq!(plan, MergePlan::Append);
        assert_eq!(
            plan_insert(&Vec::new(), &Bulletin::new("TB-2", "Two")),
            MergePlan::Append
        );
    }

    #[test]
    fn test_duplicate_reports_candidate_title() {
        let existing = vec![Bulletin::new("TB-100", "Old")];
        let plan = plan_insert(&existing, &Bulletin::new("TB-100", "Again"));
        assert_eq!(
            plan,
            MergePlan::Reject(Conflict::DuplicateNumber {
                number: "TB-100".to_string(),
                title: "Again".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_wins_over_earlier_relation() {
        let existing = vec![Bulletin::new("TB-1", "One"), Bulletin::new("TB-2", "Two")];
        let candidate = Bulletin::new("TB-2", "Dup").replacing("TB-1");
        assert!(matches!(
            plan_insert(&existing, &candidate),
            MergePlan::Reject(Conflict::DuplicateNumber { .. })
        ));
    }

    #[test]
    fn test_newer_version_reports_existing_title() {
        let existing = vec![Bulletin::new("TB-101", "Newer")];
        let candidate = Bulletin::new("TB-100", "Older").replaced_by("TB-101");
        assert_eq!(
            plan_insert(&existing, &candidate),
            MergePlan::Reject(Conflict::NewerVersionExists {
                number: "TB-101".to_string(),
                title: "Newer".to_string(),
            })
        );
    }

    #[test]
    fn test_newer_version_wins_over_supersession() {
        let existing = vec![Bulletin::new("TB-1", "One"), Bulletin::new("TB-3", "Three")];
        let candidate = Bulletin::new("TB-2", "Two")
            .replacing("TB-1")
            .replaced_by("TB-3");
        assert!(matches!(
            plan_insert(&existing, &candidate),
            MergePlan::Reject(Conflict::NewerVersionExists { .. })
        ));
    }

    #[test]
    fn test_supersession_reports_first_position() {
        let existing = vec![
            Bulletin::new("TB-9", "Other"),
            Bulletin::new("TB-100", "Old"),
            Bulletin::new("TB-100b", "Unrelated"),
        ];
        let candidate = Bulletin::new("TB-101", "New").replacing("TB-100");
        assert_eq!(
            plan_insert(&existing, &candidate),
            MergePlan::Supersede { position: 1 }
        );
    }

    #[test]
    fn test_empty_relations_never_match() {
        let existing = vec![Bulletin::new("", "Unnumbered")];
        let candidate = Bulletin::new("TB-1", "One");
        assert_eq!(plan_insert(&existing, &candidate), MergePlan::Append);
    }

    #[test]
    fn test_merge_keywords_order() {
        let merged = merge_keywords(&keywords(&["valve"]), &keywords(&["pump", "seal"]));
        assert_eq!(merged, keywords(&["valve", "pump", "seal"]));
    }

    #[test]
    fn test_merge_keywords_skips_present() {
        let merged = merge_keywords(
            &keywords(&["seal", "valve"]),
            &keywords(&["pump", "seal", "pump"]),
        );
        assert_eq!(merged, keywords(&["seal", "valve", "pump"]));
    }
}
