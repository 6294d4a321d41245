//! Keyword search.
//!
//! A bulletin matches when every query term is found among its search
//! tokens: its keywords, plus the whitespace-separated words of each field
//! enabled in [`SearchFields`]. Comparison ignores case.

use crate::bulletin::Bulletin;
use serde::{Deserialize, Serialize};

/// Record fields contributing tokens in addition to the keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFields {
    /// Bulletin number.
    pub number: bool,
    /// Title.
    pub title: bool,
    /// Category.
    pub category: bool,
    /// Rebuilding kit reference(s).
    pub rebuilding_kit: bool,
    /// Technical publication reference(s).
    pub tech_pub: bool,
    /// Release date, as `yyyy-MM-dd`.
    pub release_date: bool,
    /// Registering person.
    pub registered_by: bool,
    /// Superseded bulletin number.
    pub replaces: bool,
    /// Superseding bulletin number.
    pub replaced_by: bool,
    /// Comment.
    pub comment: bool,
}

impl Default for SearchFields {
    fn default() -> Self {
        Self {
            number: true,
            title: true,
            category: false,
            rebuilding_kit: false,
            tech_pub: false,
            release_date: false,
            registered_by: false,
            replaces: false,
            replaced_by: false,
            comment: false,
        }
    }
}

/// Search behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Require each term to equal a token instead of being contained in one.
    pub whole_words_only: bool,
    /// Fields searched besides the keywords.
    pub fields: SearchFields,
}

/// A parsed search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    terms: Vec<String>,
}

impl SearchQuery {
    /// Splits `text` on whitespace, dropping repeated terms.
    pub fn parse(text: &str) -> Self {
        let mut terms: Vec<String> = Vec::new();
        for word in text.split_whitespace() {
            if !terms.iter().any(|t| t == word) {
                terms.push(word.to_owned());
            }
        }
        Self { terms }
    }

    /// Returns the query terms in typed order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Returns true if the query has no term and matches everything.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns true if `bulletin` satisfies every term.
    pub fn matches(&self, bulletin: &Bulletin, options: &SearchOptions) -> bool {
        if self.terms.is_empty() {
            return true;
        }

        let tokens: Vec<String> = search_tokens(bulletin, &options.fields)
            .into_iter()
            .map(|token| token.to_lowercase())
            .collect();

        self.terms.iter().all(|term| {
            let term = term.to_lowercase();
            if options.whole_words_only {
                tokens.iter().any(|token| *token == term)
            } else {
                tokens.iter().any(|token| token.contains(&term))
            }
        })
    }
}

/// Collects the tokens a bulletin is searched on.
fn search_tokens(bulletin: &Bulletin, fields: &SearchFields) -> Vec<String> {
    let mut tokens: Vec<String> = bulletin.keywords.clone();
    let mut add = |enabled: bool, text: &str| {
        if enabled {
            tokens.extend(text.split_whitespace().map(str::to_owned));
        }
    };

    add(fields.number, &bulletin.number);
    add(fields.title, &bulletin.title);
    add(fields.category, &bulletin.category);
    add(fields.rebuilding_kit, &bulletin.rebuilding_kit_ref);
    add(fields.tech_pub, &bulletin.tech_pub_ref);
    add(fields.release_date, &bulletin.release_date_string());
    add(fields.registered_by, &bulletin.registered_by);
    add(fields.replaces, &bulletin.replaces);
    add(fields.replaced_by, &bulletin.replaced_by);
    add(fields.comment, &bulletin.comment);
    tokens
}
