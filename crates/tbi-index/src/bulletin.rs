//! The Technical Bulletin record.

use chrono::NaiveDate;

/// Separator used when keywords are shown or typed as a single line.
pub const KEYWORD_SEPARATOR: &str = " ";

/// One catalogued Technical Bulletin.
///
/// `replaces` and `replaced_by` hold the `number` of another bulletin or are
/// empty. The relation is advisory: dangling references are legal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bulletin {
    /// User-facing identifier, e.g. `TB-100`.
    pub number: String,
    /// Bulletin title.
    pub title: String,
    /// Free-text category, usually picked from the suggest-list.
    pub category: String,
    /// Rebuilding kit reference(s).
    pub rebuilding_kit_ref: String,
    /// Comma-separated technical publication references.
    pub tech_pub_ref: String,
    /// Multi-line comment.
    pub comment: String,
    /// Release date; `None` when unknown.
    pub release_date: Option<NaiveDate>,
    /// Person who registered the bulletin.
    pub registered_by: String,
    /// Number of the bulletin this one supersedes.
    pub replaces: String,
    /// Number of the bulletin superseding this one.
    pub replaced_by: String,
    /// Keywords in display order.
    pub keywords: Vec<String>,
}

impl Bulletin {
    /// Creates a bulletin with a number and a title, every other field empty.
    pub fn new(number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the keywords and returns the bulletin.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `replaces` reference and returns the bulletin.
    pub fn replacing(mut self, number: impl Into<String>) -> Self {
        self.replaces = number.into();
        self
    }

    /// Sets the `replaced_by` reference and returns the bulletin.
    pub fn replaced_by(mut self, number: impl Into<String>) -> Self {
        self.replaced_by = number.into();
        self
    }

    /// Sets the release date and returns the bulletin.
    pub fn released_on(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    /// Joins the keywords into one display line.
    pub fn keywords_string(&self) -> String {
        self.keywords.join(KEYWORD_SEPARATOR)
    }

    /// Replaces the keywords with the whitespace-separated words of `text`.
    ///
    /// One word is one keyword. Order is kept; words are not length-checked.
    pub fn set_keywords_from_text(&mut self, text: &str) {
        self.keywords = text.split_whitespace().map(str::to_owned).collect();
    }

    /// Returns the keywords with later duplicates removed.
    pub fn distinct_keywords(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.keywords.len());
        for keyword in &self.keywords {
            if !seen.contains(&keyword.as_str()) {
                seen.push(keyword);
            }
        }
        seen
    }

    /// Returns the comma-separated technical publication references, trimmed.
    pub fn tech_pub_refs(&self) -> impl Iterator<Item = &str> {
        self.tech_pub_ref
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    /// Formats the release date as `yyyy-MM-dd`, or an empty string.
    pub fn release_date_string(&self) -> String {
        self.release_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}
