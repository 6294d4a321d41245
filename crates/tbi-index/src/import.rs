//! Plain-text interchange formats.
//!
//! Two text layouts carry bulletins between people:
//!
//! - the subscription mail, where each label is followed by a tab and the
//!   value, ending at the next tab or line break:
//!   `Bulletin No:\tTB-100\tTitle:\tPump\n`
//! - the copied summary produced by [`to_summary`], one `Label: value`
//!   per line with an optional trailing `Notes:` section
//!
//! [`import_bulletin`] detects the layout and parses it. Missing labels
//! leave fields empty; they are never errors.

use crate::bulletin::Bulletin;
use chrono::NaiveDate;
use tracing::debug;

const NUMBER: &str = "Bulletin No:";
const TITLE: &str = "Title:";
const CATEGORY: &str = "TB Category:";
const REGISTERED_BY: &str = "Registered by:";
const REPLACES: &str = "Replaces:";
const REPLACED_BY: &str = "Replaced by:";
const RELEASE_DATE: &str = "Release date:";

const MAIL_REBUILDING_KIT: &str = "Rebuilding Kit(s):";
const MAIL_TECH_PUB: &str = "Technical Publication(s):";
const MAIL_COMMENTS: &str = "Comments:";

const SUMMARY_REBUILDING_KIT: &str = "Rebuilding Kit:";
const SUMMARY_TECH_PUB: &str = "Technical Publication:";
const SUMMARY_NOTES: &str = "Notes:";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text layouts understood by [`import_bulletin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterchangeFormat {
    /// Tab-separated mail sent by the bulletin subscription list.
    SubscriptionMail,
    /// Line-based summary produced by [`to_summary`].
    CopiedSummary,
}

impl InterchangeFormat {
    /// Guesses the layout of `text`.
    ///
    /// Returns `None` when no bulletin number label is present.
    pub fn detect(text: &str) -> Option<Self> {
        let start = text.find(NUMBER)?;
        let after = &text[start + NUMBER.len()..];
        let separator = after.trim_start_matches(' ').chars().next();
        if separator == Some('\t') {
            Some(Self::SubscriptionMail)
        } else {
            Some(Self::CopiedSummary)
        }
    }

    /// Parses `text` as this layout.
    pub fn parse(self, text: &str) -> Bulletin {
        match self {
            Self::SubscriptionMail => parse_mail(text),
            Self::CopiedSummary => parse_summary(text),
        }
    }
}

/// Builds a bulletin from pasted or dropped text.
///
/// Text without any recognised layout goes through the mail parser, which
/// yields a bulletin with empty fields.
pub fn import_bulletin(text: &str) -> Bulletin {
    let format = InterchangeFormat::detect(text).unwrap_or(InterchangeFormat::SubscriptionMail);
    debug!("Importing bulletin from {:?} text", format);
    format.parse(text)
}

/// Renders the copied-summary header lines of `bulletin`.
pub fn to_summary(bulletin: &Bulletin) -> String {
    let release_date = bulletin.release_date_string();
    let lines = [
        (NUMBER, bulletin.number.as_str()),
        (TITLE, bulletin.title.as_str()),
        (CATEGORY, bulletin.category.as_str()),
        (SUMMARY_REBUILDING_KIT, bulletin.rebuilding_kit_ref.as_str()),
        (SUMMARY_TECH_PUB, bulletin.tech_pub_ref.as_str()),
        (RELEASE_DATE, release_date.as_str()),
        (REGISTERED_BY, bulletin.registered_by.as_str()),
        (REPLACES, bulletin.replaces.as_str()),
        (REPLACED_BY, bulletin.replaced_by.as_str()),
    ];
    lines
        .iter()
        .map(|(label, value)| format!("{} {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the summary followed by the comment as a `Notes:` section.
pub fn to_summary_with_notes(bulletin: &Bulletin) -> String {
    format!(
        "{}\n{} {}",
        to_summary(bulletin),
        SUMMARY_NOTES,
        bulletin.comment
    )
}

fn parse_mail(text: &str) -> Bulletin {
    let field = |label: &str| mail_value(text, label, &['\t', '\n']).unwrap_or_default();

    Bulletin {
        number: field(NUMBER),
        title: field(TITLE),
        category: field(CATEGORY),
        rebuilding_kit_ref: field(MAIL_REBUILDING_KIT),
        tech_pub_ref: field(MAIL_TECH_PUB),
        comment: mail_value(text, MAIL_COMMENTS, &['\t']).unwrap_or_default(),
        release_date: mail_value(text, RELEASE_DATE, &['\n']).and_then(|v| parse_date(&v)),
        registered_by: field(REGISTERED_BY),
        replaces: field(REPLACES),
        replaced_by: field(REPLACED_BY),
        keywords: Vec::new(),
    }
}

/// Returns the value after the first tab following `label`, up to the
/// first of `terminators` or the end of the text.
fn mail_value(text: &str, label: &str, terminators: &[char]) -> Option<String> {
    let start = text.find(label)? + label.len();
    let value_start = start + text[start..].find('\t')? + 1;
    let rest = &text[value_start..];
    let end = rest.find(terminators).unwrap_or(rest.len());
    Some(rest[..end].trim().to_owned())
}

fn parse_summary(text: &str) -> Bulletin {
    let mut bulletin = Bulletin::default();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let line = line.trim_start();
        if let Some(first) = line.strip_prefix(SUMMARY_NOTES) {
            // Notes run to the end of the text.
            let mut notes = vec![first.trim_start()];
            notes.extend(lines.by_ref());
            bulletin.comment = notes.join("\n").trim_end().to_owned();
            break;
        }

        let Some((label, value)) = split_label(line) else {
            continue;
        };
        let value = value.trim().to_owned();
        match label {
            NUMBER => bulletin.number = value,
            TITLE => bulletin.title = value,
            CATEGORY => bulletin.category = value,
            SUMMARY_REBUILDING_KIT | MAIL_REBUILDING_KIT => bulletin.rebuilding_kit_ref = value,
            SUMMARY_TECH_PUB | MAIL_TECH_PUB => bulletin.tech_pub_ref = value,
            RELEASE_DATE => bulletin.release_date = parse_date(&value),
            REGISTERED_BY => bulletin.registered_by = value,
            REPLACES => bulletin.replaces = value,
            REPLACED_BY => bulletin.replaced_by = value,
            _ => {}
        }
    }
    bulletin
}

/// Splits `Label: value` after the first colon, keeping the colon.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    Some((&line[..=colon], &line[colon + 1..]))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}
