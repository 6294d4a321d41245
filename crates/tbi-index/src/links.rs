//! Download links for a bulletin and its technical publications.
//!
//! Links are built from URL templates where `%1` stands for the document
//! name. Opening them is left to the caller.

use crate::bulletin::Bulletin;
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the document name in a template.
pub const PLACEHOLDER: &str = "%1";

/// Suffix of the customer information companion of a bulletin.
pub const CUSTOMER_INFORMATION_SUFFIX: &str = "_CTI";

/// Default bulletin document template.
pub const DEFAULT_TECHNICAL_BULLETIN_URL: &str =
    "https://piv.tetrapak.com/techbull/detail_techbull.aspx?id=%1";

/// Default technical publication template.
pub const DEFAULT_TECHNICAL_PUBLICATION_URL: &str =
    "https://piv.tetrapak.com/piv-tp-service/api/techpubs/%1/file";

/// URL templates for bulletin resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTemplates {
    /// Template for bulletin documents.
    pub technical_bulletin: String,
    /// Template for technical publications.
    pub technical_publication: String,
}

impl Default for LinkTemplates {
    fn default() -> Self {
        Self {
            technical_bulletin: DEFAULT_TECHNICAL_BULLETIN_URL.to_string(),
            technical_publication: DEFAULT_TECHNICAL_PUBLICATION_URL.to_string(),
        }
    }
}

/// Kind of document behind a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The bulletin itself.
    TechnicalBulletin,
    /// The customer information companion of the bulletin.
    CustomerInformation,
    /// A referenced technical publication.
    TechnicalPublication,
}

/// One downloadable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    /// Document kind.
    pub kind: ResourceKind,
    /// Menu label.
    pub label: String,
    /// Resolved URL.
    pub url: String,
}

/// Returns the links of `bulletin`: its document and customer information
/// when it has a number, then one link per technical publication reference.
pub fn resource_links(bulletin: &Bulletin, templates: &LinkTemplates) -> Vec<ResourceLink> {
    let mut links = Vec::new();

    if !bulletin.number.is_empty() {
        links.push(ResourceLink {
            kind: ResourceKind::TechnicalBulletin,
            label: "Technical Bulletin".to_string(),
            url: expand(&templates.technical_bulletin, &bulletin.number),
        });
        let companion = format!("{}{}", bulletin.number, CUSTOMER_INFORMATION_SUFFIX);
        links.push(ResourceLink {
            kind: ResourceKind::CustomerInformation,
            label: "Customer Technical Information".to_string(),
            url: expand(&templates.technical_bulletin, &companion),
        });
    }

    links.extend(bulletin.tech_pub_refs().map(|reference| ResourceLink {
        kind: ResourceKind::TechnicalPublication,
        label: reference.to_string(),
        url: expand(
            &templates.technical_publication,
            publication_name(reference),
        ),
    }));
    links
}

/// Strips a letter prefix such as `RM-` from a publication reference.
///
/// Old references start with a digit and are kept whole.
pub fn publication_name(reference: &str) -> &str {
    let second = reference.chars().nth(1);
    if second.is_some_and(|c| !c.is_ascii_digit()) {
        if let Some((_, name)) = reference.split_once('-') {
            return name;
        }
    }
    reference
}

fn expand(template: &str, name: &str) -> String {
    template.replace(PLACEHOLDER, name)
}
