//! Documents, fixed-size sections, and group/item memberships.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pairwise::Membership;
use crate::tokenize::{Stopwords, words};

/// An identified unit of text. Never modified after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, text: T) -> Self {
        Document {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Splits a document into consecutive sections of `section_size` lines.
///
/// Section ids are `"{id}#{index}"`, counting from zero. A trailing partial
/// section is kept.
pub fn sections(document: &Document, section_size: usize) -> Result<Vec<Document>> {
    if section_size == 0 {
        return Err(Error::invalid_argument("section size must be at least 1"));
    }
    let lines: Vec<&str> = document.text.lines().collect();
    Ok(lines
        .chunks(section_size)
        .enumerate()
        .map(|(index, chunk)| Document::new(format!("{}#{}", document.id, index), chunk.join("\n")))
        .collect())
}

/// One membership per distinct non-stop-word of each document, grouped by
/// document id.
pub fn memberships<S>(documents: &[Document], stopwords: &S) -> Vec<Membership>
where
    S: Stopwords + ?Sized,
{
    let mut out = Vec::new();
    for doc in documents {
        let distinct: BTreeSet<String> = words(&doc.text)
            .filter(|w| !stopwords.is_stopword(w))
            .collect();
        out.extend(
            distinct
                .into_iter()
                .map(|item| Membership::new(doc.id.clone(), item)),
        );
    }
    out
}
