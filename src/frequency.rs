//! Term × document count tables.

use std::collections::BTreeMap;

use clap::ValueEnum;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::tokenize::{Stopwords, tokenize_filtered};

/// `(document, term, n)`: occurrences of `term` in `document`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub document: String,
    pub term: String,
    pub n: u64,
}

/// What to do with a document that yields no terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EmptyDocumentPolicy {
    /// Log it, leave it out of every statistic, and list it as excluded.
    #[default]
    Skip,
    /// Abort with [`Error::EmptyDocument`].
    Fail,
}

/// Sparse `document → term → n` table, ordered by document then term.
///
/// Zero counts are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` occurrences of `term` to `document`.
    pub fn add(&mut self, document: &str, term: &str, n: u64) {
        if n == 0 {
            return;
        }
        *self
            .counts
            .entry(document.to_owned())
            .or_default()
            .entry(term.to_owned())
            .or_insert(0) += n;
    }

    /// Registers a document without any terms.
    ///
    /// Scoring treats such a document as empty.
    pub fn add_document(&mut self, document: &str) {
        self.counts.entry(document.to_owned()).or_default();
    }

    /// Counts the tokens of a single document.
    pub fn from_tokens<I, T>(document: &str, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut terms: BTreeMap<String, u64> = BTreeMap::new();
        for token in tokens {
            *terms.entry(token.as_ref().to_owned()).or_insert(0) += 1;
        }
        let mut counts = BTreeMap::new();
        if !terms.is_empty() {
            counts.insert(document.to_owned(), terms);
        }
        FrequencyTable { counts }
    }

    /// Per-key sum of two tables. Order of merging never changes the result.
    pub fn merge(mut self, other: FrequencyTable) -> FrequencyTable {
        for (document, terms) in other.counts {
            let entry = self.counts.entry(document).or_default();
            for (term, n) in terms {
                *entry.entry(term).or_insert(0) += n;
            }
        }
        self
    }

    pub fn get(&self, document: &str, term: &str) -> u64 {
        self.counts
            .get(document)
            .and_then(|terms| terms.get(term))
            .copied()
            .unwrap_or(0)
    }

    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.counts.len()
    }

    /// Terms of one document with their counts.
    pub fn terms(&self, document: &str) -> Option<&BTreeMap<String, u64>> {
        self.counts.get(document)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, u64>)> {
        self.counts.iter().map(|(d, t)| (d.as_str(), t))
    }

    /// Total number of terms counted for `document`.
    pub fn document_total(&self, document: &str) -> u64 {
        self.counts
            .get(document)
            .map(|terms| terms.values().sum())
            .unwrap_or(0)
    }

    /// Number of distinct documents containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.counts
            .values()
            .filter(|terms| terms.contains_key(term))
            .count()
    }

    /// Number of `(document, term)` records.
    pub fn len(&self) -> usize {
        self.counts.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, ordered by document then term.
    pub fn records(&self) -> Vec<TermCount> {
        self.iter()
            .flat_map(|(document, terms)| {
                terms.iter().map(move |(term, &n)| TermCount {
                    document: document.to_owned(),
                    term: term.clone(),
                    n,
                })
            })
            .collect()
    }

    /// All records, most frequent first; ties by document, then term.
    pub fn ranked(&self) -> Vec<TermCount> {
        let mut records = self.records();
        records.sort_by(|a, b| {
            b.n.cmp(&a.n)
                .then_with(|| a.document.cmp(&b.document))
                .then_with(|| a.term.cmp(&b.term))
        });
        records
    }

    /// Corpus-wide count per term, most frequent first; ties lexicographic.
    pub fn term_totals(&self) -> Vec<(String, u64)> {
        let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
        for terms in self.counts.values() {
            for (term, n) in terms {
                *totals.entry(term.as_str()).or_insert(0) += n;
            }
        }
        let mut sorted: Vec<(String, u64)> = totals
            .into_iter()
            .map(|(term, n)| (term.to_owned(), n))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sorted
    }
}

/// Counting result: the table plus ids of documents left out as empty.
#[derive(Debug, Clone, Default)]
pub struct DocumentCounts {
    pub table: FrequencyTable,
    pub excluded: Vec<String>,
}

/// Tokenizes every document into n-grams and counts them.
///
/// Documents are processed independently on the rayon pool and the partial
/// tables merged, so the result does not depend on scheduling.
pub fn count_documents<S>(
    documents: &[Document],
    n: usize,
    stopwords: &S,
    policy: EmptyDocumentPolicy,
) -> Result<DocumentCounts>
where
    S: Stopwords + Sync + ?Sized,
{
    if n < 1 {
        return Err(Error::invalid_argument("n-gram size must be at least 1"));
    }

    let (table, mut excluded) = documents
        .par_iter()
        .map(|doc| -> Result<(FrequencyTable, Vec<String>)> {
            let tokens = tokenize_filtered(&doc.text, n, stopwords)?;
            let table = FrequencyTable::from_tokens(&doc.id, tokens);
            let empty = if table.is_empty() {
                vec![doc.id.clone()]
            } else {
                Vec::new()
            };
            Ok((table, empty))
        })
        .try_reduce(
            || (FrequencyTable::new(), Vec::new()),
            |(a, mut excluded_a), (b, excluded_b)| {
                excluded_a.extend(excluded_b);
                Ok((a.merge(b), excluded_a))
            },
        )?;
    excluded.sort();

    // report the first id in order, whatever the scheduling
    if let Some(first) = excluded.first() {
        match policy {
            EmptyDocumentPolicy::Fail => return Err(Error::EmptyDocument(first.clone())),
            EmptyDocumentPolicy::Skip => {
                for id in &excluded {
                    warn!("Skipping `{id}`: no terms after filtering");
                }
            }
        }
    }

    info!(
        "Counted {} {}-gram records over {} documents ({} excluded)",
        table.len(),
        n,
        table.document_count(),
        excluded.len()
    );
    Ok(DocumentCounts { table, excluded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::StopwordSet;

    fn no_stop() -> StopwordSet {
        StopwordSet::new()
    }

    #[test]
    fn counts_tokens_per_document() {
        let t = FrequencyTable::from_tokens("d", ["one", "two", "two", "three", "three", "three"]);
        assert_eq!(t.get("d", "one"), 1);
        assert_eq!(t.get("d", "two"), 2);
        assert_eq!(t.get("d", "three"), 3);
        assert_eq!(t.get("d", "four"), 0);
        assert_eq!(t.document_total("d"), 6);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = FrequencyTable::from_tokens("d1", ["x", "y"]);
        let b = FrequencyTable::from_tokens("d1", ["x"]);
        let c = FrequencyTable::from_tokens("d2", ["y"]);
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = c.merge(b).merge(a);
        assert_eq!(left, right);
        assert_eq!(left.get("d1", "x"), 2);
        assert_eq!(left.document_frequency("y"), 2);
    }

    #[test]
    fn zero_counts_are_not_stored() {
        let mut t = FrequencyTable::new();
        t.add("d", "x", 0);
        assert!(t.is_empty());
        assert_eq!(t.document_count(), 0);
    }

    #[test]
    fn ranked_breaks_ties_lexicographically() {
        let mut t = FrequencyTable::new();
        t.add("d2", "b", 2);
        t.add("d1", "b", 2);
        t.add("d1", "a", 2);
        t.add("d1", "z", 5);
        let order: Vec<(String, String)> = t
            .ranked()
            .into_iter()
            .map(|r| (r.document, r.term))
            .collect();
        assert_eq!(
            order,
            vec![
                ("d1".into(), "z".into()),
                ("d1".into(), "a".into()),
                ("d1".into(), "b".into()),
                ("d2".into(), "b".into()),
            ]
        );
    }

    #[test]
    fn term_totals_sum_across_documents() {
        let docs = vec![
            Document::new("a1", "apple apple banana orange"),
            Document::new("a2", "banana banana apple"),
        ];
        let counts = count_documents(&docs, 1, &no_stop(), EmptyDocumentPolicy::Skip).unwrap();
        assert_eq!(
            counts.table.term_totals(),
            vec![
                ("apple".to_string(), 3),
                ("banana".to_string(), 3),
                ("orange".to_string(), 1),
            ]
        );
    }

    #[test]
    fn parallel_counting_matches_sequential() {
        let docs: Vec<Document> = (0..50)
            .map(|i| Document::new(format!("doc{i}"), format!("w{} w{} shared w{}", i % 7, i % 3, i % 7)))
            .collect();
        let counts = count_documents(&docs, 2, &no_stop(), EmptyDocumentPolicy::Skip).unwrap();
        let sequential = docs.iter().fold(FrequencyTable::new(), |acc, d| {
            acc.merge(FrequencyTable::from_tokens(&d.id, tokenize_filtered(&d.text, 2, &no_stop()).unwrap()))
        });
        assert_eq!(counts.table, sequential);
    }

    #[test]
    fn empty_documents_follow_policy() {
        let docs = vec![
            Document::new("full", "alpha beta"),
            Document::new("blank", "the the"),
            Document::new("void", ""),
        ];
        let stop: StopwordSet = ["the"].into_iter().collect();

        let skipped = count_documents(&docs, 1, &stop, EmptyDocumentPolicy::Skip).unwrap();
        assert_eq!(skipped.excluded, vec!["blank".to_string(), "void".to_string()]);
        assert_eq!(skipped.table.documents().collect::<Vec<_>>(), vec!["full"]);

        let failed = count_documents(&docs, 1, &stop, EmptyDocumentPolicy::Fail);
        assert!(matches!(failed, Err(Error::EmptyDocument(id)) if id == "blank"));
    }

    #[test]
    fn fail_policy_names_the_smallest_empty_id() {
        let mut docs: Vec<Document> = (0..64)
            .map(|i| Document::new(format!("doc{i:02}"), format!("word{i}")))
            .collect();
        for id in ["zz-empty", "mm-empty", "aa-empty"] {
            docs.push(Document::new(id, "  ...  "));
        }
        for _ in 0..10 {
            let failed = count_documents(&docs, 1, &no_stop(), EmptyDocumentPolicy::Fail);
            assert!(matches!(failed, Err(Error::EmptyDocument(id)) if id == "aa-empty"));
        }
    }
}
