//! Term frequency, inverse document frequency, and their product.
//!
//! Scoring runs in two phases over a finished [`FrequencyTable`]: first every
//! document's total, then the corpus-wide document frequency of each term.
//! Nothing is kept between calls.

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frequency::{EmptyDocumentPolicy, FrequencyTable};

/// `(document, term, n, tf, idf, tf_idf)` for a term present in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfRecord {
    pub document: String,
    pub term: String,
    pub n: u64,
    pub tf: f64,
    pub idf: f64,
    pub tf_idf: f64,
}

/// Scoring result.
#[derive(Debug, Clone, Default)]
pub struct TfIdf {
    /// One record per `(document, term)`, ordered by document then term.
    pub records: Vec<TfIdfRecord>,
    /// Documents without terms, left out of the idf denominator.
    pub excluded: Vec<String>,
    /// Documents that entered the idf denominator.
    pub total_documents: usize,
}

/// Scores every `(document, term)` count in `table`.
///
/// `tf = n / total terms in the document`, `idf = ln(documents /
/// documents containing the term)`. A term found in every document gets
/// `idf = 0`, hence `tf_idf = 0`.
pub fn score(table: &FrequencyTable, policy: EmptyDocumentPolicy) -> Result<TfIdf> {
    let mut documents: Vec<(&str, &BTreeMap<String, u64>, u64)> = Vec::new();
    let mut excluded = Vec::new();
    for (document, terms) in table.iter() {
        let total: u64 = terms.values().sum();
        if total > 0 {
            documents.push((document, terms, total));
            continue;
        }
        match policy {
            EmptyDocumentPolicy::Fail => return Err(Error::EmptyDocument(document.to_owned())),
            EmptyDocumentPolicy::Skip => {
                warn!("Excluding `{document}` from tf-idf: no terms");
                excluded.push(document.to_owned());
            }
        }
    }

    let mut containing: HashMap<&str, usize> = HashMap::new();
    for (_, terms, _) in &documents {
        for term in terms.keys() {
            *containing.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let total_documents = documents.len();
    let mut records = Vec::with_capacity(table.len());
    for (document, terms, total) in &documents {
        for (term, &n) in terms.iter() {
            let tf = n as f64 / *total as f64;
            let idf = (total_documents as f64 / containing[term.as_str()] as f64).ln();
            records.push(TfIdfRecord {
                document: (*document).to_owned(),
                term: term.clone(),
                n,
                tf,
                idf,
                tf_idf: tf * idf,
            });
        }
    }

    info!(
        "Scored {} tf-idf records over {} documents",
        records.len(),
        total_documents
    );
    Ok(TfIdf {
        records,
        excluded,
        total_documents,
    })
}

/// Splits off documents with fewer than `min_tokens` counted terms.
///
/// Very short documents produce inflated tf values; callers can drop them
/// before scoring. Returns the reduced table and the ids removed.
pub fn drop_short_documents(table: &FrequencyTable, min_tokens: u64) -> (FrequencyTable, Vec<String>) {
    let mut kept = FrequencyTable::new();
    let mut dropped = Vec::new();
    for (document, terms) in table.iter() {
        if terms.values().sum::<u64>() < min_tokens {
            dropped.push(document.to_owned());
            continue;
        }
        for (term, &n) in terms {
            kept.add(document, term, n);
        }
    }
    (kept, dropped)
}

/// Highest tf-idf first; ties by document, then term.
pub fn rank(mut records: Vec<TfIdfRecord>) -> Vec<TfIdfRecord> {
    records.sort_by(|a, b| {
        b.tf_idf
            .total_cmp(&a.tf_idf)
            .then_with(|| a.document.cmp(&b.document))
            .then_with(|| a.term.cmp(&b.term))
    });
    records
}

/// The `k` best-scoring terms of each document, documents in id order.
pub fn top_per_document(records: &[TfIdfRecord], k: usize) -> Vec<TfIdfRecord> {
    let mut by_document: BTreeMap<&str, Vec<TfIdfRecord>> = BTreeMap::new();
    for record in records {
        by_document
            .entry(record.document.as_str())
            .or_default()
            .push(record.clone());
    }
    by_document
        .into_values()
        .flat_map(|group| rank(group).into_iter().take(k))
        .collect()
}
