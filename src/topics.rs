//! Read-only interface to an external topic model.
//!
//! The crate never fits topics itself. A [`TopicModel`] implementation hands
//! back per-topic term weights (`beta`) and per-document topic weights
//! (`gamma`); the helpers here rank and join them against tf-idf output.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frequency::FrequencyTable;
use crate::tfidf::TfIdfRecord;

const TOLERANCE: f64 = 1e-6;

/// Weight of `topic` in `document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTopic {
    pub document: String,
    pub topic: usize,
    pub gamma: f64,
}

/// Weight of `term` in `topic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTerm {
    pub topic: usize,
    pub term: String,
    pub beta: f64,
}

/// A tf-idf record joined with one topic's weight for the same term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermTopicScore {
    pub document: String,
    pub term: String,
    pub tf_idf: f64,
    pub topic: usize,
    pub beta: f64,
}

/// Output of a topic model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicFit {
    pub beta: Vec<TopicTerm>,
    pub gamma: Vec<DocumentTopic>,
}

impl TopicFit {
    /// Checks that gamma lies in `[0, 1]` and sums to one per document, and
    /// that beta is non-negative and sums to one per topic.
    pub fn validate(&self) -> Result<()> {
        let mut per_document: BTreeMap<&str, f64> = BTreeMap::new();
        for g in &self.gamma {
            if !(0.0..=1.0).contains(&g.gamma) {
                return Err(Error::invalid_argument(format!(
                    "gamma {} for `{}` topic {} is outside [0, 1]",
                    g.gamma, g.document, g.topic
                )));
            }
            *per_document.entry(&g.document).or_insert(0.0) += g.gamma;
        }
        if let Some((document, sum)) = per_document
            .iter()
            .find(|(_, sum)| (**sum - 1.0).abs() > TOLERANCE)
        {
            return Err(Error::invalid_argument(format!(
                "gamma of `{document}` sums to {sum}, expected 1"
            )));
        }

        let mut per_topic: BTreeMap<usize, f64> = BTreeMap::new();
        for b in &self.beta {
            if !(b.beta >= 0.0) {
                return Err(Error::invalid_argument(format!(
                    "beta {} for topic {} term `{}` is negative",
                    b.beta, b.topic, b.term
                )));
            }
            *per_topic.entry(b.topic).or_insert(0.0) += b.beta;
        }
        if let Some((topic, sum)) = per_topic
            .iter()
            .find(|(_, sum)| (**sum - 1.0).abs() > TOLERANCE)
        {
            return Err(Error::invalid_argument(format!(
                "beta of topic {topic} sums to {sum}, expected 1"
            )));
        }
        Ok(())
    }
}

/// A topic-model capability supplied by the caller.
pub trait TopicModel {
    /// Fits `k` topics to the document-term counts; `seed` fixes any
    /// randomness so repeated calls agree.
    fn infer(&self, table: &FrequencyTable, k: usize, seed: u64) -> Result<TopicFit>;
}

/// The `k` heaviest terms of every topic, topics ascending; ties by term.
pub fn top_terms(beta: &[TopicTerm], k: usize) -> Vec<TopicTerm> {
    let mut by_topic: BTreeMap<usize, Vec<&TopicTerm>> = BTreeMap::new();
    for b in beta {
        by_topic.entry(b.topic).or_default().push(b);
    }
    by_topic
        .into_values()
        .flat_map(|mut terms| {
            terms.sort_by(|a, b| b.beta.total_cmp(&a.beta).then_with(|| a.term.cmp(&b.term)));
            terms.into_iter().take(k).cloned()
        })
        .collect()
}

/// Highest-gamma topic of every document; ties go to the lower topic id.
pub fn dominant_topics(gamma: &[DocumentTopic]) -> Vec<DocumentTopic> {
    let mut best: BTreeMap<&str, &DocumentTopic> = BTreeMap::new();
    for g in gamma {
        best.entry(&g.document)
            .and_modify(|current| {
                if g.gamma > current.gamma || (g.gamma == current.gamma && g.topic < current.topic) {
                    *current = g;
                }
            })
            .or_insert(g);
    }
    best.into_values().cloned().collect()
}

/// Inner join of tf-idf records with topic term weights on `term`.
///
/// Output follows the tf-idf record order, then topic id.
pub fn join_tf_idf(records: &[TfIdfRecord], beta: &[TopicTerm]) -> Vec<TermTopicScore> {
    let mut by_term: HashMap<&str, Vec<&TopicTerm>> = HashMap::new();
    for b in beta {
        by_term.entry(&b.term).or_default().push(b);
    }
    for weights in by_term.values_mut() {
        weights.sort_by_key(|b| b.topic);
    }

    let mut out = Vec::new();
    for r in records {
        let Some(weights) = by_term.get(r.term.as_str()) else {
            continue;
        };
        out.extend(weights.iter().map(|b| TermTopicScore {
            document: r.document.clone(),
            term: r.term.clone(),
            tf_idf: r.tf_idf,
            topic: b.topic,
            beta: b.beta,
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::EmptyDocumentPolicy;
    use crate::tfidf::score;

    /// Assigns every document to topic 0 and splits beta evenly over terms.
    struct SingleTopic;

    impl TopicModel for SingleTopic {
        fn infer(&self, table: &FrequencyTable, k: usize, _seed: u64) -> Result<TopicFit> {
            if k != 1 {
                return Err(Error::invalid_argument("SingleTopic only fits k = 1"));
            }
            let terms: Vec<(String, u64)> = table.term_totals();
            let total: u64 = terms.iter().map(|(_, n)| n).sum();
            Ok(TopicFit {
                beta: terms
                    .into_iter()
                    .map(|(term, n)| TopicTerm {
                        topic: 0,
                        term,
                        beta: n as f64 / total as f64,
                    })
                    .collect(),
                gamma: table
                    .documents()
                    .map(|d| DocumentTopic {
                        document: d.to_owned(),
                        topic: 0,
                        gamma: 1.0,
                    })
                    .collect(),
            })
        }
    }

    fn tt(topic: usize, term: &str, beta: f64) -> TopicTerm {
        TopicTerm {
            topic,
            term: term.into(),
            beta,
        }
    }

    fn dt(document: &str, topic: usize, gamma: f64) -> DocumentTopic {
        DocumentTopic {
            document: document.into(),
            topic,
            gamma,
        }
    }

    #[test]
    fn model_output_validates_and_joins() {
        let table = FrequencyTable::from_tokens("d1", ["x", "x", "y"])
            .merge(FrequencyTable::from_tokens("d2", ["y", "z"]));
        let fit = SingleTopic.infer(&table, 1, 42).unwrap();
        fit.validate().unwrap();
        assert!(SingleTopic.infer(&table, 3, 42).is_err());

        let scored = score(&table, EmptyDocumentPolicy::Skip).unwrap();
        let joined = join_tf_idf(&scored.records, &fit.beta);
        assert_eq!(joined.len(), scored.records.len());
        let x = joined.iter().find(|j| j.term == "x").unwrap();
        assert_eq!(x.document, "d1");
        assert!((x.beta - 0.4).abs() < 1e-12);
    }

    #[test]
    fn validation_rejects_bad_weights() {
        let bad_gamma = TopicFit {
            beta: vec![tt(0, "a", 1.0)],
            gamma: vec![dt("d", 0, 0.7), dt("d", 1, 0.7)],
        };
        assert!(matches!(bad_gamma.validate(), Err(Error::InvalidArgument(_))));

        let negative_beta = TopicFit {
            beta: vec![tt(0, "a", 1.5), tt(0, "b", -0.5)],
            gamma: vec![dt("d", 0, 1.0)],
        };
        assert!(negative_beta.validate().is_err());
    }

    #[test]
    fn ranks_terms_and_topics() {
        let beta = vec![
            tt(1, "b", 0.2),
            tt(0, "a", 0.5),
            tt(0, "c", 0.5),
            tt(1, "d", 0.8),
            tt(0, "e", 0.0),
        ];
        let top = top_terms(&beta, 2);
        let names: Vec<(usize, &str)> = top.iter().map(|t| (t.topic, t.term.as_str())).collect();
        assert_eq!(names, vec![(0, "a"), (0, "c"), (1, "d"), (1, "b")]);

        let gamma = vec![dt("d1", 2, 0.4), dt("d1", 0, 0.4), dt("d1", 1, 0.2), dt("d2", 1, 0.9)];
        let dom = dominant_topics(&gamma);
        assert_eq!(dom, vec![dt("d1", 0, 0.4), dt("d2", 1, 0.9)]);
    }
}
