//! Weighted relationship graphs built from counts or correlations.
//!
//! A [`Graph`] is built once from a list of weighted edges and a threshold and
//! is never modified afterwards. Rendering and layout happen elsewhere.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pairwise::{PairCorrelation, PairCount};
use crate::tokenize::split_ngram;

/// How an edge weight is compared against the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Comparison {
    /// keep `weight >= min_weight`
    #[default]
    Inclusive,
    /// keep `weight > min_weight`
    Exclusive,
}

impl Comparison {
    pub fn keeps(self, weight: f64, min_weight: f64) -> bool {
        match self {
            Comparison::Inclusive => weight >= min_weight,
            Comparison::Exclusive => weight > min_weight,
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inclusive" | ">=" => Ok(Comparison::Inclusive),
            "exclusive" | ">" => Ok(Comparison::Exclusive),
            other => Err(Error::invalid_argument(format!(
                "unknown comparison mode `{other}` (expected inclusive or exclusive)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

impl Edge {
    pub fn new<A: Into<String>, B: Into<String>>(from: A, to: B, weight: f64) -> Self {
        Edge {
            from: from.into(),
            to: to.into(),
            weight,
        }
    }
}

impl From<PairCount> for Edge {
    fn from(p: PairCount) -> Self {
        Edge::new(p.item1, p.item2, p.n as f64)
    }
}

impl From<PairCorrelation> for Edge {
    fn from(p: PairCorrelation) -> Self {
        Edge::new(p.item1, p.item2, p.correlation)
    }
}

/// Adjacency edges from n-gram counts: the first `n - 1` words point to the
/// last word, weighted by the n-gram's count. Single words are ignored.
pub fn ngram_edges(counts: &[(String, u64)]) -> Vec<Edge> {
    counts
        .iter()
        .filter_map(|(token, n)| {
            split_ngram(token).map(|(prefix, last)| Edge::new(prefix, last, *n as f64))
        })
        .collect()
}

/// Node row for export: name and number of incident edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node: String,
    pub degree: usize,
}

/// Items connected by retained edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<String>,
    edges: Vec<Edge>,
    directed: bool,
}

impl Graph {
    /// Endpoints of retained edges, sorted.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Retained edges, heaviest first; ties by `from`, then `to`.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Number of edges touching `node`, in either direction.
    ///
    /// A self-loop (`node -> node`, e.g. from the bigram "the the") counts
    /// once, not twice.
    pub fn degree(&self, node: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.from == node || e.to == node)
            .count()
    }

    /// Nodes adjacent to `node` in either direction, sorted.
    pub fn neighbors(&self, node: &str) -> Vec<&str> {
        let mut out: BTreeSet<&str> = BTreeSet::new();
        for e in &self.edges {
            if e.from == node {
                out.insert(&e.to);
            }
            if e.to == node {
                out.insert(&e.from);
            }
        }
        out.into_iter().collect()
    }

    /// Nodes with their degree, highest degree first; ties by name.
    ///
    /// Degrees match [`Graph::degree`], so a self-loop adds one.
    pub fn node_table(&self) -> Vec<NodeRecord> {
        let mut degrees: BTreeMap<&str, usize> =
            self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        for e in &self.edges {
            if let Some(d) = degrees.get_mut(e.from.as_str()) {
                *d += 1;
            }
            if e.to != e.from {
                if let Some(d) = degrees.get_mut(e.to.as_str()) {
                    *d += 1;
                }
            }
        }
        let mut rows: Vec<NodeRecord> = degrees
            .into_iter()
            .map(|(node, degree)| NodeRecord {
                node: node.to_owned(),
                degree,
            })
            .collect();
        rows.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.node.cmp(&b.node)));
        rows
    }
}

/// Builds a graph from the edges whose weight passes `min_weight`.
///
/// Undirected graphs store each edge once with `from <= to`; when both
/// orientations (or repeated edges) are present, the larger weight is kept.
/// Items without a retained edge do not become nodes.
pub fn build_graph<I>(edges: I, min_weight: f64, comparison: Comparison, directed: bool) -> Result<Graph>
where
    I: IntoIterator<Item = Edge>,
{
    if !min_weight.is_finite() || min_weight < 0.0 {
        return Err(Error::invalid_argument(format!(
            "minimum edge weight must be a non-negative number, got {min_weight}"
        )));
    }

    let mut merged: BTreeMap<(String, String), f64> = BTreeMap::new();
    for edge in edges {
        if !comparison.keeps(edge.weight, min_weight) {
            continue;
        }
        let key = if directed || edge.from <= edge.to {
            (edge.from, edge.to)
        } else {
            (edge.to, edge.from)
        };
        merged
            .entry(key)
            .and_modify(|w| *w = w.max(edge.weight))
            .or_insert(edge.weight);
    }

    let nodes: BTreeSet<&String> = merged.keys().flat_map(|(a, b)| [a, b]).collect();
    let nodes: Vec<String> = nodes.into_iter().cloned().collect();

    let mut edges: Vec<Edge> = merged
        .into_iter()
        .map(|((from, to), weight)| Edge { from, to, weight })
        .collect();
    edges.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.from.cmp(&b.from))
            .then_with(|| a.to.cmp(&b.to))
    });

    info!(
        "Built {} graph with {} nodes and {} edges",
        if directed { "directed" } else { "undirected" },
        nodes.len(),
        edges.len()
    );
    Ok(Graph {
        nodes,
        edges,
        directed,
    })
}
