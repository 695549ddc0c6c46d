#![forbid(unsafe_code)]
//! # text_relations
//!
//! Relational statistics over a corpus of tokenized documents:
//!
//! - [`tokenize`]: words and overlapping n-gram windows, with stop-word filtering
//! - [`FrequencyTable`] and [`count_documents`]: term × document counts
//! - [`score`]: tf-idf per `(document, term)`
//! - [`pairwise_count`] and [`pairwise_correlation`]: co-occurrence and phi
//!   correlation of items sharing a group
//! - [`build_graph`]: weighted relationship graph from any of the above
//!
//! [`analyze_documents`] runs the whole pipeline in memory; [`analyze_path`]
//! additionally loads `.txt` files and exports every table.
//!
//! ## Example
//! ```
//! use text_relations::{AnalysisOptions, Document, StopwordSet, analyze_documents};
//!
//! let docs = vec![
//!     Document::new("d1", "the cat sat on the mat"),
//!     Document::new("d2", "the dog sat on the log"),
//! ];
//! let stop: StopwordSet = ["the", "on"].into_iter().collect();
//! let options = AnalysisOptions {
//!     min_group_frequency: 1,
//!     ..AnalysisOptions::default()
//! };
//! let analysis = analyze_documents(&docs, &stop, &options).unwrap();
//! assert!(analysis.pair_counts.iter().any(|p| p.item1 == "cat" && p.item2 == "sat"));
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

pub mod document;
pub mod error;
pub mod export;
pub mod frequency;
pub mod graph;
pub mod pairwise;
pub mod tfidf;
pub mod tokenize;
pub mod topics;

pub use document::{Document, memberships, sections};
pub use error::{Error, Result};
pub use export::{ExportFormat, TableWriter, Tabular, csv_safe_cell, stem_for};
pub use frequency::{DocumentCounts, EmptyDocumentPolicy, FrequencyTable, TermCount, count_documents};
pub use graph::{Comparison, Edge, Graph, NodeRecord, build_graph, ngram_edges};
pub use pairwise::{
    Contingency, Membership, PairCorrelation, PairCount, PairRecord, PairwiseOptions, pairs_with,
    pairwise_correlation, pairwise_count, retain_frequent,
};
pub use tfidf::{TfIdf, TfIdfRecord, drop_short_documents, rank, score, top_per_document};
pub use tokenize::{
    NGrams, StopwordSet, Stopwords, load_stopwords, split_ngram, tokenize, tokenize_filtered, words,
};
pub use topics::{
    DocumentTopic, TermTopicScore, TopicFit, TopicModel, TopicTerm, dominant_topics, join_tf_idf,
    top_terms,
};

/// Unit within which item co-membership is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    /// each document is one group
    #[default]
    Document,
    /// each run of `section_size` lines is one group
    Section,
}

/// Statistic used for graph edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum GraphSource {
    /// n-gram adjacency counts (requires n >= 2)
    Ngrams,
    /// pairwise co-occurrence counts
    Counts,
    /// pairwise phi correlation
    #[default]
    Correlation,
}

/// Configuration of a full analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub ngram: usize,
    pub group_by: GroupBy,
    pub section_size: usize,
    pub min_group_frequency: u64,
    /// Documents with fewer counted terms are left out of tf-idf; 0 keeps all.
    pub min_document_tokens: u64,
    pub graph_source: GraphSource,
    pub min_weight: f64,
    pub comparison: Comparison,
    /// `None` picks directed for n-gram graphs and undirected otherwise.
    pub directed: Option<bool>,
    pub empty_documents: EmptyDocumentPolicy,
    pub max_vocabulary: Option<usize>,
    pub export_format: ExportFormat,
    pub output_dir: PathBuf,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            ngram: 2,
            group_by: GroupBy::Document,
            section_size: 10,
            min_group_frequency: 2,
            min_document_tokens: 0,
            graph_source: GraphSource::Correlation,
            min_weight: 0.15,
            comparison: Comparison::Inclusive,
            directed: None,
            empty_documents: EmptyDocumentPolicy::Skip,
            max_vocabulary: None,
            export_format: ExportFormat::Txt,
            output_dir: PathBuf::from("."),
        }
    }
}

impl AnalysisOptions {
    /// Rejects malformed configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.ngram < 1 {
            return Err(Error::invalid_argument("--ngram must be at least 1"));
        }
        if self.group_by == GroupBy::Section && self.section_size < 1 {
            return Err(Error::invalid_argument("--section-size must be at least 1"));
        }
        if !self.min_weight.is_finite() || self.min_weight < 0.0 {
            return Err(Error::invalid_argument(format!(
                "--min-weight must be a non-negative number, got {}",
                self.min_weight
            )));
        }
        if self.graph_source == GraphSource::Ngrams && self.ngram < 2 {
            return Err(Error::invalid_argument(
                "an n-gram graph needs --ngram 2 or more",
            ));
        }
        Ok(())
    }

    fn is_directed(&self) -> bool {
        self.directed
            .unwrap_or(self.graph_source == GraphSource::Ngrams)
    }
}

/// Everything computed for one corpus.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub term_counts: FrequencyTable,
    pub tf_idf: TfIdf,
    pub pair_counts: Vec<PairCount>,
    pub correlations: Vec<PairCorrelation>,
    pub graph: Graph,
    /// Documents left out of tf-idf (empty or too short), sorted.
    pub excluded_documents: Vec<String>,
    /// Number of groups seen by the pairwise step.
    pub groups: usize,
}

const TOP: usize = 20;

impl Analysis {
    /// Plain-text overview, as printed by the CLI.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Documents: {} scored, {} excluded; groups: {}\n",
            self.tf_idf.total_documents,
            self.excluded_documents.len(),
            self.groups
        ));

        out.push_str(&format!("\nTop {TOP} terms by tf-idf:"));
        for r in rank(self.tf_idf.records.clone()).iter().take(TOP) {
            out.push_str(&format!("\n  {}\t{}\t{:.6}", r.term, r.document, r.tf_idf));
        }

        out.push_str(&format!("\n\nTop {TOP} pairs (by count):"));
        for p in self.pair_counts.iter().take(TOP) {
            out.push_str(&format!("\n  ({}, {})\t{}", p.item1, p.item2, p.n));
        }

        out.push_str(&format!("\n\nTop {TOP} correlations:"));
        for c in self.correlations.iter().take(TOP) {
            out.push_str(&format!("\n  ({}, {})\t{:.4}", c.item1, c.item2, c.correlation));
        }

        out.push_str(&format!(
            "\n\nGraph: {} nodes, {} edges ({})",
            self.graph.nodes().len(),
            self.graph.edges().len(),
            if self.graph.is_directed() {
                "directed"
            } else {
                "undirected"
            }
        ));
        let arrow = if self.graph.is_directed() { "->" } else { "--" };
        for e in self.graph.edges().iter().take(TOP) {
            out.push_str(&format!("\n  {} {} {}\t{}", e.from, arrow, e.to, e.weight));
        }
        out
    }
}

fn groups_for(documents: &[Document], options: &AnalysisOptions) -> Result<Vec<Document>> {
    match options.group_by {
        GroupBy::Document => Ok(documents.to_vec()),
        GroupBy::Section => {
            let mut out = Vec::new();
            for doc in documents {
                out.extend(sections(doc, options.section_size)?);
            }
            Ok(out)
        }
    }
}

/// Runs tokenization, counting, tf-idf, pairwise statistics and graph
/// construction over an in-memory corpus.
pub fn analyze_documents<S>(documents: &[Document], stopwords: &S, options: &AnalysisOptions) -> Result<Analysis>
where
    S: Stopwords + Sync + ?Sized,
{
    options.validate()?;

    let counts = count_documents(documents, options.ngram, stopwords, options.empty_documents)?;
    let mut excluded = counts.excluded;
    let table = if options.min_document_tokens > 0 {
        let (kept, short) = drop_short_documents(&counts.table, options.min_document_tokens);
        for id in &short {
            warn!("Excluding `{id}` from tf-idf: fewer than {} terms", options.min_document_tokens);
        }
        excluded.extend(short);
        kept
    } else {
        counts.table
    };
    let tf_idf = score(&table, options.empty_documents)?;
    excluded.extend(tf_idf.excluded.iter().cloned());
    excluded.sort();
    excluded.dedup();

    let groups = groups_for(documents, options)?;
    let members = memberships(&groups, stopwords);
    let group_count = members
        .iter()
        .map(|m| m.group.as_str())
        .collect::<HashSet<_>>()
        .len();
    let pair_options = PairwiseOptions {
        symmetric: true,
        max_vocabulary: options.max_vocabulary,
        max_group_size: None,
    };
    let frequent = retain_frequent(&members, options.min_group_frequency);
    let pair_counts = pairwise_count(&frequent, &pair_options)?;
    let correlations = pairwise_correlation(&members, options.min_group_frequency, &pair_options)?;

    let edges: Vec<Edge> = match options.graph_source {
        GraphSource::Ngrams => ngram_edges(&table.term_totals()),
        GraphSource::Counts => pair_counts.iter().cloned().map(Edge::from).collect(),
        GraphSource::Correlation => correlations.iter().cloned().map(Edge::from).collect(),
    };
    let graph = build_graph(edges, options.min_weight, options.comparison, options.is_directed())?;

    Ok(Analysis {
        term_counts: table,
        tf_idf,
        pair_counts,
        correlations,
        graph,
        excluded_documents: excluded,
        groups: group_count,
    })
}

/// `.txt` files under `path` (or `path` itself if it is a file), sorted.
pub fn collect_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .map(|x| x.eq_ignore_ascii_case("txt"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn document_id(root: &Path, file: &Path) -> String {
    let relative = if root.is_file() {
        file.file_name().map(Path::new).unwrap_or(file)
    } else {
        file.strip_prefix(root).unwrap_or(file)
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reads every collected file as one document. Unreadable files are returned
/// as `(path, reason)` instead of failing the whole load.
pub fn load_documents(path: &Path) -> (Vec<Document>, Vec<(String, String)>) {
    let files = collect_files(path);
    let loaded: Vec<(PathBuf, std::io::Result<String>)> = files
        .into_par_iter()
        .map(|file| {
            let text = fs::read_to_string(&file);
            (file, text)
        })
        .collect();

    let mut documents = Vec::new();
    let mut failed = Vec::new();
    for (file, text) in loaded {
        match text {
            Ok(text) => documents.push(Document::new(document_id(path, &file), text)),
            Err(e) => {
                warn!("Could not read {}: {}", file.display(), e);
                failed.push((file.display().to_string(), e.to_string()));
            }
        }
    }
    (documents, failed)
}

/// Outcome of [`analyze_path`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Same text the CLI prints.
    pub summary: String,
    /// Files that could not be read, with the reason.
    pub failed_files: Vec<(String, String)>,
    /// Documents left out of tf-idf.
    pub excluded_documents: Vec<String>,
    /// Written tables.
    pub outputs: Vec<PathBuf>,
}

impl AnalysisReport {
    /// Failed files followed by excluded documents, for display.
    pub fn warnings(&self) -> Vec<(String, String)> {
        self.failed_files
            .iter()
            .cloned()
            .chain(
                self.excluded_documents
                    .iter()
                    .map(|d| (d.clone(), "excluded: no usable terms".to_string())),
            )
            .collect()
    }
}

/// Loads `.txt` documents from `path`, analyzes them as one corpus and
/// exports every table to `options.output_dir`.
pub fn analyze_path(path: &Path, stopwords: Option<&Path>, options: &AnalysisOptions) -> Result<AnalysisReport> {
    options.validate()?;
    if !path.exists() {
        return Err(Error::invalid_argument(format!(
            "path does not exist: {}",
            path.display()
        )));
    }

    let stop = match stopwords {
        Some(p) => load_stopwords(p)?,
        None => StopwordSet::new(),
    };
    let (documents, failed_files) = load_documents(path);
    if documents.is_empty() {
        return Err(Error::invalid_argument(format!(
            "no readable .txt documents under {}",
            path.display()
        )));
    }
    info!("Loaded {} documents from {}", documents.len(), path.display());

    let analysis = analyze_documents(&documents, &stop, options)?;

    let writer = TableWriter::new(&options.output_dir, &stem_for(path), options.export_format);
    let outputs = vec![
        writer.write("terms", &analysis.term_counts.ranked())?,
        writer.write("tfidf", &rank(analysis.tf_idf.records.clone()))?,
        writer.write("pairs", &analysis.pair_counts)?,
        writer.write("correlations", &analysis.correlations)?,
        writer.write("nodes", &analysis.graph.node_table())?,
        writer.write("edges", analysis.graph.edges())?,
    ];
    info!("Wrote {} tables to {}", outputs.len(), options.output_dir.display());

    Ok(AnalysisReport {
        summary: analysis.summary(),
        failed_files,
        excluded_documents: analysis.excluded_documents,
        outputs,
    })
}

/// Prints a warnings block to stderr.
pub fn print_failed_files(failed: &[(String, String)]) {
    eprintln!("Warnings ({}):", failed.len());
    for (file, reason) in failed {
        eprintln!("  {file}: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("d1", "alpha beta gamma. alpha beta delta."),
            Document::new("d2", "alpha beta epsilon"),
            Document::new("d3", "gamma delta zeta"),
            Document::new("d4", "the the the"),
        ]
    }

    fn stop() -> StopwordSet {
        ["the"].into_iter().collect()
    }

    #[test]
    fn invalid_options_fail_before_work() {
        let mut o = AnalysisOptions::default();
        o.ngram = 0;
        assert!(matches!(o.validate(), Err(Error::InvalidArgument(_))));

        let mut o = AnalysisOptions::default();
        o.min_weight = -1.0;
        assert!(analyze_documents(&corpus(), &stop(), &o).is_err());

        let mut o = AnalysisOptions::default();
        o.graph_source = GraphSource::Ngrams;
        o.ngram = 1;
        assert!(o.validate().is_err());

        let mut o = AnalysisOptions::default();
        o.group_by = GroupBy::Section;
        o.section_size = 0;
        assert!(o.validate().is_err());
    }

    #[test]
    fn pipeline_excludes_empty_documents() {
        let a = analyze_documents(&corpus(), &stop(), &AnalysisOptions::default()).unwrap();
        assert_eq!(a.excluded_documents, vec!["d4".to_string()]);
        assert_eq!(a.tf_idf.total_documents, 3);
        assert_eq!(a.groups, 3);
        let ab = a
            .pair_counts
            .iter()
            .find(|p| p.item1 == "alpha" && p.item2 == "beta")
            .unwrap();
        assert_eq!(ab.n, 2);
        assert!(a.summary().contains("Top 20 correlations:"));
    }

    #[test]
    fn fail_policy_aborts() {
        let mut o = AnalysisOptions::default();
        o.empty_documents = EmptyDocumentPolicy::Fail;
        assert!(matches!(
            analyze_documents(&corpus(), &stop(), &o),
            Err(Error::EmptyDocument(id)) if id == "d4"
        ));
    }

    #[test]
    fn ngram_graph_is_directed_by_default() {
        let mut o = AnalysisOptions::default();
        o.graph_source = GraphSource::Ngrams;
        o.min_weight = 2.0;
        let a = analyze_documents(&corpus(), &stop(), &o).unwrap();
        assert!(a.graph.is_directed());
        assert_eq!(a.graph.edges(), &[Edge::new("alpha", "beta", 3.0)]);
    }

    #[test]
    fn directed_override_merges_ngram_orientations() {
        let docs = vec![Document::new("d", "alpha beta gamma beta alpha")];
        let mut o = AnalysisOptions::default();
        o.graph_source = GraphSource::Ngrams;
        o.min_weight = 1.0;

        let directed = analyze_documents(&docs, &StopwordSet::new(), &o).unwrap();
        assert!(directed.graph.is_directed());
        assert_eq!(directed.graph.edges().len(), 4);

        o.directed = Some(false);
        let undirected = analyze_documents(&docs, &StopwordSet::new(), &o).unwrap();
        assert!(!undirected.graph.is_directed());
        assert_eq!(
            undirected.graph.edges(),
            &[Edge::new("alpha", "beta", 1.0), Edge::new("beta", "gamma", 1.0)]
        );
        assert!(undirected.summary().contains("(undirected)"));
    }

    #[test]
    fn correlation_graph_can_be_forced_directed() {
        let mut o = AnalysisOptions::default();
        o.directed = Some(true);
        let a = analyze_documents(&corpus(), &stop(), &o).unwrap();
        assert!(a.graph.is_directed());
        assert!(a.summary().contains("(directed)"));
    }

    #[test]
    fn count_graph_uses_pair_counts() {
        let mut o = AnalysisOptions::default();
        o.graph_source = GraphSource::Counts;
        o.min_weight = 2.0;
        let a = analyze_documents(&corpus(), &stop(), &o).unwrap();
        assert!(!a.graph.is_directed());
        assert_eq!(
            a.graph.edges(),
            &[Edge::new("alpha", "beta", 2.0), Edge::new("delta", "gamma", 2.0)]
        );

        o.comparison = Comparison::Exclusive;
        let strict = analyze_documents(&corpus(), &stop(), &o).unwrap();
        assert!(strict.graph.edges().is_empty());
    }

    #[test]
    fn sections_become_groups() {
        let docs = vec![Document::new("book", "a b\nc d\na b\nc d")];
        let mut o = AnalysisOptions::default();
        o.group_by = GroupBy::Section;
        o.section_size = 1;
        o.min_group_frequency = 1;
        let a = analyze_documents(&docs, &StopwordSet::new(), &o).unwrap();
        assert_eq!(a.groups, 4);
        let ab = a.correlations.iter().find(|c| c.item1 == "a" && c.item2 == "b").unwrap();
        assert_eq!(ab.correlation, 1.0);
    }

    #[test]
    fn short_documents_are_dropped_from_tf_idf() {
        let mut o = AnalysisOptions::default();
        o.ngram = 1;
        o.min_document_tokens = 4;
        let a = analyze_documents(&corpus(), &stop(), &o).unwrap();
        assert_eq!(
            a.excluded_documents,
            vec!["d2".to_string(), "d3".to_string(), "d4".to_string()]
        );
        assert!(a.tf_idf.records.iter().all(|r| r.document == "d1"));
    }
}
