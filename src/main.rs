#![forbid(unsafe_code)]
//! # Text Relations CLI
//!
//! Command-line front end for the `text_relations` crate. Every `.txt` file
//! under the given path is one document; the whole set is analyzed as a
//! single corpus.
//!
//! ## Outputs
//! - term counts and tf-idf per document
//! - pairwise co-occurrence counts and phi correlations
//! - node and edge tables of the relationship graph
//!
//! ## Example
//! ```bash
//! cargo run --release -- path/to/texts --ngram 2 --graph correlation --min-weight 0.2 --export-format csv
//! ```
//!
//! See `--help` for all available options.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;
use text_relations::{
    AnalysisOptions, Comparison, EmptyDocumentPolicy, ExportFormat, GraphSource, GroupBy,
    analyze_path, print_failed_files,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// File or directory of .txt documents to analyze
    path: PathBuf,

    /// Optional stopword file (.txt, one word per line)
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Size of N for N-gram counting and tf-idf (e.g. 2 for bigrams)
    #[arg(long, default_value_t = 2)]
    ngram: usize,

    /// Context for pairwise statistics (document, section)
    #[arg(long, default_value = "document")]
    group_by: GroupBy,

    /// Lines per section when grouping by section
    #[arg(long, default_value_t = 10)]
    section_size: usize,

    /// Minimum number of groups a word must appear in to be paired
    #[arg(long, default_value_t = 2)]
    min_group_frequency: u64,

    /// Leave documents with fewer terms out of tf-idf (0 = keep all)
    #[arg(long, default_value_t = 0)]
    min_document_tokens: u64,

    /// Statistic used for graph edges (ngrams, counts, correlation)
    #[arg(long = "graph", default_value = "correlation")]
    graph_source: GraphSource,

    /// Minimum edge weight kept in the graph
    #[arg(long, default_value_t = 0.15)]
    min_weight: f64,

    /// Threshold comparison (inclusive: >=, exclusive: >)
    #[arg(long, default_value = "inclusive")]
    comparison: Comparison,

    /// Force a directed (true) or undirected (false) graph
    #[arg(long)]
    directed: Option<bool>,

    /// What to do with documents without terms (skip, fail)
    #[arg(long, default_value = "skip")]
    empty_documents: EmptyDocumentPolicy,

    /// Abort if more distinct words than this would be paired
    #[arg(long)]
    max_vocabulary: Option<usize>,

    /// Output format for export (txt, csv, tsv, json)
    #[arg(long, default_value = "txt")]
    export_format: ExportFormat,

    /// Directory for exported tables
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let options = AnalysisOptions {
        ngram: cli.ngram,
        group_by: cli.group_by,
        section_size: cli.section_size,
        min_group_frequency: cli.min_group_frequency,
        min_document_tokens: cli.min_document_tokens,
        graph_source: cli.graph_source,
        min_weight: cli.min_weight,
        comparison: cli.comparison,
        directed: cli.directed,
        empty_documents: cli.empty_documents,
        max_vocabulary: cli.max_vocabulary,
        export_format: cli.export_format,
        output_dir: cli.out_dir,
    };

    match analyze_path(&cli.path, cli.stopwords.as_deref(), &options) {
        Ok(report) => {
            println!("{}", report.summary);
            let warnings = report.warnings();
            if !warnings.is_empty() {
                print_failed_files(&warnings);
            }
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
