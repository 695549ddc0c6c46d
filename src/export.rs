//! Flat table export: one file per record kind in TXT, CSV, TSV or JSON.
//!
//! Columns follow the field order of each record. File names are
//! `{stem}_{YYYYMMDD_HHMMSS}_{table}.{ext}`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::ValueEnum;
use csv::WriterBuilder;
use serde::Serialize;

use crate::error::Result;
use crate::frequency::TermCount;
use crate::graph::{Edge, NodeRecord};
use crate::pairwise::{PairCorrelation, PairCount};
use crate::tfidf::TfIdfRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Txt,
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

/// Neutralizes spreadsheet formula injection by prefixing a `'` to cells that
/// start with `=`, `+`, `-`, `@`, tab or carriage return. Cells that already
/// start with `'` are returned unchanged.
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

/// A record kind that can be written as a table row.
pub trait Tabular: Serialize {
    const HEADER: &'static [&'static str];
    /// Leading columns holding free text; only these are sanitized.
    const TEXT_COLUMNS: usize;

    fn row(&self) -> Vec<String>;
}

impl Tabular for TermCount {
    const HEADER: &'static [&'static str] = &["document", "term", "n"];
    const TEXT_COLUMNS: usize = 2;

    fn row(&self) -> Vec<String> {
        vec![self.document.clone(), self.term.clone(), self.n.to_string()]
    }
}

impl Tabular for TfIdfRecord {
    const HEADER: &'static [&'static str] = &["document", "term", "n", "tf", "idf", "tf_idf"];
    const TEXT_COLUMNS: usize = 2;

    fn row(&self) -> Vec<String> {
        vec![
            self.document.clone(),
            self.term.clone(),
            self.n.to_string(),
            self.tf.to_string(),
            self.idf.to_string(),
            self.tf_idf.to_string(),
        ]
    }
}

impl Tabular for PairCount {
    const HEADER: &'static [&'static str] = &["item1", "item2", "n"];
    const TEXT_COLUMNS: usize = 2;

    fn row(&self) -> Vec<String> {
        vec![self.item1.clone(), self.item2.clone(), self.n.to_string()]
    }
}

impl Tabular for PairCorrelation {
    const HEADER: &'static [&'static str] = &["item1", "item2", "correlation"];
    const TEXT_COLUMNS: usize = 2;

    fn row(&self) -> Vec<String> {
        vec![
            self.item1.clone(),
            self.item2.clone(),
            self.correlation.to_string(),
        ]
    }
}

impl Tabular for NodeRecord {
    const HEADER: &'static [&'static str] = &["node", "degree"];
    const TEXT_COLUMNS: usize = 1;

    fn row(&self) -> Vec<String> {
        vec![self.node.clone(), self.degree.to_string()]
    }
}

impl Tabular for Edge {
    const HEADER: &'static [&'static str] = &["from", "to", "weight"];
    const TEXT_COLUMNS: usize = 2;

    fn row(&self) -> Vec<String> {
        vec![self.from.clone(), self.to.clone(), self.weight.to_string()]
    }
}

/// Current local time as `YYYYMMDD_HHMMSS`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Where and how a run's tables are written.
#[derive(Debug, Clone)]
pub struct TableWriter {
    dir: PathBuf,
    stem: String,
    stamp: String,
    format: ExportFormat,
}

impl TableWriter {
    pub fn new<P: Into<PathBuf>>(dir: P, stem: &str, format: ExportFormat) -> Self {
        TableWriter {
            dir: dir.into(),
            stem: stem.to_owned(),
            stamp: timestamp(),
            format,
        }
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.{}",
            self.stem,
            self.stamp,
            table,
            self.format.extension()
        ))
    }

    /// Writes `rows` as table `table` and returns the file path.
    pub fn write<R: Tabular>(&self, table: &str, rows: &[R]) -> Result<PathBuf> {
        let path = self.path_for(table);
        let file = File::create(&path)?;
        match self.format {
            ExportFormat::Csv => write_delimited(file, b',', rows)?,
            ExportFormat::Tsv => write_delimited(file, b'\t', rows)?,
            ExportFormat::Json => {
                let mut out = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut out, rows)?;
                out.flush()?;
            }
            ExportFormat::Txt => write_txt(file, rows)?,
        }
        Ok(path)
    }
}

fn write_delimited<W: Write, R: Tabular>(out: W, delimiter: u8, rows: &[R]) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(out);
    wtr.write_record(R::HEADER)?;
    for record in rows {
        let cells: Vec<String> = record
            .row()
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                if i < R::TEXT_COLUMNS {
                    csv_safe_cell(cell)
                } else {
                    cell
                }
            })
            .collect();
        wtr.write_record(&cells)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_txt<W: Write, R: Tabular>(out: W, rows: &[R]) -> Result<()> {
    let mut out = BufWriter::new(out);
    writeln!(out, "{}", R::HEADER.join("\t"))?;
    for record in rows {
        writeln!(out, "{}", record.row().join("\t"))?;
    }
    out.flush()?;
    Ok(())
}

/// File stem used to name a run's outputs.
pub fn stem_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "corpus".to_string())
}
