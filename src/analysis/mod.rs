//! CSV grade report
//!
//! Reads `name,age,grade1,grade2,...` rows, averages each row's grades and
//! reports the names whose average is strictly above a threshold.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: expected at least name and age, found {fields} field(s)")]
    MalformedRow { line: u64, fields: usize },

    #[error("Line {line}, column {column}: '{value}' is not a number")]
    InvalidGrade { line: u64, column: usize, value: String },

    #[error("Line {line}: no grades to average (division by zero)")]
    EmptyGrades { line: u64 },
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub name: String,
    pub age: String,
    pub grades: Vec<f64>,
    pub line: u64,
}

impl StudentRow {
    /// Arithmetic mean of the grades. An empty grade list is an error rather
    /// than NaN.
    pub fn average(&self) -> AnalysisResult<f64> {
        if self.grades.is_empty() {
            return Err(AnalysisError::EmptyGrades { line: self.line });
        }
        let sum: f64 = self.grades.iter().sum();
        Ok(sum / self.grades.len() as f64)
    }
}

/// One reported row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeAverage {
    pub name: String,
    pub average: f64,
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub threshold: f64,
    pub delimiter: u8,
    /// Log and skip rows that fail to parse instead of aborting.
    pub skip_invalid: bool,
}

impl AnalysisOptions {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            delimiter: b',',
            skip_invalid: false,
        }
    }
}

pub fn parse_row(record: &StringRecord, line: u64) -> AnalysisResult<StudentRow> {
    if record.len() < 2 {
        return Err(AnalysisError::MalformedRow {
            line,
            fields: record.len(),
        });
    }

    let grades = record
        .iter()
        .enumerate()
        .skip(2)
        .map(|(column, raw)| {
            raw.trim().parse::<f64>().map_err(|_| AnalysisError::InvalidGrade {
                line,
                column: column + 1,
                value: raw.to_string(),
            })
        })
        .collect::<AnalysisResult<Vec<f64>>>()?;

    Ok(StudentRow {
        name: record[0].to_string(),
        age: record[1].to_string(),
        grades,
        line,
    })
}

pub fn analyze_csv(path: impl AsRef<Path>, threshold: f64) -> AnalysisResult<Vec<GradeAverage>> {
    analyze_with(path, &AnalysisOptions::new(threshold))
}

pub fn analyze_with(
    path: impl AsRef<Path>,
    options: &AnalysisOptions,
) -> AnalysisResult<Vec<GradeAverage>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AnalysisError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut above = Vec::new();
    let mut rows = 0usize;
    let mut skipped = 0usize;

    for record in rdr.records() {
        let outcome = record
            .map_err(AnalysisError::from)
            .and_then(|record| {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                let row = parse_row(&record, line)?;
                let average = row.average()?;
                Ok((row, average))
            });

        let (row, average) = match outcome {
            Ok(parsed) => parsed,
            Err(e) if options.skip_invalid => {
                warn!("Skipping row: {}", e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        rows += 1;
        debug!(name = %row.name, age = %row.age, average, "Row averaged");

        if average > options.threshold {
            above.push(GradeAverage {
                name: row.name,
                average,
            });
        }
    }

    info!(
        "Analyzed {} row(s) from {}: {} above {}, {} skipped",
        rows,
        path.display(),
        above.len(),
        options.threshold,
        skipped
    );

    Ok(above)
}

pub fn print_report<W: Write>(entries: &[GradeAverage], threshold: f64, out: &mut W) -> std::io::Result<()> {
    for entry in entries {
        writeln!(out, "{} has average above {:?}", entry.name, threshold)?;
    }
    Ok(())
}

pub fn print_report_json<W: Write>(entries: &[GradeAverage], out: &mut W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, entries)?;
    writeln!(out)
}
