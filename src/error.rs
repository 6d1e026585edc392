use std::{io, path::PathBuf};

use thiserror::Error;

use crate::model::AddressRecord;

/// Errors that stop a geocoding run before or while it writes output.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("cannot read input {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("input header has no {0:?} column")]
    MissingColumn(String),

    #[error("cannot write output {}: {source}", path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(
        "output {} continues from row {cursor}, refusing to resume at row {start}",
        path.display()
    )]
    ResumeMismatch {
        path: PathBuf,
        cursor: u64,
        start: u64,
    },

    #[error("output {} was written for a different input header", path.display())]
    HeaderMismatch { path: PathBuf },
}

impl PipelineError {
    pub fn output(path: impl Into<PathBuf>, source: impl Into<csv::Error>) -> Self {
        Self::OutputUnwritable {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// A row the source could not hand over as a well-formed record.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("row {} has {} columns, expected {expected}", record.index, record.fields.len())]
    Malformed {
        record: AddressRecord,
        expected: usize,
    },

    #[error("failed to read row {row}: {source}")]
    Read {
        row: u64,
        #[source]
        source: csv::Error,
    },
}

/// Failure of a single geocoding provider call.
///
/// The enricher never propagates these; they only move a record on to the
/// next provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(Box<ureq::Error>),

    #[error("unreadable response: {0}")]
    Decode(#[from] io::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}
