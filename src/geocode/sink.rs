use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use csv::{ByteRecord, ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::PipelineError,
    model::{EnrichedRecord, DERIVED_COLUMNS},
};

/// Written next to the output when it is created. The run cursor of an
/// output is `first_row` plus the number of data rows it holds.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCursor {
    pub input: PathBuf,
    pub first_row: u64,
}

pub fn cursor_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|x| x.to_os_string())
        .unwrap_or_default();
    name.push(".cursor.json");
    output.with_file_name(name)
}

pub fn output_header(input_headers: &[String]) -> Vec<String> {
    input_headers
        .iter()
        .cloned()
        .chain(DERIVED_COLUMNS.iter().map(|x| x.to_string()))
        .collect()
}

/// The row a run appending to `output` has to start from, or `None` when
/// there is no output yet.
pub fn next_row(output: &Path) -> Result<Option<u64>, PipelineError> {
    Ok(existing(output)?.map(|(_, next)| next))
}

fn existing(output: &Path) -> Result<Option<(Vec<String>, u64)>, PipelineError> {
    if !output.exists() {
        return Ok(None);
    }
    let first_row = read_cursor(output)?.map_or(0, |x| x.first_row);

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(output)
        .map_err(|e| PipelineError::output(output, e))?;
    let header = reader
        .byte_headers()
        .map_err(|e| PipelineError::output(output, e))?
        .iter()
        .map(|x| String::from_utf8_lossy(x).into_owned())
        .collect();

    let mut buf = ByteRecord::new();
    let mut rows = 0;
    while reader
        .read_byte_record(&mut buf)
        .map_err(|e| PipelineError::output(output, e))?
    {
        rows += 1;
    }

    Ok(Some((header, first_row + rows)))
}

fn read_cursor(output: &Path) -> Result<Option<RunCursor>, PipelineError> {
    let path = cursor_path(output);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).map_err(|e| PipelineError::output(&path, e))?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| PipelineError::output(&path, io::Error::from(e)))
}

fn write_cursor(output: &Path, cursor: &RunCursor) -> Result<(), PipelineError> {
    let path = cursor_path(output);
    let raw = serde_json::to_string_pretty(cursor)
        .map_err(|e| PipelineError::output(&path, io::Error::from(e)))?;
    fs::write(&path, raw).map_err(|e| PipelineError::output(&path, e))
}

/// Appends enriched rows to the output CSV, flushing each one.
pub struct SinkWriter {
    path: PathBuf,
    writer: Writer<File>,
    width: usize,
    written: u64,
}

impl SinkWriter {
    /// Without `start` the output is (re)created. With `start`, an existing
    /// output is appended to only if its header matches and its cursor is
    /// exactly `start`; a missing output is created for a run beginning at
    /// `start`.
    pub fn open(
        output: &Path,
        input: &Path,
        input_headers: &[String],
        start: Option<u64>,
    ) -> Result<Self, PipelineError> {
        let header = output_header(input_headers);

        let previous = match start {
            Some(_) => existing(output)?,
            None => None,
        };
        let appending = match (start, previous) {
            (Some(start), Some((found, cursor))) => {
                if found != header {
                    return Err(PipelineError::HeaderMismatch {
                        path: output.to_path_buf(),
                    });
                }
                if cursor != start {
                    return Err(PipelineError::ResumeMismatch {
                        path: output.to_path_buf(),
                        cursor,
                        start,
                    });
                }
                true
            }
            _ => false,
        };

        let writer = if appending {
            if let Some(cursor) = read_cursor(output)? {
                if cursor.input != input {
                    warn!(
                        "{} was started from {}, continuing with {}",
                        output.display(),
                        cursor.input.display(),
                        input.display()
                    );
                }
            }
            info!("Appending to {} from row {}", output.display(), start.unwrap_or(0));
            let file = OpenOptions::new()
                .append(true)
                .open(output)
                .map_err(|e| PipelineError::output(output, e))?;
            Writer::from_writer(file)
        } else {
            info!("Writing {}", output.display());
            let file = File::create(output).map_err(|e| PipelineError::output(output, e))?;
            write_cursor(
                output,
                &RunCursor {
                    input: input.to_path_buf(),
                    first_row: start.unwrap_or(0),
                },
            )?;
            let mut writer = Writer::from_writer(file);
            writer
                .write_record(&header)
                .and_then(|_| writer.flush().map_err(csv::Error::from))
                .map_err(|e| PipelineError::output(output, e))?;
            writer
        };

        Ok(Self {
            path: output.to_path_buf(),
            writer,
            width: input_headers.len(),
            written: 0,
        })
    }

    pub fn write(&mut self, record: &EnrichedRecord) -> Result<(), PipelineError> {
        self.writer
            .write_record(record.to_row(self.width))
            .map_err(|e| PipelineError::output(&self.path, e))?;
        self.writer
            .flush()
            .map_err(|e| PipelineError::output(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
