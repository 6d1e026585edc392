use std::{
    fs::File,
    path::{Path, PathBuf},
};

use csv::{ByteRecord, Reader, ReaderBuilder};
use itertools::Itertools;
use tracing::warn;

use crate::{
    config::ColumnNames,
    error::{PipelineError, RowError},
    model::AddressRecord,
    utils::{clean_field, strip_bom},
};

/// Lazily reads the data rows `[start, start + max)` of a CSV file in file
/// order. Opening the file again restarts the sequence. Blank lines are not
/// rows and do not count towards row indices.
pub struct RowSource {
    reader: Reader<File>,
    headers: Vec<String>,
    next: u64,
    end: Option<u64>,
    buf: ByteRecord,
}

impl RowSource {
    pub fn open(path: &Path, start: u64, max: Option<u64>) -> Result<Self, PipelineError> {
        let mut reader = open_reader(path)?;
        let headers = reader
            .byte_headers()
            .map_err(|source| unreadable(path, source))?
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let x = String::from_utf8_lossy(x);
                if i == 0 {
                    strip_bom(&x).to_string()
                } else {
                    x.into_owned()
                }
            })
            .collect();

        let mut buf = ByteRecord::new();
        let mut next = 0;
        while next < start {
            if !reader
                .read_byte_record(&mut buf)
                .map_err(|source| unreadable(path, source))?
            {
                warn!("{} has only {next} rows, nothing after row {start}", path.display());
                break;
            }
            next += 1;
        }

        Ok(Self {
            reader,
            headers,
            next: start,
            end: max.map(|x| start.saturating_add(x)),
            buf,
        })
    }

    /// Number of data rows in the file, without keeping any of them.
    pub fn count_rows(path: &Path) -> Result<u64, PipelineError> {
        let mut reader = open_reader(path)?;
        let mut buf = ByteRecord::new();
        let mut count = 0;
        while reader
            .read_byte_record(&mut buf)
            .map_err(|source| unreadable(path, source))?
        {
            count += 1;
        }
        Ok(count)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for RowSource {
    type Item = Result<AddressRecord, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some_and(|end| self.next >= end) {
            return None;
        }

        let index = self.next;
        match self.reader.read_byte_record(&mut self.buf) {
            Ok(true) => (),
            Ok(false) => return None,
            Err(source) => {
                self.end = Some(index);
                return Some(Err(RowError::Read { row: index, source }));
            }
        }
        self.next += 1;

        let record = AddressRecord {
            index,
            fields: self
                .buf
                .iter()
                .map(|x| String::from_utf8_lossy(x).into_owned())
                .collect(),
        };
        if record.fields.len() != self.headers.len() {
            return Some(Err(RowError::Malformed {
                record,
                expected: self.headers.len(),
            }));
        }
        Some(Ok(record))
    }
}

fn open_reader(path: &Path) -> Result<Reader<File>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound(path.to_path_buf()));
    }
    ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| unreadable(path, source))
}

fn unreadable(path: &Path, source: csv::Error) -> PipelineError {
    PipelineError::SourceUnreadable {
        path: PathBuf::from(path),
        source,
    }
}

/// Positions of the address-bearing columns, resolved from the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressColumns {
    street: usize,
    city: usize,
    state: usize,
    postcode: usize,
    organisation_id: Option<usize>,
}

impl AddressColumns {
    pub fn resolve(headers: &[String], names: &ColumnNames) -> Result<Self, PipelineError> {
        let find = |name: &str| headers.iter().position(|x| x.trim() == name);
        let require =
            |name: &str| find(name).ok_or_else(|| PipelineError::MissingColumn(name.to_string()));

        Ok(Self {
            street: require(&names.street)?,
            city: require(&names.city)?,
            state: require(&names.state)?,
            postcode: require(&names.postcode)?,
            organisation_id: find(&names.organisation_id),
        })
    }

    /// Joins the non-empty address parts with `", "`. Empty when every part
    /// is blank or `#N/A`.
    pub fn raw_address(&self, record: &AddressRecord) -> String {
        let street = clean_field(record.get(self.street)).map(|x| x.trim_end_matches(',').trim_end());
        [
            street,
            clean_field(record.get(self.city)),
            clean_field(record.get(self.state)),
            clean_field(record.get(self.postcode)),
        ]
        .into_iter()
        .flatten()
        .filter(|x| !x.is_empty())
        .join(", ")
    }

    /// Subtotal rows and rows without an organisation are never geocoded.
    pub fn is_excluded(&self, record: &AddressRecord) -> bool {
        if record.get(0).trim_start().starts_with("Subtotal") {
            return true;
        }
        match self.organisation_id {
            Some(column) => clean_field(record.get(column)).is_none(),
            None => false,
        }
    }
}
