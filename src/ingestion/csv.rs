//! Delimited-text parsing into a [`RawRecordBatch`].

use std::path::Path;

use crate::error::{FileError, FileResult};
use crate::types::{RawRecordBatch, RawRow};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses one delimited-text file into raw rows.
///
/// Rules:
///
/// - The first non-blank line is the header row.
/// - A leading UTF-8 byte-order mark is removed before parsing.
/// - Every data row must have exactly as many fields as the header.
/// - Labels and values are kept verbatim; canonicalization happens in the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordParser {
    delimiter: u8,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl RecordParser {
    /// Parser using `delimiter` instead of a comma.
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Read `path` fully and parse it.
    ///
    /// A file without data rows yields an empty batch; callers record that as an advisory.
    pub fn parse_path(&self, path: impl AsRef<Path>) -> FileResult<RawRecordBatch> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| FileError::FileUnreadable {
            message: format!("{}: {e}", path.display()),
        })?;
        self.parse_bytes(path, &bytes)
    }

    /// Parse in-memory content attributed to `source`.
    pub fn parse_bytes(&self, source: impl AsRef<Path>, bytes: &[u8]) -> FileResult<RawRecordBatch> {
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut rdr = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(false)
            .from_reader(content);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_owned)
            .collect();

        let mut rows = Vec::new();
        for (idx0, result) in rdr.records().enumerate() {
            let record = result.map_err(malformed)?;
            // Fall back to a header-relative count if the reader lost track of position.
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(idx0 as u64 + 2);
            rows.push(RawRow {
                line,
                values: record.iter().map(str::to_owned).collect(),
            });
        }

        Ok(RawRecordBatch {
            source: source.as_ref().to_path_buf(),
            headers,
            rows,
        })
    }
}

fn malformed(err: ::csv::Error) -> FileError {
    match err.kind() {
        ::csv::ErrorKind::Io(io) => FileError::FileUnreadable {
            message: io.to_string(),
        },
        _ => FileError::MalformedDelimitedText {
            line: err.position().map(|p| p.line()),
            message: err.to_string(),
        },
    }
}
