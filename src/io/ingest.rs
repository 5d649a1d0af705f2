//! Whitespace-delimited histogram ingest.
//!
//! Simulation and measurement histograms share one layout: one occupied bin
//! per line, at least three numeric columns `x y weight`, extra columns
//! ignored, `#` comment lines and blank lines skipped.
//!
//! Design goals:
//! - **Strict rows**: a malformed line is an error naming the file and line
//! - **No fitting logic here**: we only produce validated triples

use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::domain::{EventHistogram2D, HistogramEntry};
use crate::error::{AppError, Stage};

/// Read a histogram file and pivot it into a dense grid.
pub fn read_histogram(path: &Path) -> Result<EventHistogram2D, AppError> {
    let entries = read_histogram_entries(path)?;
    let hist = EventHistogram2D::from_entries(&entries).map_err(|e| e.at(Stage::Ingest).for_input(file_label(path)))?;
    debug!(
        file = %file_label(path),
        entries = entries.len(),
        columns = hist.n_columns(),
        "histogram loaded"
    );
    Ok(hist)
}

/// Read the `(x, y, weight)` triples of a histogram file.
pub fn read_histogram_entries(path: &Path) -> Result<Vec<HistogramEntry>, AppError> {
    let rows = read_numeric_rows(path, 3)?;
    Ok(rows
        .into_iter()
        .map(|r| HistogramEntry {
            x: r[0],
            y: r[1],
            weight: r[2],
        })
        .collect())
}

/// The leading `columns` numbers of every data line of a whitespace table.
///
/// Trailing columns are ignored, whatever they hold.
pub fn read_numeric_rows(path: &Path, columns: usize) -> Result<Vec<Vec<f64>>, AppError> {
    let label = file_label(path);
    let mut reader = whitespace_reader(path, false)?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        let has_more = reader
            .read_record(&mut record)
            .map_err(|e| AppError::data_shape(format!("Parse error: {e}")).at(Stage::Ingest).for_input(&label))?;
        if !has_more {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let fields = tokens(&record);
        if fields.is_empty() {
            continue;
        }
        if fields.len() < columns {
            return Err(AppError::data_shape(format!(
                "Line {line}: expected at least {columns} columns, found {}.",
                fields.len()
            ))
            .at(Stage::Ingest)
            .for_input(&label));
        }

        let row = fields[..columns]
            .iter()
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                AppError::data_shape(format!("Line {line}: non-numeric value ({e})."))
                    .at(Stage::Ingest)
                    .for_input(&label)
            })?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(AppError::data_shape("No data rows.").at(Stage::Ingest).for_input(label));
    }
    Ok(rows)
}

/// File name used to label a dataset in logs and errors.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Space-delimited `csv` reader skipping `#` comment lines.
///
/// Runs of spaces produce empty fields; use `tokens` to collapse them.
pub(crate) fn whitespace_reader(path: &Path, has_headers: bool) -> Result<csv::Reader<File>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open '{}': {e}", path.display()))
            .at(Stage::Ingest)
            .for_input(file_label(path))
    })?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b' ')
        .comment(Some(b'#'))
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(file))
}

/// Non-empty whitespace-separated tokens of a record (tabs included).
pub(crate) fn tokens(record: &StringRecord) -> Vec<&str> {
    record.iter().flat_map(str::split_whitespace).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn comments_blank_lines_and_extra_columns_are_tolerated() {
        let f = write_tmp("# emitted detected count\n\n1  1 10 extra\n2\t2 5\n  3 2   7\n");
        let entries = read_histogram_entries(f.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[1],
            HistogramEntry {
                x: 2.0,
                y: 2.0,
                weight: 5.0
            }
        );
        assert_eq!(entries[2].weight, 7.0);
    }

    #[test]
    fn short_row_is_a_data_shape_error_naming_the_line() {
        let f = write_tmp("1 1 10\n2 2\n");
        let err = read_histogram_entries(f.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert_eq!(err.stage(), Some(Stage::Ingest));
        assert!(err.message().contains("Line 2"));
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let f = write_tmp("1 1 ten\n");
        let err = read_histogram_entries(f.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_histogram(Path::new("/nonexistent/scone/hist.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.input(), Some("hist.txt"));
    }

    #[test]
    fn duplicated_bin_is_reported_against_the_file() {
        let f = write_tmp("1 1 10\n1 1 3\n");
        let err = read_histogram(f.path()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Ingest));
        assert!(err.input().is_some());
    }
}
