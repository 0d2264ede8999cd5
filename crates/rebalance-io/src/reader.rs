//! CSV reader for the fertility dataset with full input validation.

use std::path::{Path, PathBuf};

use rebalance_data::LabeledTable;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{FERTILITY_PREDICTORS, fertility_schema, parse_label};

/// Reads the fertility dataset from a CSV file.
///
/// Columns are taken by position: nine predictors, then the diagnosis
/// (`N`/`O` or `normal`/`abnormal`). A header row is expected unless
/// disabled with [`FertilityReader::with_header`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows |
/// | [`IoError::WrongColumnCount`] | Row does not have 10 columns |
/// | [`IoError::NonFiniteValue`] | Predictor is NaN, Inf, or unparseable |
/// | [`IoError::UnknownLabel`] | Diagnosis is not a known symbol |
pub struct FertilityReader {
    path: PathBuf,
    has_header: bool,
}

impl FertilityReader {
    /// Create a reader for the given CSV file path.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            has_header: true,
        }
    }

    /// Set whether the first row is a header.
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display(), header = self.has_header))]
    pub fn read(&self) -> Result<LabeledTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets WrongColumnCount fire instead of a CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let expected = FERTILITY_PREDICTORS.len() + 1;
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected {
                return Err(IoError::WrongColumnCount {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            let mut values = Vec::with_capacity(expected - 1);
            for (col_index, raw) in record.iter().take(expected - 1).enumerate() {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })?;
                values.push(value);
            }

            let raw_label = record.get(expected - 1).unwrap_or("");
            let label = parse_label(raw_label).ok_or_else(|| IoError::UnknownLabel {
                path: self.path.clone(),
                row_index,
                raw: raw_label.to_string(),
            })?;

            rows.push(values);
            labels.push(label);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        debug!(n_rows = rows.len(), "rows parsed");

        let table = LabeledTable::new(fertility_schema(), rows, labels).map_err(|e| {
            IoError::InvalidTable {
                path: self.path.clone(),
                source: e,
            }
        })?;

        info!(
            n_records = table.n_records(),
            counts = %table.class_counts(),
            "dataset loaded"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rebalance_data::Label;
    use tempfile::NamedTempFile;

    use super::*;

    const HEADER: &str = "season,age,childish_diseases,accident_trauma,surgical_intervention,high_fevers,alcohol_frequency,smoking_habit,sitting_hours,diagnosis\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_with_header() {
        let csv = format!(
            "{HEADER}-0.33,0.69,0,1,1,0,0.8,0,0.88,N\n-0.33,0.94,1,0,1,0,0.8,1,0.31,O\n"
        );
        let f = write_csv(&csv);
        let table = FertilityReader::new(f.path()).read().unwrap();
        assert_eq!(table.n_records(), 2);
        assert_eq!(table.n_features(), 9);
        assert_eq!(table.labels(), &[Label::Normal, Label::Abnormal]);
        assert!((table.rows()[0][1] - 0.69).abs() < 1e-12);
        assert_eq!(table.feature_names()[8], "sitting_hours");
    }

    #[test]
    fn read_without_header() {
        let csv = "1,0.5,1,0,0,0,1,-1,0.25,normal\n-1,0.67,1,1,0,1,0.6,0,0.5,Abnormal\n";
        let f = write_csv(csv);
        let table = FertilityReader::new(f.path()).with_header(false).read().unwrap();
        assert_eq!(table.n_records(), 2);
        assert_eq!(table.class_counts().abnormal, 1);
    }

    #[test]
    fn error_file_not_found() {
        let result = FertilityReader::new(Path::new("/nonexistent/fertility.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv(HEADER);
        let result = FertilityReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_wrong_column_count() {
        let csv = format!("{HEADER}-0.33,0.69,0,1,1,0,0.8,0,0.88,N\n-0.33,0.69,0,1,1,0,0.8,N\n");
        let f = write_csv(&csv);
        let result = FertilityReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::WrongColumnCount {
                row_index: 1,
                expected: 10,
                got: 8,
                ..
            })
        ));
    }

    #[test]
    fn error_non_finite() {
        for bad in ["NaN", "inf", "abc"] {
            let csv = format!("{HEADER}-0.33,{bad},0,1,1,0,0.8,0,0.88,N\n");
            let f = write_csv(&csv);
            let result = FertilityReader::new(f.path()).read();
            assert!(
                matches!(result, Err(IoError::NonFiniteValue { col_index: 1, .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn error_unknown_label() {
        let csv = format!("{HEADER}-0.33,0.69,0,1,1,0,0.8,0,0.88,X\n");
        let f = write_csv(&csv);
        let result = FertilityReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::UnknownLabel { row_index: 0, ref raw, .. }) if raw == "X"
        ));
    }
}
