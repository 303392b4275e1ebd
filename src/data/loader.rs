//! Spreadsheet Loader Module
//! Reads the coverage spreadsheet (`.xlsx` or `.csv`) into an untyped table.

use crate::data::xlsx::{self, XlsxError};
use crate::error::ErrorKind;
use polars::prelude::*;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("Unsupported input format: {0} (expected .xlsx or .csv)")]
    UnsupportedFormat(PathBuf),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

impl LoaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoaderError::Io { .. } => ErrorKind::Io,
            LoaderError::Csv { source, .. } if source.is_io_error() => ErrorKind::Io,
            LoaderError::Workbook {
                source: XlsxError::Io(_),
                ..
            } => ErrorKind::Io,
            _ => ErrorKind::Format,
        }
    }
}

/// Loads the raw sheet as a DataFrame of String columns `column_1..column_N`.
pub struct DataLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            file_path: None,
        }
    }

    /// Load a spreadsheet, dispatching on the file extension.
    pub fn load(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        let extension = file_path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let rows = match extension.as_str() {
            "xlsx" => Self::read_xlsx(file_path)?,
            "csv" => Self::read_csv(file_path)?,
            _ => return Err(LoaderError::UnsupportedFormat(file_path.to_path_buf())),
        };

        let df = Self::rows_to_frame(rows)?;
        self.file_path = Some(file_path.to_path_buf());
        Ok(self.df.insert(df))
    }

    fn open(file_path: &Path) -> Result<File, LoaderError> {
        File::open(file_path).map_err(|source| LoaderError::Io {
            path: file_path.to_path_buf(),
            source,
        })
    }

    fn read_xlsx(file_path: &Path) -> Result<Vec<Vec<String>>, LoaderError> {
        let file = Self::open(file_path)?;
        xlsx::read_first_sheet_from(file).map_err(|source| LoaderError::Workbook {
            path: file_path.to_path_buf(),
            source,
        })
    }

    fn read_csv(file_path: &Path) -> Result<Vec<Vec<String>>, LoaderError> {
        let file = Self::open(file_path)?;

        // Title row is usually a single cell, so rows are allowed to differ in width
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| LoaderError::Csv {
                path: file_path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    /// Pad ragged rows and turn them into String columns.
    pub fn rows_to_frame(rows: Vec<Vec<String>>) -> Result<DataFrame, LoaderError> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); width];

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or_default());
            }
        }

        let columns: Vec<Column> = columns
            .into_iter()
            .enumerate()
            .map(|(i, values)| Column::new(format!("column_{}", i + 1).into(), values))
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Get the number of rows in the raw table.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get file path.
    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::xlsx::tests::workbook_bytes;
    use std::fs;

    #[test]
    fn csv_rows_are_padded_to_widest_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.csv");
        fs::write(
            &path,
            "PCA coverage\nRegion,Nov SIA 2024,Dec NID 2024\nNorth,\"90.00%(90/100)\",\"1,000.00%(1,000/100)\"\n",
        )
        .unwrap();

        let mut loader = DataLoader::new();
        let df = loader.load(&path).unwrap();
        assert_eq!(df.shape(), (3, 3));
        let first = df.column("column_1").unwrap().str().unwrap();
        assert_eq!(first.get(0), Some("PCA coverage"));
        let third = df.column("column_3").unwrap().str().unwrap();
        assert_eq!(third.get(0), Some(""));
        assert_eq!(third.get(2), Some("1,000.00%(1,000/100)"));
        assert_eq!(loader.get_row_count(), 3);
        assert_eq!(loader.get_file_path(), Some(&path));
    }

    #[test]
    fn xlsx_is_read_from_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.xlsx");
        fs::write(
            &path,
            workbook_bytes(&[
                vec!["PCA coverage"],
                vec!["Region", "Nov SIA 2024"],
                vec!["North", "90.00%(90/100)"],
            ]),
        )
        .unwrap();

        let mut loader = DataLoader::new();
        let df = loader.load(&path).unwrap();
        assert_eq!(df.shape(), (3, 2));
        let second = df.column("column_2").unwrap().str().unwrap();
        assert_eq!(second.get(2), Some("90.00%(90/100)"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataLoader::new()
            .load(&dir.path().join("absent.xlsx"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = DataLoader::new().load(Path::new("coverage.ods")).unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedFormat(_)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn corrupt_workbook_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a zip").unwrap();
        let err = DataLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, LoaderError::Workbook { .. }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
