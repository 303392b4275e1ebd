//! Data Processor Module
//! Handles header promotion, the wide-to-long stack operation and coverage splitting.

use crate::data::coverage::{Coverage, CoverageParseError};
use crate::error::ErrorKind;
use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

/// Column names of the long table.
pub const REGION: &str = "Region";
pub const CAMPAIGN: &str = "Campaign";
pub const PCA_COVERAGE: &str = "PCA_Coverage";
pub const PCT: &str = "pct";
pub const NUMERATOR: &str = "numerator";
pub const DENOMINATOR: &str = "denominator";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Header row {row} not found (table has {height} rows)")]
    MissingHeaderRow { row: usize, height: usize },
    #[error("Duplicate column header '{0}'")]
    DuplicateHeader(String),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
    #[error("No campaign columns next to '{0}'")]
    NoCampaignColumns(String),
    #[error("Sheet row {row} ({region}, {campaign}): cannot parse '{value}': {source}")]
    Parse {
        row: usize,
        region: String,
        campaign: String,
        value: String,
        #[source]
        source: CoverageParseError,
    },
}

impl ProcessorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessorError::Parse { .. } => ErrorKind::Parse,
            _ => ErrorKind::Format,
        }
    }
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Promote `header_row` to column names and drop it with everything above it.
    ///
    /// Blank labels become `column_<n>`; duplicate non-empty labels are rejected.
    pub fn promote_header(df: &DataFrame, header_row: usize) -> Result<DataFrame, ProcessorError> {
        if header_row >= df.height() {
            return Err(ProcessorError::MissingHeaderRow {
                row: header_row,
                height: df.height(),
            });
        }

        let mut names: Vec<String> = Vec::with_capacity(df.width());
        let mut seen: HashSet<String> = HashSet::new();
        for (i, column) in df.get_columns().iter().enumerate() {
            let label = column
                .str()?
                .get(header_row)
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            if label.is_empty() {
                names.push(format!("column_{}", i + 1));
                continue;
            }
            if !seen.insert(label.clone()) {
                return Err(ProcessorError::DuplicateHeader(label));
            }
            names.push(label);
        }

        // A blank label may still collide with a real header called `column_<n>`
        let mut unique: HashSet<&str> = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !unique.insert(n.as_str())) {
            return Err(ProcessorError::DuplicateHeader(dup.clone()));
        }

        let offset = header_row + 1;
        let mut body = df.slice(offset as i64, df.height() - offset);
        body.set_column_names(names.iter().map(String::as_str))?;
        Ok(body)
    }

    /// Transform the wide table to long format (stack operation).
    ///
    /// Every column other than `region_col` is a campaign. Output columns:
    /// [`Region`, `Campaign`, `PCA_Coverage`], ordered by source row, then by
    /// campaign column.
    pub fn unpivot(df: &DataFrame, region_col: &str) -> Result<DataFrame, ProcessorError> {
        let region_series = df
            .column(region_col)
            .map_err(|_| ProcessorError::MissingColumn(region_col.to_string()))?
            .str()?;

        let campaign_cols: Vec<&Column> = df
            .get_columns()
            .iter()
            .filter(|col| col.name().as_str() != region_col)
            .collect();
        if campaign_cols.is_empty() {
            return Err(ProcessorError::NoCampaignColumns(region_col.to_string()));
        }
        let campaign_values = campaign_cols
            .iter()
            .map(|col| col.str())
            .collect::<PolarsResult<Vec<_>>>()?;

        let capacity = df.height() * campaign_cols.len();
        let mut regions: Vec<Option<&str>> = Vec::with_capacity(capacity);
        let mut campaigns: Vec<&str> = Vec::with_capacity(capacity);
        let mut coverage: Vec<Option<&str>> = Vec::with_capacity(capacity);

        for i in 0..df.height() {
            let region = region_series.get(i);
            for (col, values) in campaign_cols.iter().zip(&campaign_values) {
                regions.push(region);
                campaigns.push(col.name().as_str());
                coverage.push(values.get(i));
            }
        }

        let long = DataFrame::new(vec![
            Column::new(REGION.into(), regions),
            Column::new(CAMPAIGN.into(), campaigns),
            Column::new(PCA_COVERAGE.into(), coverage),
        ])?;

        Ok(long)
    }

    /// Split `PCA_Coverage` into `pct`, `numerator` and `denominator`.
    ///
    /// Blank cells stay null; any other value that doesn't parse fails the run
    /// with its sheet row, region and campaign. `first_sheet_row` is the
    /// one-based sheet row of the first data row; `df` must be in [`Self::unpivot`] order.
    pub fn split_coverage(
        df: &DataFrame,
        first_sheet_row: usize,
    ) -> Result<DataFrame, ProcessorError> {
        let regions = df.column(REGION)?.str()?;
        let campaigns = df.column(CAMPAIGN)?.str()?;
        let raw = df.column(PCA_COVERAGE)?.str()?;
        let per_row = Self::unique_in_order(df, CAMPAIGN)?.len().max(1);

        let mut pct: Vec<Option<f64>> = Vec::with_capacity(df.height());
        let mut numerator: Vec<Option<i64>> = Vec::with_capacity(df.height());
        let mut denominator: Vec<Option<i64>> = Vec::with_capacity(df.height());

        for (i, value) in raw.into_iter().enumerate() {
            let value = value.map(str::trim).unwrap_or_default();
            if value.is_empty() {
                pct.push(None);
                numerator.push(None);
                denominator.push(None);
                continue;
            }

            let parsed = Coverage::parse(value).map_err(|source| ProcessorError::Parse {
                row: first_sheet_row + i / per_row,
                region: regions.get(i).unwrap_or_default().to_string(),
                campaign: campaigns.get(i).unwrap_or_default().to_string(),
                value: value.to_string(),
                source,
            })?;
            pct.push(Some(parsed.pct));
            numerator.push(Some(parsed.numerator));
            denominator.push(Some(parsed.denominator));
        }

        let split = DataFrame::new(vec![
            df.column(REGION)?.clone(),
            df.column(CAMPAIGN)?.clone(),
            Column::new(PCT.into(), pct),
            Column::new(NUMERATOR.into(), numerator),
            Column::new(DENOMINATOR.into(), denominator),
        ])?;

        Ok(split)
    }

    /// Drop aggregate rows such as `Total` and rows without a region name.
    pub fn drop_regions(df: &DataFrame, excluded: &[String]) -> Result<DataFrame, ProcessorError> {
        let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
        let mask: BooleanChunked = df
            .column(REGION)?
            .str()?
            .into_iter()
            .map(|region| {
                let region = region.map(str::trim).unwrap_or_default();
                !region.is_empty() && !excluded.contains(region)
            })
            .collect();

        Ok(df.filter(&mask)?)
    }

    /// Full cleaning pass: header promotion, unpivot, split, region filter.
    pub fn clean(
        raw: &DataFrame,
        header_row: usize,
        region_col: &str,
        excluded: &[String],
    ) -> Result<DataFrame, ProcessorError> {
        let wide = Self::promote_header(raw, header_row)?;
        let long = Self::unpivot(&wide, region_col)?;
        let split = Self::split_coverage(&long, header_row + 2)?;
        Self::drop_regions(&split, excluded)
    }

    /// Get unique values of a column in first-seen order.
    pub fn unique_in_order(df: &DataFrame, column: &str) -> Result<Vec<String>, ProcessorError> {
        let mut seen = HashSet::new();
        let values = df
            .column(column)?
            .str()?
            .into_iter()
            .flatten()
            .filter(|v| seen.insert(*v))
            .map(str::to_string)
            .collect();
        Ok(values)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::DataLoader;

    pub(crate) fn raw_frame(rows: &[&[&str]]) -> DataFrame {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect();
        DataLoader::rows_to_frame(rows).unwrap()
    }

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn header_row_becomes_column_names() {
        let raw = raw_frame(&[
            &["PCA Coverage 2024-25", "", ""],
            &["Region", "Nov SIA 2024", "Dec NID 2024"],
            &["North", "90.00%(90/100)", "80.00%(80/100)"],
            &["South", "70.00%(70/100)", "60.00%(60/100)"],
        ]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        assert_eq!(wide.height(), 2);
        let names: Vec<&str> = wide.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Region", "Nov SIA 2024", "Dec NID 2024"]);
        assert_eq!(
            strings(&wide, "Region"),
            vec![Some("North".to_string()), Some("South".to_string())]
        );
    }

    #[test]
    fn blank_header_labels_get_positional_names() {
        let raw = raw_frame(&[&["Title", ""], &["Region", " "], &["North", "x"]]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        assert!(wide.column("column_2").is_ok());
    }

    #[test]
    fn duplicate_header_is_a_format_error() {
        let raw = raw_frame(&[
            &["Title", "", ""],
            &["Region", "Nov SIA 2024", "Nov SIA 2024"],
            &["North", "1%(1/100)", "2%(2/100)"],
        ]);
        let err = DataProcessor::promote_header(&raw, 1).unwrap_err();
        assert!(matches!(err, ProcessorError::DuplicateHeader(ref h) if h == "Nov SIA 2024"));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn header_row_past_end_is_rejected() {
        let raw = raw_frame(&[&["Title"]]);
        assert!(matches!(
            DataProcessor::promote_header(&raw, 1),
            Err(ProcessorError::MissingHeaderRow { row: 1, height: 1 })
        ));
    }

    #[test]
    fn unpivot_yields_every_region_campaign_pair_once() {
        let raw = raw_frame(&[
            &["Title", "", "", ""],
            &["Region", "Nov SIA 2024", "Dec NID 2024", "Feb NID 2025"],
            &["North", "a", "b", "c"],
            &["South", "d", "e", "f"],
        ]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        let long = DataProcessor::unpivot(&wide, "Region").unwrap();

        assert_eq!(long.height(), 2 * 3);
        let regions = strings(&long, REGION);
        let campaigns = strings(&long, CAMPAIGN);
        let values = strings(&long, PCA_COVERAGE);
        let expected = [
            ("North", "Nov SIA 2024", "a"),
            ("North", "Dec NID 2024", "b"),
            ("North", "Feb NID 2025", "c"),
            ("South", "Nov SIA 2024", "d"),
            ("South", "Dec NID 2024", "e"),
            ("South", "Feb NID 2025", "f"),
        ];
        for (i, (r, c, v)) in expected.iter().enumerate() {
            assert_eq!(regions[i].as_deref(), Some(*r));
            assert_eq!(campaigns[i].as_deref(), Some(*c));
            assert_eq!(values[i].as_deref(), Some(*v));
        }
    }

    #[test]
    fn unpivot_requires_region_column() {
        let raw = raw_frame(&[&["Title", ""], &["Province", "Nov SIA 2024"], &["North", "x"]]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        assert!(matches!(
            DataProcessor::unpivot(&wide, "Region"),
            Err(ProcessorError::MissingColumn(_))
        ));
    }

    #[test]
    fn unpivot_requires_campaign_columns() {
        let raw = raw_frame(&[&["Title"], &["Region"], &["North"]]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        assert!(matches!(
            DataProcessor::unpivot(&wide, "Region"),
            Err(ProcessorError::NoCampaignColumns(_))
        ));
    }

    #[test]
    fn split_parses_all_three_numbers() {
        let raw = raw_frame(&[
            &["Title", ""],
            &["Region", "Nov SIA 2024"],
            &["North", "1,012.35%(1,234/121,950)"],
            &["South", ""],
        ]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        let long = DataProcessor::unpivot(&wide, "Region").unwrap();
        let split = DataProcessor::split_coverage(&long, 3).unwrap();

        let pct = split.column(PCT).unwrap().f64().unwrap();
        let num = split.column(NUMERATOR).unwrap().i64().unwrap();
        let den = split.column(DENOMINATOR).unwrap().i64().unwrap();
        assert_eq!(pct.get(0), Some(1012.35));
        assert_eq!(num.get(0), Some(1234));
        assert_eq!(den.get(0), Some(121_950));
        assert_eq!((pct.get(1), num.get(1), den.get(1)), (None, None, None));
    }

    #[test]
    fn split_reports_offending_row_and_value() {
        let raw = raw_frame(&[
            &["Title", "", ""],
            &["Region", "Nov SIA 2024", "Dec NID 2024"],
            &["North", "90.00%(90/100)", "eighty"],
        ]);
        let wide = DataProcessor::promote_header(&raw, 1).unwrap();
        let long = DataProcessor::unpivot(&wide, "Region").unwrap();
        let err = DataProcessor::split_coverage(&long, 3).unwrap_err();

        match &err {
            ProcessorError::Parse {
                row,
                region,
                campaign,
                value,
                ..
            } => {
                // third line of the sheet
                assert_eq!(*row, 3);
                assert_eq!(region, "North");
                assert_eq!(campaign, "Dec NID 2024");
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn clean_drops_total_row() {
        let raw = raw_frame(&[
            &["Title", ""],
            &["Region", "Nov SIA 2024"],
            &["North", "90.00%(90/100)"],
            &["Total", "90.00%(90/100)"],
        ]);
        let clean = DataProcessor::clean(&raw, 1, "Region", &["Total".to_string()]).unwrap();
        assert_eq!(clean.height(), 1);
        assert_eq!(
            DataProcessor::unique_in_order(&clean, REGION).unwrap(),
            vec!["North".to_string()]
        );
    }

    #[test]
    fn clean_drops_blank_region_rows() {
        let raw = raw_frame(&[
            &["Title", ""],
            &["Region", "Nov SIA 2024"],
            &["North", "90.00%(90/100)"],
            &["  ", ""],
            &["South", "80.00%(80/100)"],
        ]);
        let clean = DataProcessor::clean(&raw, 1, "Region", &[]).unwrap();
        assert_eq!(
            DataProcessor::unique_in_order(&clean, REGION).unwrap(),
            vec!["North".to_string(), "South".to_string()]
        );
    }

    #[test]
    fn parse_error_names_sheet_row() {
        let raw = raw_frame(&[
            &["Title", "", ""],
            &["Region", "Nov SIA 2024", "Dec NID 2024"],
            &["North", "90.00%(90/100)", "80.00%(80/100)"],
            &["South", "70.00%(70/100)", "bad"],
        ]);
        let err = DataProcessor::clean(&raw, 1, "Region", &[]).unwrap_err();
        assert!(matches!(err, ProcessorError::Parse { row: 4, .. }));
        assert!(err.to_string().starts_with("Sheet row 4 (South, Dec NID 2024)"));
    }

    #[test]
    fn unique_in_order_keeps_first_seen_order() {
        let raw = raw_frame(&[
            &["Title", "", ""],
            &["Region", "Nov SIA 2024", "Dec NID 2024"],
            &["Zeta", "1%(1/100)", "1%(1/100)"],
            &["Alpha", "1%(1/100)", "1%(1/100)"],
        ]);
        let clean = DataProcessor::clean(&raw, 1, "Region", &[]).unwrap();
        assert_eq!(
            DataProcessor::unique_in_order(&clean, REGION).unwrap(),
            vec!["Zeta".to_string(), "Alpha".to_string()]
        );
        assert_eq!(
            DataProcessor::unique_in_order(&clean, CAMPAIGN).unwrap(),
            vec!["Nov SIA 2024".to_string(), "Dec NID 2024".to_string()]
        );
    }
}
