//! Batch pipeline: load, clean, aggregate, chart, export.

use crate::charts::coverage::{summary_chart, trend_chart};
use crate::charts::ChartError;
use crate::config::PipelineConfig;
use crate::data::{DataLoader, DataProcessor, LoaderError, ProcessorError, REGION};
use crate::error::ErrorKind;
use crate::export::{ExportError, ExportReport, Exporter};
use crate::stats::{Aggregator, CampaignOrder, StatsError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Process(#[from] ProcessorError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Load(e) => e.kind(),
            PipelineError::Process(e) => e.kind(),
            PipelineError::Stats(e) => e.kind(),
            PipelineError::Chart(_) => ErrorKind::Format,
            PipelineError::Export(e) => e.kind(),
        }
    }
}

/// Run every stage once with `config` and return the written files.
pub fn run(config: &PipelineConfig) -> Result<ExportReport, PipelineError> {
    let mut loader = DataLoader::new();
    let raw = loader.load(&config.input_path)?.clone();
    if let Some(path) = loader.get_file_path() {
        info!(
            path = %path.display(),
            rows = loader.get_row_count(),
            columns = raw.width(),
            "loaded sheet"
        );
    }

    let mut tidy = DataProcessor::clean(
        &raw,
        config.header_row,
        &config.region_column,
        &config.excluded_regions,
    )?;
    let regions = DataProcessor::unique_in_order(&tidy, REGION)?;
    info!(rows = tidy.height(), regions = regions.len(), "cleaned coverage table");
    debug!(?regions, "regions");

    let summary = Aggregator::summary_view(&tidy)?;
    let order = CampaignOrder::new(&config.campaign_order, config.unknown_campaigns);
    let trend = Aggregator::trend_view(&tidy, &order)?;
    info!(
        summary_rows = summary.height(),
        trend_rows = trend.height(),
        "aggregated views"
    );

    let summary_spec = summary_chart(&Aggregator::summary_rows(&summary)?, config)?;
    let trend_spec = trend_chart(&Aggregator::trend_points(&trend)?, config)?;
    debug!(panels = trend_spec.panels.len(), "built chart descriptions");

    let report = Exporter::export(&summary_spec, &trend_spec, Some(&mut tidy), config)?;
    for file in report.files() {
        info!(path = %file.display(), "wrote");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fonts_available;
    use crate::config::UnknownCampaignPolicy;
    use crate::data::workbook_bytes;
    use std::fs;
    use std::path::Path;

    fn sheet() -> Vec<Vec<&'static str>> {
        vec![
            vec!["PCA Coverage by Region"],
            vec!["Region", "Dec NID 2024", "Nov SIA 2024"],
            vec!["North", "90.00%(90/100)", "80.00%(80/100)"],
            vec!["South", "95.50%(1,910/2,000)", ""],
            vec!["Total", "94.76%(2,000/2,100)", "80.00%(80/100)"],
        ]
    }

    fn config_for(input: &Path, out: &Path) -> PipelineConfig {
        PipelineConfig {
            input_path: input.to_path_buf(),
            output_dir: out.to_path_buf(),
            width: 600,
            height: 400,
            tidy_csv: Some("tidy.csv".into()),
            ..Default::default()
        }
    }

    #[test]
    fn xlsx_input_produces_all_outputs() {
        if !fonts_available() {
            eprintln!("no system font available, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pca.xlsx");
        fs::write(&input, workbook_bytes(&sheet())).unwrap();
        let config = config_for(&input, &dir.path().join("output"));

        let report = run(&config).unwrap();
        assert_eq!(report.slides, 2);
        for file in report.files() {
            assert!(file.exists(), "{} missing", file.display());
        }

        let tidy = fs::read_to_string(report.tidy_csv.unwrap()).unwrap();
        assert!(!tidy.contains("Total"));
        // 2 regions x 2 campaigns plus the header line
        assert_eq!(tidy.lines().count(), 5);
    }

    #[test]
    fn csv_input_matches_xlsx_shape() {
        if !fonts_available() {
            eprintln!("no system font available, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pca.csv");
        let content: String = sheet()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| format!("\"{}\"", cell))
                    .collect::<Vec<_>>()
                    .join(",")
                    + "\n"
            })
            .collect();
        fs::write(&input, content).unwrap();

        let report = run(&config_for(&input, &dir.path().join("output"))).unwrap();
        assert!(report.document.exists());
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir.path().join("absent.xlsx"), dir.path());
        let err = run(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn malformed_value_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pca.xlsx");
        fs::write(
            &input,
            workbook_bytes(&[
                vec!["title"],
                vec!["Region", "Nov SIA 2024"],
                vec!["North", "ninety percent"],
            ]),
        )
        .unwrap();

        let err = run(&config_for(&input, dir.path())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("ninety percent"));
    }

    #[test]
    fn unknown_campaign_can_be_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pca.xlsx");
        fs::write(
            &input,
            workbook_bytes(&[
                vec!["title"],
                vec!["Region", "Jun NID 2025"],
                vec!["North", "90.00%(90/100)"],
            ]),
        )
        .unwrap();
        let config = PipelineConfig {
            unknown_campaigns: UnknownCampaignPolicy::Reject,
            ..config_for(&input, dir.path())
        };

        let err = run(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Stats(StatsError::UnknownCampaign(_))));
    }
}
