//! Export Module
//! Renders each chart once, writes the PNG files and the slide deck.

use crate::charts::{ChartError, ChartRenderer, ChartSpec};
use crate::config::PipelineConfig;
use crate::error::ErrorKind;
use crate::ppt::{PptError, PptGenerator, SlideImage};
use polars::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot write presentation {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: PptError,
    },
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Io { .. }
            | ExportError::Document {
                source: PptError::Io(_),
                ..
            } => ErrorKind::Io,
            _ => ErrorKind::Format,
        }
    }
}

/// Files written by one export.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub summary_png: PathBuf,
    pub trend_png: PathBuf,
    pub document: PathBuf,
    pub tidy_csv: Option<PathBuf>,
    pub slides: usize,
}

impl ExportReport {
    /// Every written path, in write order.
    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![
            self.summary_png.as_path(),
            self.trend_png.as_path(),
            self.document.as_path(),
        ];
        if let Some(csv) = &self.tidy_csv {
            files.push(csv.as_path());
        }
        files
    }
}

pub struct Exporter;

impl Exporter {
    /// Write both charts as PNG and as a two-slide deck, summary first.
    ///
    /// `tidy` is written as CSV when the config names a tidy output.
    pub fn export(
        summary: &ChartSpec,
        trend: &ChartSpec,
        tidy: Option<&mut DataFrame>,
        config: &PipelineConfig,
    ) -> Result<ExportReport, ExportError> {
        fs::create_dir_all(&config.output_dir).map_err(|source| ExportError::Io {
            path: config.output_dir.clone(),
            source,
        })?;

        let (width, height) = (config.width, config.height);
        let mut slides = Vec::with_capacity(2);
        let mut report = ExportReport {
            summary_png: config.summary_png_path(),
            trend_png: config.trend_png_path(),
            document: config.document_path(),
            ..Default::default()
        };

        for (spec, path) in [(summary, &report.summary_png), (trend, &report.trend_png)] {
            let png = ChartRenderer::render_png(spec, width, height)?;
            Self::write_file(path, &png)?;
            debug!(path = %path.display(), bytes = png.len(), "wrote chart image");
            slides.push(SlideImage {
                title: spec.title.clone(),
                png,
                width_px: width,
                height_px: height,
            });
        }

        report.slides = PptGenerator::generate_ppt(&slides, &report.document, &summary.title)
            .map_err(|source| ExportError::Document {
                path: report.document.clone(),
                source,
            })?;
        debug!(path = %report.document.display(), slides = report.slides, "wrote presentation");

        if let (Some(path), Some(df)) = (config.tidy_csv_path(), tidy) {
            Self::write_csv(&path, df)?;
            debug!(path = %path.display(), rows = df.height(), "wrote tidy table");
            report.tidy_csv = Some(path);
        }

        info!(files = report.files().len(), "export complete");
        Ok(report)
    }

    fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        fs::write(path, bytes).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_csv(path: &Path, df: &mut DataFrame) -> Result<(), ExportError> {
        let mut file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fonts_available;
    use crate::charts::{Datum, Layer};
    use std::io::Read;
    use ::zip::ZipArchive;

    fn spec(title: &str) -> ChartSpec {
        ChartSpec::builder(title)
            .categories(vec!["North".into(), "South".into()])
            .panel(
                None,
                vec![
                    Datum {
                        category: 0,
                        group: 0,
                        value: 0.9,
                    },
                    Datum {
                        category: 1,
                        group: 0,
                        value: 0.8,
                    },
                ],
            )
            .layer(Layer::Points { size: 3 })
            .build()
            .unwrap()
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            output_dir: dir.join("out"),
            width: 400,
            height: 300,
            ..Default::default()
        }
    }

    #[test]
    fn writes_two_images_and_two_slide_deck() {
        if !fonts_available() {
            eprintln!("no system font available, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let report = Exporter::export(&spec("Summary"), &spec("Trend"), None, &config).unwrap();
        assert_eq!(report.slides, 2);
        assert_eq!(report.files().len(), 3);
        for path in [&report.summary_png, &report.trend_png] {
            let image = image::open(path).unwrap();
            assert_eq!((image.width(), image.height()), (400, 300));
        }

        let mut archive = ZipArchive::new(File::open(&report.document).unwrap()).unwrap();
        let mut slide = String::new();
        archive
            .by_name("ppt/slides/slide1.xml")
            .unwrap()
            .read_to_string(&mut slide)
            .unwrap();
        assert!(slide.contains("<a:t>Summary</a:t>"));
        assert!(archive.by_name("ppt/slides/slide2.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide3.xml").is_err());
    }

    #[test]
    fn writes_tidy_table_when_configured() {
        if !fonts_available() {
            eprintln!("no system font available, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            tidy_csv: Some("tidy.csv".into()),
            ..config_in(dir.path())
        };
        let mut df = df!("Region" => ["North"], "pct" => [0.9]).unwrap();

        let report =
            Exporter::export(&spec("Summary"), &spec("Trend"), Some(&mut df), &config).unwrap();
        let path = report.tidy_csv.unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("Region,pct"));
        assert!(content.contains("North,0.9"));
    }

    #[test]
    fn unwritable_output_dir_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let config = PipelineConfig {
            output_dir: blocker.join("out"),
            ..Default::default()
        };

        let err = Exporter::export(&spec("Summary"), &spec("Trend"), None, &config).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
