//! Coverage Charts - PCA Coverage Summary & Trend Reporting
//!
//! Reads the regional PCA coverage sheet, reshapes it into a tidy table and
//! writes a summary bar chart, a per-region trend chart and a slide deck.

mod charts;
mod config;
mod data;
mod error;
mod export;
mod pipeline;
mod ppt;
mod stats;

use anyhow::Context;
use config::{PipelineConfig, DEFAULT_CONFIG_FILE};
use std::path::Path;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// One-line failure report, prefixed with the error kind when known.
fn failure_message(e: &anyhow::Error) -> String {
    let kind = e
        .downcast_ref::<pipeline::PipelineError>()
        .map(|p| p.kind())
        .or_else(|| e.downcast_ref::<config::ConfigError>().map(|c| c.kind()));
    match kind {
        Some(kind) => format!("{kind}: {e:#}"),
        None => format!("{e:#}"),
    }
}

fn run() -> anyhow::Result<()> {
    let config = PipelineConfig::load(Path::new(DEFAULT_CONFIG_FILE))?;
    let report = pipeline::run(&config).with_context(|| {
        format!(
            "coverage charts failed for {}",
            config.input_path.display()
        )
    })?;
    println!(
        "Wrote {} files ({} slides) to {}",
        report.files().len(),
        report.slides,
        config.output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn failure_message_leads_with_error_kind() {
        let config = PipelineConfig {
            input_path: PathBuf::from("does/not/exist.xlsx"),
            ..Default::default()
        };
        let e = anyhow::Error::from(pipeline::run(&config).unwrap_err())
            .context("coverage charts failed");
        let message = failure_message(&e);
        assert!(message.starts_with("IOError: coverage charts failed: "));
        assert_eq!(message.lines().count(), 1);
    }

    #[test]
    fn failure_message_without_kind_is_plain() {
        let e = anyhow::anyhow!("boom");
        assert_eq!(failure_message(&e), "boom");
    }
}
