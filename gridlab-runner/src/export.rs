//! CSV export of study results.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use thiserror::Error;

use crate::metrics::PerformanceReport;
use crate::params::ParamSet;
use crate::study::Study;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write one row per param set per phase: headline metrics plus the
/// parameter assignment rendered as `name=value` pairs.
pub fn write_study_csv<W: Write>(study: &Study, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "phase",
        "param_set_id",
        "params",
        "sharpe",
        "prr",
        "profit_factor",
        "cagr",
        "max_drawdown",
        "trade_count",
    ])?;

    for param_set in &study.training_param_sets {
        if let Some(report) = study.training_results.get(&param_set.id) {
            write_row(&mut csv_writer, "training", param_set, report)?;
        }
    }
    for param_set in &study.validation_param_sets {
        if let Some(report) = study.validation_results.get(&param_set.id) {
            write_row(&mut csv_writer, "validation", param_set, report)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

fn write_row<W: Write>(
    csv_writer: &mut csv::Writer<W>,
    phase: &str,
    param_set: &ParamSet,
    report: &PerformanceReport,
) -> Result<(), ExportError> {
    let params = param_set
        .params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    csv_writer.write_record([
        phase.to_string(),
        param_set.id.clone(),
        params,
        format!("{}", report.portfolio.sharpe),
        format!("{}", report.trade.prr),
        format!("{}", report.trade.profit_factor),
        format!("{}", report.portfolio.cagr),
        format!("{}", report.portfolio.max_drawdown),
        report.trade.trade_count.to_string(),
    ])?;
    Ok(())
}

/// Convenience wrapper writing straight to a file path.
pub fn write_study_csv_path(study: &Study, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_study_csv(study, file).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
