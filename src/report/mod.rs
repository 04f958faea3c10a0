//! Maintenance report assembly: charts, paginated layout, PDF output.

pub mod charts;
pub mod config;
pub mod fonts;
pub mod layout;
pub mod pdf;
pub mod summary;

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::inference::ScoredTable;

pub use charts::ChartFiles;
pub use config::ReportSettings;
pub use layout::{chunk_columns, layout_report, ChartImage, ChartSet, ColumnChunk, ReportDocument};
pub use pdf::PdfWriter;
pub use summary::ReportSummary;

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("scored table has no columns to lay out")]
    NoColumns,

    #[error("columns per page must be at least 1")]
    InvalidChunkSize,

    #[error("column width {width_mm:.1} mm is below the {min_mm:.1} mm minimum; lower columnsPerPage")]
    ColumnTooNarrow { width_mm: f64, min_mm: f64 },

    #[error("{setting} must be positive, got {value}")]
    NonPositive { setting: &'static str, value: f64 },

    #[error("usable page height {usable_mm:.1} mm cannot hold a {needed_mm:.1} mm block; enlarge the page or shrink the margins")]
    PageTooShort { usable_mm: f64, needed_mm: f64 },

    #[error("chart image '{0}' is missing")]
    MissingImage(String),

    #[error("chart image '{name}' could not be decoded: {source}")]
    CorruptImage {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("failed to render chart: {0}")]
    Chart(#[from] image::ImageError),

    #[error("failed to encode PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("report I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the full report for `scored` and return the PDF bytes.
///
/// Chart files exist only for the duration of this call.
pub fn generate_report(
    scored: &ScoredTable,
    settings: &ReportSettings,
    generated_at: Option<DateTime<Utc>>,
) -> Result<Vec<u8>, ReportError> {
    let document = {
        let chart_files = ChartFiles::render(scored.predictions())?;
        let charts = chart_files.load()?;
        layout_report(scored, charts, settings)?
    };

    let mut writer = PdfWriter::new();
    if let Some(date) = generated_at {
        writer = writer.with_creation_date(date);
    }
    let bytes = writer.write(&document)?;

    log_info!(
        "Report assembled: {} pages, {} engines, {} bytes",
        document.pages.len(),
        scored.n_rows(),
        bytes.len()
    );
    Ok(bytes)
}

/// Generate the report and write it to `path`; nothing is written on failure.
pub fn write_report(
    scored: &ScoredTable,
    settings: &ReportSettings,
    generated_at: Option<DateTime<Utc>>,
    path: &Path,
) -> Result<(), ReportError> {
    let bytes = generate_report(scored, settings, generated_at)?;

    // Write beside the target and rename so a failed write never leaves a truncated report.
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut staging = tempfile::NamedTempFile::new_in(dir)?;
    staging.write_all(&bytes)?;
    staging.persist(path).map_err(|err| err.error)?;

    log_info!("Report written to {}", path.display());
    Ok(())
}
