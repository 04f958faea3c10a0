//! Raster charts embedded in the report.
//!
//! Charts are written as PNG files into a private temporary directory that
//! lives exactly as long as the [`ChartFiles`] value.

use std::f64::consts::PI;
use std::path::PathBuf;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use super::layout::{ChartImage, ChartSet};
use super::{LayoutError, ReportError};
use crate::inference::Predictions;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const CHART_WIDTH_PX: u32 = 700;
pub const CHART_HEIGHT_PX: u32 = 500;
pub const HISTOGRAM_BINS: usize = 20;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

const PLOT_LEFT: u32 = 60;
const PLOT_RIGHT: u32 = 30;
const PLOT_TOP: u32 = 40;
const PLOT_BOTTOM: u32 = 50;

/// Bin counts over [0, 1]; 1.0 lands in the last bin.
pub fn histogram_counts(probabilities: &[f64], bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }
    for p in probabilities.iter().filter(|p| p.is_finite()) {
        let idx = ((p.clamp(0.0, 1.0) * bins as f64) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Failure probability distribution as black bars on a light grid.
pub fn render_histogram(probabilities: &[f64]) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH_PX, CHART_HEIGHT_PX, WHITE);
    let counts = histogram_counts(probabilities, HISTOGRAM_BINS);
    let max = counts.iter().copied().max().unwrap_or(0).max(1);

    let plot_w = CHART_WIDTH_PX - PLOT_LEFT - PLOT_RIGHT;
    let plot_h = CHART_HEIGHT_PX - PLOT_TOP - PLOT_BOTTOM;
    let base = PLOT_TOP + plot_h;

    for step in 1..=4 {
        let y = base - plot_h * step / 4;
        fill_rect(&mut img, PLOT_LEFT, y, plot_w, 1, GRID);
    }

    let bin_w = plot_w / HISTOGRAM_BINS as u32;
    for (bin, count) in counts.iter().enumerate() {
        let bar_h = (plot_h as usize * count / max) as u32;
        let x = PLOT_LEFT + bin as u32 * bin_w;
        fill_rect(&mut img, x + 1, base - bar_h, bin_w.saturating_sub(2), bar_h, BLACK);
    }

    fill_rect(&mut img, PLOT_LEFT, PLOT_TOP, 1, plot_h + 1, BLACK);
    fill_rect(&mut img, PLOT_LEFT, base, plot_w, 1, BLACK);
    img
}

/// Healthy (grey) versus at-risk (black) share as a pie.
pub fn render_pie(labels: &[u8]) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH_PX, CHART_HEIGHT_PX, WHITE);
    let total = labels.len();
    if total == 0 {
        return img;
    }
    let at_risk = labels.iter().filter(|l| **l == 1).count();
    let healthy_sweep = 2.0 * PI * (total - at_risk) as f64 / total as f64;

    let cx = f64::from(CHART_WIDTH_PX) / 2.0;
    let cy = f64::from(CHART_HEIGHT_PX) / 2.0;
    let radius = f64::from(CHART_HEIGHT_PX.min(CHART_WIDTH_PX)) * 0.4;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - cx;
        let dy = f64::from(y) + 0.5 - cy;
        if dx * dx + dy * dy > radius * radius {
            continue;
        }
        // Clockwise from twelve o'clock.
        let angle = dx.atan2(-dy).rem_euclid(2.0 * PI);
        *pixel = if angle < healthy_sweep { GRAY } else { BLACK };
    }
    img
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

/// The two chart PNGs for one report, deleted when dropped.
pub struct ChartFiles {
    dir: TempDir,
    histogram: PathBuf,
    pie: PathBuf,
}

impl ChartFiles {
    pub fn render(predictions: &Predictions) -> Result<Self, ReportError> {
        let dir = tempfile::Builder::new().prefix("enginehealth-charts").tempdir()?;
        let histogram = dir.path().join("hist_plot.png");
        let pie = dir.path().join("pie_plot.png");

        render_histogram(&predictions.probabilities).save_with_format(&histogram, ImageFormat::Png)?;
        render_pie(&predictions.labels).save_with_format(&pie, ImageFormat::Png)?;
        log_debug!("rendered charts into {}", dir.path().display());

        Ok(Self { dir, histogram, pie })
    }

    pub fn load(&self) -> Result<ChartSet, LayoutError> {
        Ok(ChartSet {
            histogram: ChartImage::load("histogram", &self.histogram)?,
            pie: ChartImage::load("pie", &self.pie)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_bins_cover_unit_interval() {
        let counts = histogram_counts(&[0.0, 0.04, 0.05, 0.5, 0.999, 1.0, f64::NAN], 20);
        assert_eq!(counts.len(), 20);
        assert_eq!(counts[0], 2);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[10], 1);
        assert_eq!(counts[19], 2);
        assert_eq!(counts.iter().sum::<usize>(), 6);
    }

    #[test]
    fn histogram_draws_bars_for_populated_bins() {
        let img = render_histogram(&[0.01, 0.01, 0.01]);
        let plot_bottom = CHART_HEIGHT_PX - PLOT_BOTTOM - 1;
        assert_eq!(*img.get_pixel(PLOT_LEFT + 10, plot_bottom), BLACK);
        assert_eq!(*img.get_pixel(PLOT_LEFT + 300, plot_bottom - 5), WHITE);
    }

    #[test]
    fn pie_splits_by_label_share() {
        let img = render_pie(&[0, 1]);
        let (cx, cy) = (CHART_WIDTH_PX / 2, CHART_HEIGHT_PX / 2);
        // Right half is the healthy sweep, left half at risk.
        assert_eq!(*img.get_pixel(cx + 50, cy), GRAY);
        assert_eq!(*img.get_pixel(cx - 50, cy), BLACK);
        assert_eq!(*img.get_pixel(2, 2), WHITE);
    }

    #[test]
    fn chart_files_are_removed_on_drop() {
        let preds = Predictions {
            labels: vec![0, 1, 1],
            probabilities: vec![0.1, 0.6, 0.95],
        };
        let files = ChartFiles::render(&preds).unwrap();
        let dir = files.dir.path().to_path_buf();
        assert!(files.histogram.exists() && files.pie.exists());

        let charts = files.load().unwrap();
        assert_eq!(charts.histogram.width_px, CHART_WIDTH_PX);
        assert_eq!(charts.pie.height_px, CHART_HEIGHT_PX);

        drop(files);
        assert!(!dir.exists());
    }
}
