//! Result persistence and chart rendering.
//!
//! Writes the raw metric arrays (plus enough metadata to replot them) to
//! `<output-dir>/raw_arrays` as JSON, and renders two SVG line charts:
//! loss-vs-coefficient on a logarithmic y-axis and accuracy-vs-coefficient
//! on a fixed [0, 100] × [-1, 2] frame. A missing or unwritable output
//! directory is fatal.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PaisajeError, Result};
use crate::sweep::{SweepMetrics, ALPHA_END, ALPHA_START};

/// File name of the serialized metric arrays.
pub const RAW_ARRAYS_FILE: &str = "raw_arrays";
/// File name of the loss chart.
pub const LOSS_CHART_FILE: &str = "loss.svg";
/// File name of the accuracy chart.
pub const ACC_CHART_FILE: &str = "acc.svg";

const CHART_SIZE: (u32, u32) = (960, 640);
const ALPHA_AXIS_LABEL: &str = "\u{3b1} (\u{3b8}' = \u{3b1} * w1 + (1 - \u{3b1}) * w2)";

/// The persisted result bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArrays {
    /// Mean loss on the test split, per coefficient.
    #[serde(rename = "test loss")]
    pub test_loss: Vec<f64>,
    /// Top-1 accuracy (%) on the test split, per coefficient.
    #[serde(rename = "test accuracy")]
    pub test_accuracy: Vec<f64>,
    /// Mean loss on the train split, per coefficient.
    #[serde(rename = "train loss")]
    pub train_loss: Vec<f64>,
    /// Top-1 accuracy (%) on the train split, per coefficient.
    #[serde(rename = "train accuracy")]
    pub train_accuracy: Vec<f64>,
    /// The coefficients themselves, in evaluation order.
    pub alphas: Vec<f64>,
    /// Architecture the checkpoints were evaluated as.
    pub arch: String,
    /// First checkpoint path.
    pub model1: String,
    /// Second checkpoint path.
    pub model2: String,
}

impl RawArrays {
    /// Bundle sweep metrics with run metadata.
    #[must_use]
    pub fn new(metrics: &SweepMetrics, arch: &str, model1: &str, model2: &str) -> Self {
        Self {
            test_loss: metrics.test_loss.clone(),
            test_accuracy: metrics.test_accuracy.clone(),
            train_loss: metrics.train_loss.clone(),
            train_accuracy: metrics.train_accuracy.clone(),
            alphas: metrics.alphas.clone(),
            arch: arch.to_string(),
            model1: model1.to_string(),
            model2: model2.to_string(),
        }
    }
}

/// Serialize the bundle to `<output_dir>/raw_arrays`.
///
/// # Errors
///
/// Fails if the directory is missing or unwritable.
pub fn write_raw_arrays(output_dir: &Path, raw: &RawArrays) -> Result<PathBuf> {
    let path = output_dir.join(RAW_ARRAYS_FILE);
    let json = serde_json::to_string_pretty(raw)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Deserialize a previously written bundle.
///
/// # Errors
///
/// Fails if the file is missing or not a valid bundle.
pub fn read_raw_arrays(output_dir: &Path) -> Result<RawArrays> {
    let json = std::fs::read_to_string(output_dir.join(RAW_ARRAYS_FILE))?;
    Ok(serde_json::from_str(&json)?)
}

/// Render both charts from the sweep metrics.
///
/// # Errors
///
/// Fails if the output directory is unwritable or rendering fails.
pub fn render_charts(output_dir: &Path, metrics: &SweepMetrics) -> Result<(PathBuf, PathBuf)> {
    let loss_path = output_dir.join(LOSS_CHART_FILE);
    render_loss_chart(&loss_path, metrics)?;
    let acc_path = output_dir.join(ACC_CHART_FILE);
    render_accuracy_chart(&acc_path, metrics)?;
    Ok((loss_path, acc_path))
}

/// Train/test loss against the coefficient axis, log-scaled y.
fn render_loss_chart(path: &Path, metrics: &SweepMetrics) -> Result<()> {
    let (y_min, y_max) = loss_axis_bounds(&metrics.train_loss, &metrics.test_loss);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(ALPHA_START..ALPHA_END, (y_min..y_max).log_scale())
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc(ALPHA_AXIS_LABEL)
        .y_desc("Cross Entropy Loss")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            series(&metrics.alphas, &metrics.train_loss),
            &BLUE,
        ))
        .map_err(chart_err)?
        .label("Train Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            series(&metrics.alphas, &metrics.test_loss),
            &RED,
        ))
        .map_err(chart_err)?
        .label("Test Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Train/test accuracy on a fixed [0, 100] × [-1, 2] frame.
fn render_accuracy_chart(path: &Path, metrics: &SweepMetrics) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(ALPHA_START..ALPHA_END, 0f64..100f64)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc(ALPHA_AXIS_LABEL)
        .y_desc("Top 1 Accuracy %")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            series(&metrics.alphas, &metrics.train_accuracy),
            &BLUE,
        ))
        .map_err(chart_err)?
        .label("Train Acc")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            series(&metrics.alphas, &metrics.test_accuracy),
            &RED,
        ))
        .map_err(chart_err)?
        .label("Test Acc")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

fn series<'a>(xs: &'a [f64], ys: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    xs.iter().copied().zip(ys.iter().copied())
}

/// Padded y bounds for the log loss axis; the lower bound stays strictly
/// positive even when a loss underflows to zero.
fn loss_axis_bounds(train: &[f64], test: &[f64]) -> (f64, f64) {
    let all = train.iter().chain(test.iter()).copied();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in all {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (1e-3, 1.0);
    }
    let min = (min * 0.8).max(1e-6);
    let max = (max * 1.25).max(min * 10.0);
    (min, max)
}

fn chart_err<E: std::fmt::Display>(e: E) -> PaisajeError {
    PaisajeError::Chart {
        reason: e.to_string(),
    }
}
