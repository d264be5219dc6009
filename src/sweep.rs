//! Coefficient sweep over the segment (and beyond) between two models.
//!
//! Coefficients are evenly spaced over [-1, 2]: the endpoints deliberately
//! probe extrapolation past both checkpoints, not just the path between
//! them. Each coefficient is evaluated sequentially and in order.

use crate::data::DataLoader;
use crate::error::Result;
use crate::eval::{evaluate, Evaluation};
use crate::interpolate::interpolate;
use crate::loader::LoadedModel;

/// Start of the coefficient range.
pub const ALPHA_START: f64 = -1.0;
/// End of the coefficient range.
pub const ALPHA_END: f64 = 2.0;

/// `n` evenly spaced values over `[start, stop]`, endpoints included.
///
/// `n == 1` yields just the start value; `n == 0` yields nothing.
#[must_use]
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        start + i as f64 * step
                    }
                })
                .collect()
        }
    }
}

/// Per-coefficient metrics, four parallel sequences aligned by index.
#[derive(Debug, Clone, Default)]
pub struct SweepMetrics {
    /// Interpolation coefficients, in evaluation order.
    pub alphas: Vec<f64>,
    /// Mean loss on the test split.
    pub test_loss: Vec<f64>,
    /// Top-1 accuracy (%) on the test split.
    pub test_accuracy: Vec<f64>,
    /// Mean loss on the train split.
    pub train_loss: Vec<f64>,
    /// Top-1 accuracy (%) on the train split.
    pub train_accuracy: Vec<f64>,
}

/// Drive `eval_at` over every coefficient in order, accumulating metrics.
///
/// `eval_at` returns the (test, train) evaluations for one coefficient.
///
/// # Errors
///
/// Propagates the first evaluation failure.
pub fn sweep_with<F>(alphas: Vec<f64>, mut eval_at: F) -> Result<SweepMetrics>
where
    F: FnMut(f64) -> Result<(Evaluation, Evaluation)>,
{
    let mut metrics = SweepMetrics {
        alphas: Vec::with_capacity(alphas.len()),
        test_loss: Vec::with_capacity(alphas.len()),
        test_accuracy: Vec::with_capacity(alphas.len()),
        train_loss: Vec::with_capacity(alphas.len()),
        train_accuracy: Vec::with_capacity(alphas.len()),
    };
    for alpha in alphas {
        let (test, train) = eval_at(alpha)?;
        metrics.alphas.push(alpha);
        metrics.test_loss.push(test.loss);
        metrics.test_accuracy.push(test.accuracy);
        metrics.train_loss.push(train.loss);
        metrics.train_accuracy.push(train.accuracy);
    }
    Ok(metrics)
}

/// Interpolate and evaluate both splits at `viz_samples` coefficients.
///
/// Each interpolant is built, evaluated against the test then the train
/// loader, and discarded before the next coefficient.
///
/// # Errors
///
/// Propagates interpolation or evaluation failure.
pub fn run(
    model1: &LoadedModel,
    model2: &LoadedModel,
    test_loader: &mut DataLoader,
    train_loader: &mut DataLoader,
    viz_samples: usize,
    test_samples: usize,
) -> Result<SweepMetrics> {
    let alphas = linspace(ALPHA_START, ALPHA_END, viz_samples);
    let total = alphas.len();
    let mut step = 0usize;
    sweep_with(alphas, |alpha| {
        step += 1;
        println!("Testing perturbation {step}/{total}");
        let interpolant = interpolate(model1, model2, alpha)?;
        let test = evaluate(test_loader, &interpolant, test_samples)?;
        let train = evaluate(train_loader, &interpolant, test_samples)?;
        Ok((test, train))
    })
}
