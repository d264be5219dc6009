//! Bounded model evaluation: mean cross-entropy loss and top-1 accuracy.

use candle_core::{DType, Tensor, D};
use candle_nn::loss::cross_entropy;

use crate::data::DataLoader;
use crate::error::{PaisajeError, Result};
use crate::loader::LoadedModel;

/// Anything that maps an image batch to class logits on some device.
pub trait Classifier {
    /// `(batch, 3, H, W)` → `(batch, classes)` logits.
    ///
    /// # Errors
    ///
    /// Fails on tensor-op failure.
    fn logits(&self, images: &Tensor) -> Result<Tensor>;

    /// Device batches must be moved to before the forward pass.
    fn device(&self) -> &candle_core::Device;
}

impl Classifier for LoadedModel {
    fn logits(&self, images: &Tensor) -> Result<Tensor> {
        Ok(self.net.forward(images)?)
    }

    fn device(&self) -> &candle_core::Device {
        &self.device
    }
}

/// Loss/accuracy pair for one split at one coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Sum of per-batch mean losses divided by total samples processed.
    pub loss: f64,
    /// `100 * correct / total`, in [0, 100].
    pub accuracy: f64,
}

/// Run `model` over one pass of `loader`, stopping once `sample_cap`
/// samples have been accumulated.
///
/// The cap is checked BEFORE each batch: once the running total meets it,
/// the next batch is not processed. A cap falling mid-batch therefore stops
/// one batch short rather than splitting a batch; this boundary matches the
/// numbers this tool has always reported and must not be "fixed".
///
/// # Errors
///
/// Fails fast on `sample_cap == 0` (instead of dividing by zero), on an
/// empty pass, and on any data or tensor failure.
pub fn evaluate(
    loader: &mut DataLoader,
    model: &impl Classifier,
    sample_cap: usize,
) -> Result<Evaluation> {
    if sample_cap == 0 {
        return Err(PaisajeError::InvalidArgument {
            reason: "sample cap must be positive".to_string(),
        });
    }

    let mut total_loss = 0f64;
    let mut correct = 0f64;
    let mut total = 0usize;

    for batch in loader.batches() {
        if total >= sample_cap {
            break;
        }
        let (images, labels) = batch?;
        let images = images.to_device(model.device())?;
        let labels = labels.to_device(model.device())?;

        let logits = model.logits(&images)?;
        let loss = cross_entropy(&logits, &labels)?;
        total_loss += f64::from(loss.to_dtype(DType::F32)?.to_scalar::<f32>()?);

        let predictions = logits.argmax(D::Minus1)?;
        let matches = predictions
            .eq(&labels)?
            .to_dtype(DType::F32)?
            .sum_all()?
            .to_scalar::<f32>()?;
        correct += f64::from(matches);
        total += labels.dim(0)?;
    }

    if total == 0 {
        return Err(PaisajeError::InvalidArgument {
            reason: "evaluation pass produced no batches".to_string(),
        });
    }

    Ok(Evaluation {
        loss: total_loss / total as f64,
        accuracy: 100.0 * correct / total as f64,
    })
}
