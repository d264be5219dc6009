//! Parameter-space interpolation between two models.
//!
//! `interpolate(a, b, alpha)` builds a third, independent model whose every
//! named tensor equals `alpha * a_i + (1 - alpha) * b_i`. Neither source is
//! mutated, and alpha outside [0, 1] is meaningful (extrapolation past the
//! two checkpoints), so no clamping is applied. Structural agreement between
//! the sources is checked up front and reported as a mismatch error instead
//! of surfacing as an opaque shape failure inside a tensor op.

use candle_core::Tensor;

use crate::error::{PaisajeError, Result};
use crate::loader::{self, LoadedModel};

/// `alpha * a + (1 - alpha) * b`, elementwise.
///
/// # Errors
///
/// Fails if the tensors disagree in shape or device.
pub fn blend(a: &Tensor, b: &Tensor, alpha: f64) -> Result<Tensor> {
    let blended = ((a * alpha)? + (b * (1.0 - alpha))?)?;
    Ok(blended)
}

/// Verify the two models expose identical parameter names and shapes.
///
/// # Errors
///
/// Returns [`PaisajeError::StructureMismatch`] naming the first
/// disagreement found.
pub fn check_structure(a: &LoadedModel, b: &LoadedModel) -> Result<()> {
    if a.arch != b.arch {
        return Err(PaisajeError::StructureMismatch {
            reason: format!("architectures differ: {} vs {}", a.arch, b.arch),
        });
    }
    let a_tensors = a.named_tensors();
    let b_tensors = b.named_tensors();
    for (name, ta) in &a_tensors {
        match b_tensors.get(name) {
            None => {
                return Err(PaisajeError::StructureMismatch {
                    reason: format!("parameter {name} missing from second model"),
                })
            }
            Some(tb) if tb.dims() != ta.dims() => {
                return Err(PaisajeError::StructureMismatch {
                    reason: format!(
                        "parameter {name} shape {:?} vs {:?}",
                        ta.dims(),
                        tb.dims()
                    ),
                })
            }
            Some(_) => {}
        }
    }
    if let Some(extra) = b_tensors.keys().find(|name| !a_tensors.contains_key(*name)) {
        return Err(PaisajeError::StructureMismatch {
            reason: format!("parameter {extra} missing from first model"),
        });
    }
    Ok(())
}

/// Build the interpolant model for coefficient `alpha`.
///
/// # Errors
///
/// Fails on structural mismatch between the sources or on tensor-op failure.
pub fn interpolate(a: &LoadedModel, b: &LoadedModel, alpha: f64) -> Result<LoadedModel> {
    check_structure(a, b)?;

    let out = loader::fresh_model(a.arch, a.num_classes, &a.device)?;
    {
        let a_data = a.varmap.data().lock().expect("varmap lock poisoned");
        let b_data = b.varmap.data().lock().expect("varmap lock poisoned");
        let out_data = out.varmap.data().lock().expect("varmap lock poisoned");
        for (name, var) in out_data.iter() {
            let pa = a_data
                .get(name)
                .ok_or_else(|| PaisajeError::StructureMismatch {
                    reason: format!("parameter {name} missing from first model"),
                })?;
            let pb = b_data
                .get(name)
                .ok_or_else(|| PaisajeError::StructureMismatch {
                    reason: format!("parameter {name} missing from second model"),
                })?;
            var.set(&blend(pa.as_tensor(), pb.as_tensor(), alpha)?)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Arch;
    use candle_core::{DType, Device};

    fn model_with_constant(value: f64) -> LoadedModel {
        let model = loader::fresh_model(Arch::Resnet18, 4, &Device::Cpu).unwrap();
        let data = model.varmap.data().lock().unwrap();
        for var in data.values() {
            let filled = Tensor::full(value, var.dims(), &Device::Cpu)
                .unwrap()
                .to_dtype(DType::F32)
                .unwrap();
            var.set(&filled).unwrap();
        }
        drop(data);
        model
    }

    fn max_abs_diff(m: &LoadedModel, expected: f64) -> f64 {
        let mut worst = 0f64;
        for t in m.named_tensors().values() {
            let vals = t.flatten_all().unwrap().to_vec1::<f32>().unwrap();
            for v in vals {
                worst = worst.max((f64::from(v) - expected).abs());
            }
        }
        worst
    }

    #[test]
    fn test_blend_elementwise() {
        let a = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu).unwrap();
        let b = Tensor::new(&[5f32, 5.0, 5.0], &Device::Cpu).unwrap();
        let c = blend(&a, &b, 0.25).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(c, vec![4.0, 4.25, 4.5]);
    }

    #[test]
    fn test_blend_extrapolates_without_clamping() {
        let a = Tensor::new(&[1f32], &Device::Cpu).unwrap();
        let b = Tensor::new(&[0f32], &Device::Cpu).unwrap();
        let c = blend(&a, &b, 2.0).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(c, vec![2.0]);
        let c = blend(&a, &b, -1.0).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(c, vec![-1.0]);
    }

    #[test]
    fn test_interpolate_endpoints_and_sources_untouched() {
        let a = model_with_constant(3.0);
        let b = model_with_constant(7.0);

        // alpha = 1 reproduces a, alpha = 0 reproduces b.
        let at_one = interpolate(&a, &b, 1.0).unwrap();
        assert!(max_abs_diff(&at_one, 3.0) < 1e-6);
        let at_zero = interpolate(&a, &b, 0.0).unwrap();
        assert!(max_abs_diff(&at_zero, 7.0) < 1e-6);

        // Midpoint is the average; extrapolation leaves [3, 7].
        let mid = interpolate(&a, &b, 0.5).unwrap();
        assert!(max_abs_diff(&mid, 5.0) < 1e-6);
        let beyond = interpolate(&a, &b, 2.0).unwrap();
        assert!(max_abs_diff(&beyond, -1.0) < 1e-6);

        // Source models keep their values after every call.
        assert!(max_abs_diff(&a, 3.0) < 1e-6);
        assert!(max_abs_diff(&b, 7.0) < 1e-6);
    }

    #[test]
    fn test_identical_sources_give_flat_interpolants() {
        let a = model_with_constant(2.5);
        let b = model_with_constant(2.5);
        for alpha in [-1.0, -0.25, 0.0, 0.5, 1.0, 1.75, 2.0] {
            let interpolant = interpolate(&a, &b, alpha).unwrap();
            assert!(max_abs_diff(&interpolant, 2.5) < 1e-5, "alpha {alpha}");
        }
    }

    #[test]
    fn test_architecture_mismatch_is_explicit() {
        let a = loader::fresh_model(Arch::Resnet18, 4, &Device::Cpu).unwrap();
        let b = loader::fresh_model(Arch::Resnet34, 4, &Device::Cpu).unwrap();
        let err = interpolate(&a, &b, 0.5).unwrap_err();
        assert!(matches!(err, PaisajeError::StructureMismatch { .. }));
    }

    #[test]
    fn test_classifier_width_mismatch_is_explicit() {
        let a = loader::fresh_model(Arch::Resnet18, 4, &Device::Cpu).unwrap();
        let b = loader::fresh_model(Arch::Resnet18, 6, &Device::Cpu).unwrap();
        let err = check_structure(&a, &b).unwrap_err();
        assert!(matches!(err, PaisajeError::StructureMismatch { .. }));
    }
}
