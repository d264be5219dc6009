//! Checkpoint restore and device placement.
//!
//! A checkpoint is a safetensors file mapping parameter names to tensors,
//! the serialized `state_dict` of a trained ResNet. Loading instantiates a
//! fresh network of the requested depth over a [`VarMap`], then overwrites
//! every named variable from the file; a missing name or a shape mismatch
//! is a load error naming the offending checkpoint.

use std::collections::BTreeMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};

use crate::config::Arch;
use crate::error::{PaisajeError, Result};
use crate::resnet::{self, ResNet};

/// ImageNet label count, the classifier width of the supported checkpoints.
pub const NUM_CLASSES: usize = 1000;

/// A network together with its named variable store and compute device.
pub struct LoadedModel {
    /// Architecture tag, checked before interpolation.
    pub arch: Arch,
    /// Classifier output width.
    pub num_classes: usize,
    /// Named parameter store backing `net`.
    pub varmap: VarMap,
    /// The network itself.
    pub net: ResNet,
    /// Device all parameters live on.
    pub device: Device,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // VarMap has no Debug impl; show the rest of the fields.
        f.debug_struct("LoadedModel")
            .field("arch", &self.arch)
            .field("num_classes", &self.num_classes)
            .field("net", &self.net)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl LoadedModel {
    /// Snapshot of every named tensor, sorted by name.
    #[must_use]
    pub fn named_tensors(&self) -> BTreeMap<String, Tensor> {
        let data = self.varmap.data().lock().expect("varmap lock poisoned");
        data.iter()
            .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
            .collect()
    }
}

/// Pick the compute device: CUDA when present and not disabled, else CPU.
///
/// # Errors
///
/// Fails if CUDA probing itself errors.
pub fn select_device(disable_cuda: bool) -> Result<Device> {
    if disable_cuda {
        Ok(Device::Cpu)
    } else {
        Ok(Device::cuda_if_available(0)?)
    }
}

/// Instantiate a fresh (zero-initialized) model of the given shape.
///
/// # Errors
///
/// Fails if a parameter cannot be materialized on `device`.
pub fn fresh_model(arch: Arch, num_classes: usize, device: &Device) -> Result<LoadedModel> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let net = resnet::build(arch, num_classes, vb)?;
    Ok(LoadedModel {
        arch,
        num_classes,
        varmap,
        net,
        device: device.clone(),
    })
}

/// Instantiate `arch` and restore its parameters from `path`.
///
/// # Errors
///
/// Fails if the file is absent, unparsable, or structurally incompatible
/// with the architecture (missing names, wrong shapes, unexpected tensors).
pub fn load_checkpoint(arch: Arch, path: &Path, device: &Device) -> Result<LoadedModel> {
    if !path.is_file() {
        return Err(PaisajeError::CheckpointNotFound(path.display().to_string()));
    }
    let mut model = fresh_model(arch, NUM_CLASSES, device)?;
    restore_strict(&mut model, path)?;
    Ok(model)
}

/// Overwrite `model`'s parameters from a safetensors file.
///
/// Strict in both directions: every name the model expects must be present
/// with a matching shape, and names the model does not expect are rejected.
/// torchvision's `num_batches_tracked` counters are tolerated; they carry
/// no weights and have no counterpart in this network.
fn restore_strict(model: &mut LoadedModel, path: &Path) -> Result<()> {
    let on_disk =
        candle_core::safetensors::load(path, &Device::Cpu).map_err(|e| {
            PaisajeError::CheckpointLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
    {
        let expected = model.varmap.data().lock().expect("varmap lock poisoned");
        for name in on_disk.keys() {
            if !expected.contains_key(name) && !name.ends_with("num_batches_tracked") {
                return Err(PaisajeError::CheckpointLoad {
                    path: path.display().to_string(),
                    reason: format!("unexpected tensor {name}"),
                });
            }
        }
    }
    model
        .varmap
        .load(path)
        .map_err(|e| PaisajeError::CheckpointLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
