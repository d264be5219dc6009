//! Run configuration.
//!
//! `Settings` is built once from the CLI and never mutated afterwards. The
//! architecture choice is a closed enum with an exhaustive dispatch rather
//! than a string-to-constructor lookup.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;

/// Seed for data-order shuffling and augmentation randomness.
pub const SEED: u64 = 0;

/// The five supported ResNet depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Arch {
    /// ResNet-18 (basic blocks, [2, 2, 2, 2])
    Resnet18,
    /// ResNet-34 (basic blocks, [3, 4, 6, 3])
    Resnet34,
    /// ResNet-50 (bottleneck blocks, [3, 4, 6, 3])
    Resnet50,
    /// ResNet-101 (bottleneck blocks, [3, 4, 23, 3])
    Resnet101,
    /// ResNet-152 (bottleneck blocks, [3, 8, 36, 3])
    Resnet152,
}

impl Arch {
    /// Blocks per stage.
    #[must_use]
    pub fn layer_sizes(self) -> [usize; 4] {
        match self {
            Arch::Resnet18 => [2, 2, 2, 2],
            Arch::Resnet34 | Arch::Resnet50 => [3, 4, 6, 3],
            Arch::Resnet101 => [3, 4, 23, 3],
            Arch::Resnet152 => [3, 8, 36, 3],
        }
    }

    /// Whether the depth uses bottleneck blocks (expansion 4) instead of
    /// basic blocks.
    #[must_use]
    pub fn is_bottleneck(self) -> bool {
        match self {
            Arch::Resnet18 | Arch::Resnet34 => false,
            Arch::Resnet50 | Arch::Resnet101 | Arch::Resnet152 => true,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::Resnet18 => "resnet18",
            Arch::Resnet34 => "resnet34",
            Arch::Resnet50 => "resnet50",
            Arch::Resnet101 => "resnet101",
            Arch::Resnet152 => "resnet152",
        };
        f.write_str(name)
    }
}

/// Immutable run settings, created once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// First checkpoint path (safetensors).
    pub model1: PathBuf,
    /// Second checkpoint path (safetensors).
    pub model2: PathBuf,
    /// Batch size for both loaders.
    pub batch_size: usize,
    /// Number of interpolation coefficients to sample over [-1, 2].
    pub viz_samples: usize,
    /// Dataset root containing `train/` and `val/`.
    pub data_dir: PathBuf,
    /// Directory for raw_arrays and charts.
    pub output_dir: PathBuf,
    /// ResNet depth.
    pub arch: Arch,
    /// Evaluation sample cap per split per coefficient.
    pub test_samples: usize,
    /// Force CPU even when a CUDA device is present.
    pub disable_cuda: bool,
}
