//! ResNet classifiers (depths 18/34/50/101/152) for 224×224 RGB input.
//!
//! Parameter names follow the torchvision convention (`conv1`, `bn1`,
//! `layer1.0.conv2`, `layer2.0.downsample.0`, `fc`), so safetensors
//! checkpoints exported from a torchvision state dict restore by name.
//!
//! The forward pass always runs in inference mode: batch norm uses its
//! running statistics and nothing is recorded for backpropagation.

use candle_core::{Result, Tensor, D};
use candle_nn::{
    batch_norm, conv2d_no_bias, linear, BatchNorm, Conv2d, Conv2dConfig, Linear, VarBuilder,
};

use crate::config::Arch;

const BN_EPS: f64 = 1e-5;

// ============================================================================
// Residual blocks
// ============================================================================

/// Two 3×3 convolutions with an identity (or 1×1 projected) shortcut.
#[derive(Debug)]
struct BasicBlock {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    downsample: Option<(Conv2d, BatchNorm)>,
}

impl BasicBlock {
    fn new(vb: VarBuilder, in_c: usize, out_c: usize, stride: usize) -> Result<Self> {
        let cfg1 = Conv2dConfig {
            stride,
            padding: 1,
            ..Default::default()
        };
        let cfg2 = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv1 = conv2d_no_bias(in_c, out_c, 3, cfg1, vb.pp("conv1"))?;
        let bn1 = batch_norm(out_c, BN_EPS, vb.pp("bn1"))?;
        let conv2 = conv2d_no_bias(out_c, out_c, 3, cfg2, vb.pp("conv2"))?;
        let bn2 = batch_norm(out_c, BN_EPS, vb.pp("bn2"))?;
        let downsample = if stride != 1 || in_c != out_c {
            Some(projection(&vb, in_c, out_c, stride)?)
        } else {
            None
        };
        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            downsample,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = xs
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .relu()?
            .apply(&self.conv2)?
            .apply_t(&self.bn2, false)?;
        (ys + shortcut(xs, &self.downsample)?)?.relu()
    }
}

/// 1×1 reduce, 3×3 (strided), 1×1 expand-by-4 with a shortcut.
#[derive(Debug)]
struct Bottleneck {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    conv3: Conv2d,
    bn3: BatchNorm,
    downsample: Option<(Conv2d, BatchNorm)>,
}

impl Bottleneck {
    const EXPANSION: usize = 4;

    fn new(vb: VarBuilder, in_c: usize, width: usize, stride: usize) -> Result<Self> {
        let out_c = width * Self::EXPANSION;
        let cfg2 = Conv2dConfig {
            stride,
            padding: 1,
            ..Default::default()
        };
        let conv1 = conv2d_no_bias(in_c, width, 1, Conv2dConfig::default(), vb.pp("conv1"))?;
        let bn1 = batch_norm(width, BN_EPS, vb.pp("bn1"))?;
        let conv2 = conv2d_no_bias(width, width, 3, cfg2, vb.pp("conv2"))?;
        let bn2 = batch_norm(width, BN_EPS, vb.pp("bn2"))?;
        let conv3 = conv2d_no_bias(width, out_c, 1, Conv2dConfig::default(), vb.pp("conv3"))?;
        let bn3 = batch_norm(out_c, BN_EPS, vb.pp("bn3"))?;
        let downsample = if stride != 1 || in_c != out_c {
            Some(projection(&vb, in_c, out_c, stride)?)
        } else {
            None
        };
        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            conv3,
            bn3,
            downsample,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = xs
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .relu()?
            .apply(&self.conv2)?
            .apply_t(&self.bn2, false)?
            .relu()?
            .apply(&self.conv3)?
            .apply_t(&self.bn3, false)?;
        (ys + shortcut(xs, &self.downsample)?)?.relu()
    }
}

/// 1×1 strided projection for shortcut paths that change shape.
/// Named `downsample.0` / `downsample.1` to match torchvision.
fn projection(
    vb: &VarBuilder,
    in_c: usize,
    out_c: usize,
    stride: usize,
) -> Result<(Conv2d, BatchNorm)> {
    let ds = vb.pp("downsample");
    let cfg = Conv2dConfig {
        stride,
        ..Default::default()
    };
    let conv = conv2d_no_bias(in_c, out_c, 1, cfg, ds.pp("0"))?;
    let bn = batch_norm(out_c, BN_EPS, ds.pp("1"))?;
    Ok((conv, bn))
}

fn shortcut(xs: &Tensor, downsample: &Option<(Conv2d, BatchNorm)>) -> Result<Tensor> {
    match downsample {
        Some((conv, bn)) => xs.apply(conv)?.apply_t(bn, false),
        None => Ok(xs.clone()),
    }
}

#[derive(Debug)]
enum Block {
    Basic(BasicBlock),
    Bottleneck(Bottleneck),
}

impl Block {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Block::Basic(b) => b.forward(xs),
            Block::Bottleneck(b) => b.forward(xs),
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// A ResNet image classifier.
#[derive(Debug)]
pub struct ResNet {
    conv1: Conv2d,
    bn1: BatchNorm,
    stages: Vec<Vec<Block>>,
    fc: Linear,
}

/// Per-stage output widths (pre-expansion for bottleneck depths).
const STAGE_WIDTHS: [usize; 4] = [64, 128, 256, 512];

/// Build a ResNet of the given depth over the supplied variable store.
///
/// # Errors
///
/// Fails if the underlying variable store cannot materialize a parameter.
pub fn build(arch: Arch, num_classes: usize, vb: VarBuilder) -> Result<ResNet> {
    let sizes = arch.layer_sizes();
    let bottleneck = arch.is_bottleneck();
    let expansion = if bottleneck { Bottleneck::EXPANSION } else { 1 };

    let stem_cfg = Conv2dConfig {
        stride: 2,
        padding: 3,
        ..Default::default()
    };
    let conv1 = conv2d_no_bias(3, 64, 7, stem_cfg, vb.pp("conv1"))?;
    let bn1 = batch_norm(64, BN_EPS, vb.pp("bn1"))?;

    let mut stages = Vec::with_capacity(4);
    let mut in_c = 64;
    for (stage_idx, (&width, &count)) in STAGE_WIDTHS.iter().zip(sizes.iter()).enumerate() {
        let stage_vb = vb.pp(format!("layer{}", stage_idx + 1));
        let mut blocks = Vec::with_capacity(count);
        for block_idx in 0..count {
            // Stages 2-4 halve resolution in their first block.
            let stride = if stage_idx > 0 && block_idx == 0 { 2 } else { 1 };
            let block_vb = stage_vb.pp(block_idx.to_string());
            let block = if bottleneck {
                Block::Bottleneck(Bottleneck::new(block_vb, in_c, width, stride)?)
            } else {
                Block::Basic(BasicBlock::new(block_vb, in_c, width, stride)?)
            };
            blocks.push(block);
            in_c = width * expansion;
        }
        stages.push(blocks);
    }

    let fc = linear(512 * expansion, num_classes, vb.pp("fc"))?;

    Ok(ResNet {
        conv1,
        bn1,
        stages,
        fc,
    })
}

impl ResNet {
    /// Inference-mode forward pass: `(batch, 3, H, W)` → `(batch, classes)`.
    ///
    /// # Errors
    ///
    /// Fails on shape/device mismatches in the underlying tensor ops.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut ys = xs
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .relu()?
            .pad_with_same(D::Minus1, 1, 1)?
            .pad_with_same(D::Minus2, 1, 1)?
            .max_pool2d_with_stride(3, 2)?;
        for stage in &self.stages {
            for block in stage {
                ys = block.forward(&ys)?;
            }
        }
        // Global average pool over the spatial dims, then classify.
        ys.mean(D::Minus1)?.mean(D::Minus1)?.apply(&self.fc)
    }
}
