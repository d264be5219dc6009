//! Paisaje CLI - loss-landscape visualization between two checkpoints.
//!
//! Interpolates the parameters of two trained ResNets of the same depth
//! across coefficients evenly spaced over [-1, 2], evaluates loss and
//! top-1 accuracy at each point on both data splits, then writes the raw
//! metric arrays and two SVG charts to the output directory.

use std::path::PathBuf;

use clap::Parser;

use paisaje::config::{Arch, Settings, SEED};
use paisaje::data::{DataLoader, ImageFolder, Split};
use paisaje::error::Result;
use paisaje::{loader, report, sweep};

/// Paisaje - visualize the loss landscape between two trained models
///
/// Both checkpoints must be safetensors state dicts of the architecture
/// given by --arch. The output directory must already exist.
#[derive(Parser)]
#[command(name = "paisaje")]
#[command(version, about, long_about = None)]
struct Cli {
    /// First checkpoint (safetensors), the alpha = 1 endpoint
    #[arg(value_name = "MODEL1")]
    model1: PathBuf,

    /// Second checkpoint (safetensors), the alpha = 0 endpoint
    #[arg(value_name = "MODEL2")]
    model2: PathBuf,

    /// Batch size for both data loaders
    #[arg(short, long, default_value = "100")]
    batch_size: usize,

    /// Number of interpolation coefficients sampled over [-1, 2]
    #[arg(short, long, default_value = "200")]
    viz_samples: usize,

    /// Dataset root containing train/ and val/ class directories
    #[arg(short, long, default_value = "data/imagenet")]
    data_dir: PathBuf,

    /// Directory for raw_arrays and the rendered charts (must exist)
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// ResNet depth shared by both checkpoints
    #[arg(short, long, value_enum, default_value_t = Arch::Resnet18)]
    arch: Arch,

    /// Evaluation sample cap per split per coefficient
    #[arg(short, long, default_value = "50000")]
    test_samples: usize,

    /// Force CPU even when a CUDA device is present
    #[arg(long)]
    disable_cuda: bool,
}

impl Cli {
    fn into_settings(self) -> Settings {
        Settings {
            model1: self.model1,
            model2: self.model2,
            batch_size: self.batch_size,
            viz_samples: self.viz_samples,
            data_dir: self.data_dir,
            output_dir: self.output_dir,
            arch: self.arch,
            test_samples: self.test_samples,
            disable_cuda: self.disable_cuda,
        }
    }
}

fn main() -> Result<()> {
    let settings = Cli::parse().into_settings();

    println!("Loading data");
    let mut train_loader = DataLoader::new(
        ImageFolder::open(&settings.data_dir.join("train"))?,
        settings.batch_size,
        Split::Train,
        SEED,
    )?;
    let mut test_loader = DataLoader::new(
        ImageFolder::open(&settings.data_dir.join("val"))?,
        settings.batch_size,
        Split::Test,
        SEED,
    )?;

    println!("Loading models");
    let device = loader::select_device(settings.disable_cuda)?;
    let model1 = loader::load_checkpoint(settings.arch, &settings.model1, &device)?;
    let model2 = loader::load_checkpoint(settings.arch, &settings.model2, &device)?;

    let metrics = sweep::run(
        &model1,
        &model2,
        &mut test_loader,
        &mut train_loader,
        settings.viz_samples,
        settings.test_samples,
    )?;

    let raw = report::RawArrays::new(
        &metrics,
        &settings.arch.to_string(),
        &settings.model1.display().to_string(),
        &settings.model2.display().to_string(),
    );
    let raw_path = report::write_raw_arrays(&settings.output_dir, &raw)?;
    println!("Wrote {}", raw_path.display());

    let (loss_path, acc_path) = report::render_charts(&settings.output_dir, &metrics)?;
    println!("Wrote {}", loss_path.display());
    println!("Wrote {}", acc_path.display());

    Ok(())
}
