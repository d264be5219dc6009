//! End-to-end sweep: two identical checkpoints must trace flat metric
//! curves across every interpolation coefficient.

use std::path::Path;

use candle_core::Device;
use image::{Rgb, RgbImage};
use paisaje::config::Arch;
use paisaje::data::{DataLoader, ImageFolder, Split};
use paisaje::loader::{self, LoadedModel};
use paisaje::sweep;

fn write_dataset(root: &Path) {
    for (class, shade) in [("a", 60u8), ("b", 180u8)] {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..2u8 {
            let img = RgbImage::from_pixel(48, 64, Rgb([shade, i * 90 + 20, 120]));
            img.save(dir.join(format!("img{i}.png"))).unwrap();
        }
    }
}

/// A second model carrying byte-for-byte the same parameters.
fn twin_of(model: &LoadedModel) -> LoadedModel {
    let twin = loader::fresh_model(model.arch, model.num_classes, &model.device).unwrap();
    let source = model.named_tensors();
    {
        let data = twin.varmap.data().lock().unwrap();
        for (name, var) in data.iter() {
            var.set(&source[name]).unwrap();
        }
    }
    twin
}

// Deterministic pipeline on both loaders keeps the inputs identical across
// coefficients; one batch covers the whole dataset.
fn loader_for(root: &Path) -> DataLoader {
    let ds = ImageFolder::open(root).unwrap();
    DataLoader::new(ds, 4, Split::Test, 0).unwrap()
}

#[test]
fn test_identical_checkpoints_give_flat_curves() {
    let tmp = tempfile::tempdir().unwrap();
    write_dataset(tmp.path());

    let model1 = loader::fresh_model(Arch::Resnet18, 2, &Device::Cpu).unwrap();
    let model2 = twin_of(&model1);

    let mut test_loader = loader_for(tmp.path());
    let mut train_loader = loader_for(tmp.path());

    let metrics = sweep::run(
        &model1,
        &model2,
        &mut test_loader,
        &mut train_loader,
        3,
        100,
    )
    .unwrap();

    assert_eq!(metrics.alphas, vec![-1.0, 0.5, 2.0]);
    for series in [
        &metrics.test_loss,
        &metrics.test_accuracy,
        &metrics.train_loss,
        &metrics.train_accuracy,
    ] {
        assert_eq!(series.len(), 3);
        for v in series {
            assert!((v - series[0]).abs() < 1e-4, "not flat: {series:?}");
        }
    }
    for acc in metrics.test_accuracy.iter().chain(&metrics.train_accuracy) {
        assert!((0.0..=100.0).contains(acc));
    }
    for loss in metrics.test_loss.iter().chain(&metrics.train_loss) {
        assert!(*loss >= 0.0);
    }
}
