//! Image-folder datasets and batched loaders.
//!
//! Expects the standard labeled-folder layout:
//!
//! ```text
//! <root>/<class_a>/img0.jpg
//! <root>/<class_b>/img1.jpg
//! ```
//!
//! Class labels are assigned by sorted directory name. The train pipeline
//! applies a random resized crop (224, scale 0.1-1.0) and a random
//! horizontal flip; the test pipeline resizes the short side to 256 and
//! center-crops 224. Both normalize with the ImageNet channel statistics.
//! Batches are CPU tensors; the evaluator moves them to the compute device.

use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{PaisajeError, Result};

/// Channel means of the ImageNet training set.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Channel standard deviations of the ImageNet training set.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Final crop edge fed to the network.
pub const CROP_SIZE: u32 = 224;
/// Short-side resize applied before the test center crop.
const RESIZE_SIZE: u32 = 256;
/// Lower bound of the train random-crop area fraction.
const CROP_SCALE_MIN: f64 = 0.1;

/// Which preprocessing pipeline and iteration order a loader uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Augmented pipeline, reshuffled each pass.
    Train,
    /// Deterministic pipeline, dataset order preserved.
    Test,
}

// ============================================================================
// Dataset
// ============================================================================

/// A class-labeled image folder, indexed once at startup.
#[derive(Debug)]
pub struct ImageFolder {
    samples: Vec<(PathBuf, u32)>,
    classes: Vec<String>,
}

impl ImageFolder {
    /// Index `root`, assigning labels by sorted class-directory name.
    ///
    /// # Errors
    ///
    /// Fails if `root` is unreadable or contains no class directories with
    /// images.
    pub fn open(root: &Path) -> Result<Self> {
        let mut classes: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(root).map_err(|e| PaisajeError::Dataset {
            path: root.display().to_string(),
            reason: format!("cannot read dataset directory: {e}"),
        })? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                classes.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        classes.sort();

        let mut samples = Vec::new();
        for (label, class) in classes.iter().enumerate() {
            let class_dir = root.join(class);
            let mut files: Vec<PathBuf> = std::fs::read_dir(&class_dir)?
                .filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            // Labels fit u32; ImageNet has 1000 classes.
            let label = u32::try_from(label).map_err(|_| PaisajeError::Dataset {
                path: root.display().to_string(),
                reason: "too many class directories".to_string(),
            })?;
            samples.extend(files.into_iter().map(|p| (p, label)));
        }

        if samples.is_empty() {
            return Err(PaisajeError::Dataset {
                path: root.display().to_string(),
                reason: "no class directories with images found".to_string(),
            });
        }
        Ok(Self { samples, classes })
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the dataset holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sorted class names; index equals label.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Batched iterator factory over an [`ImageFolder`].
#[derive(Debug)]
pub struct DataLoader {
    dataset: ImageFolder,
    batch_size: usize,
    split: Split,
    seed: u64,
    pass: u64,
}

impl DataLoader {
    /// Create a loader for one split.
    ///
    /// # Errors
    ///
    /// Fails on a zero batch size.
    pub fn new(dataset: ImageFolder, batch_size: usize, split: Split, seed: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(PaisajeError::InvalidArgument {
                reason: "batch size must be positive".to_string(),
            });
        }
        Ok(Self {
            dataset,
            batch_size,
            split,
            seed,
            pass: 0,
        })
    }

    /// Number of samples in the underlying dataset.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Start a fresh pass over the dataset.
    ///
    /// Train loaders reshuffle on every call; test loaders always yield the
    /// dataset order. Each pass draws its randomness from a fixed seed plus
    /// a pass counter, so runs are reproducible end to end.
    pub fn batches(&mut self) -> Batches<'_> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.pass));
        self.pass += 1;

        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.split == Split::Train {
            order.shuffle(&mut rng);
        }
        Batches {
            dataset: &self.dataset,
            order,
            pos: 0,
            batch_size: self.batch_size,
            augment: self.split == Split::Train,
            rng,
        }
    }
}

/// One pass of batches over a dataset. Yields `(images, labels)` pairs with
/// `images: (B, 3, 224, 224) f32` and `labels: (B,) u32`, both on CPU.
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a ImageFolder,
    order: Vec<usize>,
    pos: usize,
    batch_size: usize,
    augment: bool,
    rng: StdRng,
}

impl Batches<'_> {
    fn next_batch(&mut self) -> Result<(Tensor, Tensor)> {
        let end = (self.pos + self.batch_size).min(self.order.len());
        let indices = &self.order[self.pos..end];
        self.pos = end;

        let mut images = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &idx in indices {
            let (path, label) = &self.dataset.samples[idx];
            let pixels = if self.augment {
                load_train_image(path, &mut self.rng)?
            } else {
                load_test_image(path)?
            };
            let chw = Tensor::from_vec(
                pixels,
                (3, CROP_SIZE as usize, CROP_SIZE as usize),
                &Device::Cpu,
            )?;
            images.push(chw);
            labels.push(*label);
        }

        let batch = Tensor::stack(&images, 0)?;
        let count = labels.len();
        let labels = Tensor::from_vec(labels, count, &Device::Cpu)?;
        Ok((batch, labels))
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<(Tensor, Tensor)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        Some(self.next_batch())
    }
}

// ============================================================================
// Transforms
// ============================================================================

/// Random resized crop (area scale 0.1-1.0, aspect 3/4-4/3) to 224, then a
/// coin-flip horizontal mirror.
fn load_train_image(path: &Path, rng: &mut StdRng) -> Result<Vec<f32>> {
    let img = open_image(path)?;
    let (w, h) = (img.width(), img.height());
    let area = f64::from(w) * f64::from(h);

    let mut crop = None;
    for _ in 0..10 {
        let target_area = area * rng.gen_range(CROP_SCALE_MIN..=1.0);
        let aspect = rng
            .gen_range((3f64 / 4.0).ln()..=(4f64 / 3.0).ln())
            .exp();
        let cw = (target_area * aspect).sqrt().round() as u32;
        let ch = (target_area / aspect).sqrt().round() as u32;
        if cw >= 1 && ch >= 1 && cw <= w && ch <= h {
            let x = rng.gen_range(0..=(w - cw));
            let y = rng.gen_range(0..=(h - ch));
            crop = Some(img.crop_imm(x, y, cw, ch));
            break;
        }
    }
    // All attempts fell outside the image; take the largest centered square.
    let crop = crop.unwrap_or_else(|| {
        let side = w.min(h);
        img.crop_imm((w - side) / 2, (h - side) / 2, side, side)
    });

    let mut resized = crop.resize_exact(CROP_SIZE, CROP_SIZE, FilterType::Triangle);
    if rng.gen_bool(0.5) {
        resized = resized.fliph();
    }
    Ok(normalize_chw(&resized.to_rgb8()))
}

/// Deterministic test transform: short side to 256, center crop 224.
fn load_test_image(path: &Path) -> Result<Vec<f32>> {
    let img = open_image(path)?;
    let (w, h) = (img.width(), img.height());
    let (rw, rh) = if w <= h {
        (
            RESIZE_SIZE,
            (f64::from(h) * f64::from(RESIZE_SIZE) / f64::from(w)).round() as u32,
        )
    } else {
        (
            (f64::from(w) * f64::from(RESIZE_SIZE) / f64::from(h)).round() as u32,
            RESIZE_SIZE,
        )
    };
    let resized = img.resize_exact(rw, rh, FilterType::Triangle);
    let x = (rw - CROP_SIZE) / 2;
    let y = (rh - CROP_SIZE) / 2;
    let cropped = resized.crop_imm(x, y, CROP_SIZE, CROP_SIZE);
    Ok(normalize_chw(&cropped.to_rgb8()))
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    let img = image::ImageReader::open(path)
        .map_err(|e| PaisajeError::Dataset {
            path: path.display().to_string(),
            reason: format!("cannot open image: {e}"),
        })?
        .decode()?;
    Ok(img)
}

/// Scale to [0,1] and apply per-channel ImageNet normalization, laid out CHW.
fn normalize_chw(rgb: &RgbImage) -> Vec<f32> {
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let plane = w * h;
    let mut out = vec![0f32; 3 * plane];
    for (i, px) in rgb.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = (f32::from(px.0[c]) / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_dataset(root: &Path, classes: &[(&str, usize)]) {
        for (class, n) in classes {
            let dir = root.join(class);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..*n {
                let img = RgbImage::from_pixel(32, 48, Rgb([i as u8 * 40, 128, 200]));
                img.save(dir.join(format!("img{i}.png"))).unwrap();
            }
        }
    }

    #[test]
    fn test_image_folder_sorted_labels() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), &[("zebra", 1), ("ant", 2)]);
        let ds = ImageFolder::open(tmp.path()).unwrap();
        assert_eq!(ds.classes(), &["ant".to_string(), "zebra".to_string()]);
        assert_eq!(ds.len(), 3);
        // ant sorts first so its samples carry label 0.
        assert_eq!(ds.samples[0].1, 0);
        assert_eq!(ds.samples[2].1, 1);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let err = ImageFolder::open(Path::new("/nonexistent/dataset")).unwrap_err();
        assert!(matches!(err, PaisajeError::Dataset { .. }));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ImageFolder::open(tmp.path()).unwrap_err();
        assert!(matches!(err, PaisajeError::Dataset { .. }));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), &[("a", 1)]);
        let ds = ImageFolder::open(tmp.path()).unwrap();
        let err = DataLoader::new(ds, 0, Split::Test, 0).unwrap_err();
        assert!(matches!(err, PaisajeError::InvalidArgument { .. }));
    }

    #[test]
    fn test_batch_shapes_and_labels() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), &[("a", 2), ("b", 2)]);
        let ds = ImageFolder::open(tmp.path()).unwrap();
        let mut loader = DataLoader::new(ds, 3, Split::Test, 0).unwrap();

        let batches: Vec<_> = loader.batches().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 2); // 3 + 1
        let (images, labels) = &batches[0];
        assert_eq!(images.dims(), &[3, 3, 224, 224]);
        assert_eq!(labels.dims(), &[3]);
        let (tail_images, tail_labels) = &batches[1];
        assert_eq!(tail_images.dims(), &[1, 3, 224, 224]);
        assert_eq!(tail_labels.to_vec1::<u32>().unwrap(), vec![1]);
    }

    #[test]
    fn test_test_split_order_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), &[("a", 2), ("b", 2)]);
        let ds = ImageFolder::open(tmp.path()).unwrap();
        let mut loader = DataLoader::new(ds, 4, Split::Test, 0).unwrap();

        let first: Vec<u32> = loader
            .batches()
            .map(|b| b.unwrap().1.to_vec1::<u32>().unwrap())
            .flatten()
            .collect();
        let second: Vec<u32> = loader
            .batches()
            .map(|b| b.unwrap().1.to_vec1::<u32>().unwrap())
            .flatten()
            .collect();
        assert_eq!(first, vec![0, 0, 1, 1]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_train_split_reshuffles_between_passes() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), &[("a", 6), ("b", 6)]);
        let ds = ImageFolder::open(tmp.path()).unwrap();
        let mut loader = DataLoader::new(ds, 12, Split::Train, 0).unwrap();

        let first: Vec<u32> = loader
            .batches()
            .map(|b| b.unwrap().1.to_vec1::<u32>().unwrap())
            .flatten()
            .collect();
        let second: Vec<u32> = loader
            .batches()
            .map(|b| b.unwrap().1.to_vec1::<u32>().unwrap())
            .flatten()
            .collect();
        assert_eq!(first.len(), 12);
        // Distinct pass seeds make identical orderings vanishingly unlikely.
        assert_ne!(first, second);
    }

    #[test]
    fn test_normalize_chw_range() {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 0, 128]));
        let chw = normalize_chw(&img);
        assert_eq!(chw.len(), 3 * 16);
        // Red channel: (1.0 - 0.485) / 0.229
        let expected = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!((chw[0] - expected).abs() < 1e-6);
    }
}
