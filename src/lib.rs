//! # Paisaje
//!
//! Loss-landscape visualization along the line between two trained models.
//!
//! Paisaje (Spanish: "landscape") takes two checkpoints of the same ResNet
//! architecture and walks the straight line through parameter space that
//! connects them, extended past both endpoints: coefficients are evenly
//! spaced over `[-1, 2]`, where `1` is the first model, `0` is the second,
//! and everything else is the linear blend `alpha * w1 + (1 - alpha) * w2`.
//! Each blend is evaluated for mean cross-entropy loss and top-1 accuracy
//! on the train and test splits, and the resulting curves are persisted as
//! raw arrays plus rendered SVG charts.
//!
//! ## Pipeline
//!
//! 1. [`loader`] restores both checkpoints onto the selected device
//! 2. [`interpolate`] builds each blended model after a structural check
//! 3. [`eval`] scores a blend on one split, capped at a sample budget
//! 4. [`sweep`] drives 1-3 across every coefficient in order
//! 5. [`report`] writes `raw_arrays` (JSON) and the loss/accuracy charts
//!
//! ## Example
//!
//! ```rust,no_run
//! use paisaje::config::Arch;
//! use paisaje::data::{DataLoader, ImageFolder, Split};
//! use paisaje::{loader, report, sweep};
//!
//! # fn main() -> paisaje::Result<()> {
//! let device = loader::select_device(false)?;
//! let m1 = loader::load_checkpoint(Arch::Resnet18, "a.safetensors".as_ref(), &device)?;
//! let m2 = loader::load_checkpoint(Arch::Resnet18, "b.safetensors".as_ref(), &device)?;
//!
//! let mut test = DataLoader::new(ImageFolder::open("data/val".as_ref())?, 100, Split::Test, 0)?;
//! let mut train = DataLoader::new(ImageFolder::open("data/train".as_ref())?, 100, Split::Train, 0)?;
//!
//! let metrics = sweep::run(&m1, &m2, &mut test, &mut train, 200, 50_000)?;
//! report::render_charts("output".as_ref(), &metrics)?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod interpolate;
pub mod loader;
pub mod report;
pub mod resnet;
pub mod sweep;

pub use config::{Arch, Settings};
pub use error::{PaisajeError, Result};

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
