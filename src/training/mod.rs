//! Training module
//!
//! Fine-tunes the classifier head on top of a frozen ImageNet ResNet-50:
//! - Backbone features are extracted once per image ([`features`])
//! - The dense head is trained with Adam and cross-entropy ([`trainer`])
//! - Weights are saved with the class order they were trained on

pub mod features;
pub mod trainer;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use features::{extract_features, FeatureSet};
pub use trainer::{evaluate, run_training, train_epoch, EpochMetrics, PassMetrics, TrainingSummary};

pub use crate::dataset::split::DEFAULT_VALIDATION_FRACTION;
use crate::model::checkpoint::DEFAULT_WEIGHTS_FILE;

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 5;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-4;

/// Default seed for epoch shuffling
pub const DEFAULT_SEED: u64 = 42;

/// Training run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Class-per-directory image tree
    pub data_dir: PathBuf,
    /// Where the trained weights are written
    pub output: PathBuf,
    /// ImageNet ResNet-50 weights (PyTorch `.pth`)
    pub backbone_weights: Option<PathBuf>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Share of each class held out for validation
    pub validation_fraction: f64,
    pub image_size: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("dataset"),
            output: PathBuf::from(DEFAULT_WEIGHTS_FILE),
            backbone_weights: None,
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            image_size: crate::IMAGE_SIZE,
            seed: DEFAULT_SEED,
        }
    }
}
