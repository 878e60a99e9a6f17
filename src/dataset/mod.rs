//! Dataset module for crop leaf images
//!
//! This module provides:
//! - The fixed label list the served model was trained against
//! - Loading a class-per-directory image tree from disk
//! - The per-class train/validation split used by the training procedure
//! - Burn `Dataset`/`Batcher` implementations for feature extraction
//!
//! Labels have the form `"<Crop>___<Condition>"`, e.g. `Tomato___Early_blight`.

pub mod burn_dataset;
pub mod loader;
pub mod split;

pub use burn_dataset::{LeafBatch, LeafBatcher, LeafImageDataset, LeafItem};
pub use loader::{CropDataset, DatasetStats, ImageSample};
pub use split::{split_validation, TrainValSplit};

/// Number of classes the served model predicts
pub const NUM_CLASSES: usize = 15;

/// Delimiter between crop and condition in a label
pub const LABEL_DELIMITER: &str = "___";

/// Class labels in model output order.
///
/// Index `i` corresponds to output `i` of the trained network. This is the
/// order the training directory produced; it is transcribed here rather than
/// derived, so it must be updated by hand whenever the dataset changes.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "Pepper__bell___Bacterial_spot",
    "Pepper__bell___healthy",
    "Potato___Early_blight",
    "Potato___healthy",
    "Potato___Late_blight",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___healthy",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites",
    "Tomato___Target_Spot",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
];

/// Split a label into `(crop, condition)` at the first `___`.
///
/// A label without the delimiter is treated as a crop with an empty condition.
pub fn split_label(label: &str) -> (&str, &str) {
    label.split_once(LABEL_DELIMITER).unwrap_or((label, ""))
}

/// Check if a condition string denotes a healthy plant
pub fn is_healthy_condition(condition: &str) -> bool {
    condition.eq_ignore_ascii_case("healthy")
}
