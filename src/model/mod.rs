//! Model module for the crop disease classifier using the Burn framework
//!
//! This module provides:
//! - A ResNet-50 feature extractor with torchvision-compatible parameter names
//! - The classification head and the full classifier
//! - Import of ImageNet weights and checkpoint save/load
//!
//! ## Architecture
//!
//! ```text
//! image [B, 3, 224, 224]
//!   -> ResNet-50 (frozen during training) -> [B, 2048]
//!   -> Dense(256) + ReLU -> Dense(num_classes) -> logits
//! ```

pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod pretrained;
pub mod resnet;

pub use checkpoint::{load_classifier, read_class_names, save_classifier, DEFAULT_WEIGHTS_FILE};
pub use classifier::{ClassifierHead, CropClassifier};
pub use config::CropClassifierConfig;
pub use pretrained::load_imagenet_backbone;
pub use resnet::{ResNet50, RESNET50_FEATURES};
