//! Inference module: from image bytes to a diagnosis
//!
//! This module provides:
//! - Image preprocessing (RGB, 224x224, scaled to [0, 1], channel-first)
//! - The [`ScoreModel`] seam and its Burn implementation
//! - Diagnosis rules: softmax, argmax, severity buckets and advice lookup

pub mod diagnosis;
pub mod predictor;
pub mod preprocess;

pub use diagnosis::{
    advice_for, diagnose, diagnose_scores, predict, softmax, Diagnosis, Prediction, Severity,
    Status,
};
pub use predictor::{
    check_class_order, compare_class_lists, BurnScoreModel, ClassListMatch, DiagnosisService,
    ScoreModel,
};
pub use preprocess::{decode_image, preprocess_bytes, preprocess_image, ImageTensor};
