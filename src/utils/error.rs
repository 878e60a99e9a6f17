//! Error Handling Module
//!
//! Defines the error type shared by training, inference and report rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for crop diagnosis operations
#[derive(Error, Debug)]
pub enum CropError {
    /// An image file on disk could not be opened or decoded
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Uploaded or in-memory image bytes could not be decoded
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction, loading or saving
    #[error("Model error: {0}")]
    Model(String),

    /// Error with training
    #[error("Training error: {0}")]
    Training(String),

    /// Error with inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// PDF report rendering failed
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),


    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for crop diagnosis operations
pub type Result<T> = std::result::Result<T, CropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CropError::Report("font missing".to_string());
        assert_eq!(format!("{}", err), "Report error: font missing");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/data/Tomato___healthy/leaf.jpg");
        let err = CropError::ImageLoad(path, "file not found".to_string());
        assert!(format!("{}", err).contains("leaf.jpg"));
    }

    #[test]
    fn test_image_decode_from() {
        let err = image::load_from_memory(b"definitely not an image").unwrap_err();
        let err: CropError = err.into();
        assert!(matches!(err, CropError::ImageDecode(_)));
    }
}
