//! Model Configuration Module
//!
//! Configuration for the ResNet-50 based crop classifier. Saved next to the
//! weights as `<weights>.config.json` so a checkpoint can be rebuilt with the
//! same head dimensions.

use burn::config::Config;

use crate::dataset::NUM_CLASSES;
use crate::model::resnet::RESNET50_FEATURES;

/// Configuration for [`crate::model::CropClassifier`]
#[derive(Config, Debug, PartialEq)]
pub struct CropClassifierConfig {
    /// Number of output classes
    #[config(default = "15")]
    pub num_classes: usize,

    /// Width of the hidden dense layer in the head
    #[config(default = "256")]
    pub hidden_size: usize,

    /// Number of features produced by the backbone
    #[config(default = "2048")]
    pub feature_size: usize,
}

impl CropClassifierConfig {
    /// Configuration sized for a discovered class count
    pub fn for_classes(num_classes: usize) -> Self {
        Self::new().with_num_classes(num_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_served_model() {
        let config = CropClassifierConfig::new();
        assert_eq!(config.num_classes, NUM_CLASSES);
        assert_eq!(config.hidden_size, 256);
        assert_eq!(config.feature_size, RESNET50_FEATURES);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("model.config.json");

        let config = CropClassifierConfig::for_classes(4);
        config.save(&path).unwrap();

        assert_eq!(CropClassifierConfig::load(&path).unwrap(), config);
    }
}
