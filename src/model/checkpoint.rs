//! Saving and loading trained classifiers
//!
//! Weights are stored with Burn's named MessagePack recorder at full
//! precision. Two JSON sidecars sit next to the weights file:
//! - `<name>.config.json`: the [`CropClassifierConfig`] used to build the model
//! - `<name>.classes.json`: class names in output-index order

use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};
use tracing::{info, warn};

use crate::model::classifier::CropClassifier;
use crate::model::config::CropClassifierConfig;
use crate::utils::error::{CropError, Result};

/// Default weights filename
pub const DEFAULT_WEIGHTS_FILE: &str = "model.mpk";

type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Path of a sidecar file, e.g. `model.mpk` -> `model.classes.json`
pub fn sidecar_path(weights: &Path, suffix: &str) -> PathBuf {
    weights.with_extension(format!("{}.json", suffix))
}

/// Weights path as written by the recorder (always `.mpk`)
pub fn weights_file(weights: &Path) -> PathBuf {
    weights.with_extension("mpk")
}

/// Save a trained classifier and its sidecars, returning the weights path
pub fn save_classifier<B: Backend>(
    model: CropClassifier<B>,
    config: &CropClassifierConfig,
    class_names: &[String],
    path: &Path,
) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    model
        .save_file(path.to_path_buf(), &WeightsRecorder::new())
        .map_err(|e| CropError::Model(format!("Failed to save model: {:?}", e)))?;

    config.save(sidecar_path(path, "config"))?;
    std::fs::write(
        sidecar_path(path, "classes"),
        serde_json::to_string_pretty(class_names)?,
    )?;

    let saved = weights_file(path);
    info!("Saved classifier to {:?}", saved);
    Ok(saved)
}

/// Load a classifier saved by [`save_classifier`]
///
/// The head dimensions come from the config sidecar when present; otherwise
/// the default configuration (15 classes) is assumed.
pub fn load_classifier<B: Backend>(path: &Path, device: &B::Device) -> Result<CropClassifier<B>> {
    let weights = weights_file(path);
    if !weights.exists() {
        return Err(CropError::PathNotFound(weights));
    }

    let config_path = sidecar_path(path, "config");
    let config = if config_path.exists() {
        CropClassifierConfig::load(&config_path)
            .map_err(|e| CropError::Config(format!("{:?}: {}", config_path, e)))?
    } else {
        warn!("No config found at {:?}, assuming defaults", config_path);
        CropClassifierConfig::new()
    };

    info!("Loading classifier from {:?}", weights);

    CropClassifier::new(&config, device)
        .load_file(weights, &WeightsRecorder::new(), device)
        .map_err(|e| CropError::Model(format!("Failed to load model: {:?}", e)))
}

/// Read the class ordering recorded at training time, if any
pub fn read_class_names(path: &Path) -> Result<Option<Vec<String>>> {
    let classes_path = sidecar_path(path, "classes");
    if !classes_path.exists() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(classes_path)?;
    Ok(Some(serde_json::from_str(&json)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Tensor;
    use tempfile::TempDir;

    type TestBackend = NdArray;

    #[test]
    fn test_sidecar_paths() {
        let weights = Path::new("out/model.mpk");
        assert_eq!(sidecar_path(weights, "classes"), PathBuf::from("out/model.classes.json"));
        assert_eq!(weights_file(Path::new("out/model")), PathBuf::from("out/model.mpk"));
    }

    #[test]
    fn test_save_then_load_preserves_outputs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.mpk");
        let device = Default::default();

        let config = CropClassifierConfig::for_classes(3);
        let model = CropClassifier::<TestBackend>::new(&config, &device);
        let classes: Vec<String> = ["A___healthy", "A___rust", "B___healthy"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let expected: Vec<f32> = model.forward(input.clone()).into_data().to_vec().unwrap();

        save_classifier(model, &config, &classes, &path).unwrap();
        let loaded = load_classifier::<TestBackend>(&path, &device).unwrap();
        let actual: Vec<f32> = loaded.forward(input).into_data().to_vec().unwrap();

        assert_eq!(loaded.num_classes(), 3);
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-5);
        }
        assert_eq!(read_class_names(&path).unwrap(), Some(classes));
    }

    #[test]
    fn test_load_missing_weights() {
        let device = Default::default();
        let err = load_classifier::<TestBackend>(Path::new("/nope/model.mpk"), &device).unwrap_err();
        assert!(matches!(err, CropError::PathNotFound(_)));
    }
}
