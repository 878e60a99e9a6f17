//! Inference Predictor Module
//!
//! [`ScoreModel`] is the seam between request handling and the network: it
//! takes one preprocessed image and returns raw per-class scores. The Burn
//! implementation wraps a loaded [`CropClassifier`]; tests substitute fakes.
//! [`DiagnosisService`] ties preprocessing, scoring and the diagnosis rules
//! together and is what the HTTP layer holds.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use tracing::{debug, info, warn};

use crate::dataset::CLASS_NAMES;
use crate::inference::diagnosis::{diagnose_scores, Diagnosis, Prediction};
use crate::inference::preprocess::{preprocess_bytes, preprocess_image, ImageTensor, SERVING_FILTER};
use crate::model::{load_classifier, read_class_names, CropClassifier};
use crate::utils::error::{CropError, Result};
use crate::IMAGE_SIZE;

/// Produces raw per-class scores (logits) for a single image
pub trait ScoreModel: Send + Sync {
    fn forward_scores(&self, input: &ImageTensor) -> Result<Vec<f32>>;
}

/// [`ScoreModel`] backed by a Burn classifier
///
/// The forward pass is serialized behind a mutex.
pub struct BurnScoreModel<B: Backend> {
    model: Mutex<CropClassifier<B>>,
    device: B::Device,
}

impl<B: Backend> BurnScoreModel<B> {
    pub fn new(model: CropClassifier<B>, device: B::Device) -> Self {
        Self {
            model: Mutex::new(model),
            device,
        }
    }

    /// Load trained weights from disk
    pub fn load(path: &Path, device: B::Device) -> Result<Self> {
        let model = load_classifier::<B>(path, &device)?;
        Ok(Self::new(model, device))
    }

    pub fn num_classes(&self) -> Result<usize> {
        let model = self
            .model
            .lock()
            .map_err(|_| CropError::Inference("model lock poisoned".to_string()))?;
        Ok(model.num_classes())
    }
}

impl<B: Backend> ScoreModel for BurnScoreModel<B> {
    fn forward_scores(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        let tensor = Tensor::<B, 4>::from_data(
            TensorData::new(input.data.clone(), input.shape()),
            &self.device,
        );

        let model = self
            .model
            .lock()
            .map_err(|_| CropError::Inference("model lock poisoned".to_string()))?;
        let logits = model.forward(tensor);
        drop(model);

        logits
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| CropError::Inference(format!("{:?}", e)))
    }
}

/// How a class list recorded at training time relates to the served labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassListMatch {
    /// Same labels in the same order
    Identical,
    /// Same number of classes but different labels or order; the model
    /// loads and its outputs are mislabeled
    Mismatched,
    /// Different number of classes; the model is refused at load time
    WrongCount,
}

/// Compare a recorded class list with the served labels
pub fn compare_class_lists(recorded: &[String], served: &[&str]) -> ClassListMatch {
    if recorded.len() != served.len() {
        ClassListMatch::WrongCount
    } else if recorded.iter().zip(served).all(|(r, s)| r == s) {
        ClassListMatch::Identical
    } else {
        ClassListMatch::Mismatched
    }
}

/// Warn when the training-time class order differs from the served labels
///
/// Returns `true` when the orders agree.
pub fn check_class_order(recorded: &[String], served: &[&str]) -> bool {
    let outcome = compare_class_lists(recorded, served);

    if outcome != ClassListMatch::Identical {
        warn!(
            "Class order recorded at training time ({} classes) differs from the served label list ({} classes); predictions may be mislabeled",
            recorded.len(),
            served.len()
        );
        for (i, (r, s)) in recorded.iter().zip(served).enumerate().filter(|(_, (r, s))| r != s) {
            warn!("  index {}: trained '{}' vs served '{}'", i, r, s);
        }
    }

    outcome == ClassListMatch::Identical
}

/// Preprocess, score and diagnose images with a loaded model
#[derive(Clone)]
pub struct DiagnosisService {
    model: Arc<dyn ScoreModel>,
    labels: &'static [&'static str],
    image_size: usize,
}

impl DiagnosisService {
    /// Service over the fixed served label list
    pub fn new(model: Arc<dyn ScoreModel>) -> Self {
        Self {
            model,
            labels: &CLASS_NAMES,
            image_size: IMAGE_SIZE,
        }
    }

    /// Load Burn weights and build a service around them
    ///
    /// Any failure here is meant to be fatal for the caller.
    pub fn load_burn<B: Backend>(path: &Path, device: B::Device) -> Result<Self> {
        let model = BurnScoreModel::<B>::load(path, device)?;

        let num_classes = model.num_classes()?;
        if num_classes != CLASS_NAMES.len() {
            return Err(CropError::Model(format!(
                "model at {:?} predicts {} classes but {} labels are served",
                path,
                num_classes,
                CLASS_NAMES.len()
            )));
        }

        if let Some(recorded) = read_class_names(path)? {
            check_class_order(&recorded, &CLASS_NAMES);
        }

        info!("Model ready: {} classes", num_classes);
        Ok(Self::new(Arc::new(model)))
    }

    pub fn labels(&self) -> &[&'static str] {
        self.labels
    }

    /// Diagnose an already preprocessed image
    pub fn diagnose_tensor(&self, input: &ImageTensor) -> Result<(Prediction, Diagnosis)> {
        let start = Instant::now();
        let scores = self.model.forward_scores(input)?;
        let result = diagnose_scores(&scores, self.labels)?;

        debug!(
            "Predicted '{}' ({:.4}) in {:.1} ms",
            self.labels[result.0.index],
            result.0.confidence,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(result)
    }

    /// Diagnose uploaded image bytes
    pub fn diagnose_bytes(&self, bytes: &[u8]) -> Result<Diagnosis> {
        let input = preprocess_bytes(bytes, self.image_size)?;
        Ok(self.diagnose_tensor(&input)?.1)
    }

    /// Diagnose an image file, returning the full prediction as well
    pub fn diagnose_file(&self, path: &Path) -> Result<(Prediction, Diagnosis)> {
        let img = crate::inference::preprocess::open_image(path)?;
        let input = preprocess_image(&img, self.image_size, SERVING_FILTER);
        self.diagnose_tensor(&input)
    }
}
