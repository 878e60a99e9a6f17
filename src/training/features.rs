//! Frozen backbone feature extraction
//!
//! The backbone never receives gradients, so its pooled features are
//! computed once per image on the non-autodiff backend and reused for every
//! epoch of head training.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use tracing::{debug, warn};

use crate::dataset::{LeafBatch, LeafBatcher, LeafImageDataset, LeafItem};
use crate::model::ResNet50;
use crate::utils::error::{CropError, Result};

/// Pooled features and labels for a set of images
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    /// Row-major `[len, feature_size]`
    pub features: Vec<f32>,
    pub labels: Vec<usize>,
    pub feature_size: usize,
}

impl FeatureSet {
    pub fn new(features: Vec<f32>, labels: Vec<usize>, feature_size: usize) -> Result<Self> {
        if features.len() != labels.len() * feature_size {
            return Err(CropError::Training(format!(
                "{} feature values do not match {} labels of size {}",
                features.len(),
                labels.len(),
                feature_size
            )));
        }

        Ok(Self {
            features,
            labels,
            feature_size,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Gather the rows at `indices`
    pub fn gather(&self, indices: &[usize]) -> (Vec<f32>, Vec<i64>) {
        let mut features = Vec::with_capacity(indices.len() * self.feature_size);
        let mut labels = Vec::with_capacity(indices.len());

        for &i in indices {
            let start = i * self.feature_size;
            features.extend_from_slice(&self.features[start..start + self.feature_size]);
            labels.push(self.labels[i] as i64);
        }

        (features, labels)
    }
}

/// Run every image of `dataset` through the backbone
///
/// Unreadable images are skipped with a warning.
pub fn extract_features<B: Backend>(
    backbone: &ResNet50<B>,
    dataset: &LeafImageDataset,
    batcher: &LeafBatcher,
    batch_size: usize,
    device: &B::Device,
) -> Result<FeatureSet> {
    let batch_size = batch_size.max(1);
    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut feature_size = 0;

    for start in (0..dataset.len()).step_by(batch_size) {
        let end = (start + batch_size).min(dataset.len());
        let items: Vec<LeafItem> = (start..end).filter_map(|i| dataset.get(i)).collect();

        if items.len() < end - start {
            warn!("{} images skipped in batch {}..{}", end - start - items.len(), start, end);
        }
        if items.is_empty() {
            continue;
        }

        labels.extend(items.iter().map(|item| item.label));

        let batch: LeafBatch<B> = batcher.batch(items, device);
        let output = backbone.forward(batch.images);
        feature_size = output.dims()[1];

        let values: Vec<f32> = output
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| CropError::Training(format!("{:?}", e)))?;
        features.extend(values);

        debug!("Extracted features for {}/{} images", end, dataset.len());
    }

    FeatureSet::new(features, labels, feature_size)
}
