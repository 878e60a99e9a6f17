//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait and `Batcher` so labeled leaf images
//! can be batched into `[batch, 3, H, W]` tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use tracing::warn;

use crate::dataset::loader::{CropDataset, ImageSample};
use crate::IMAGE_SIZE;

/// A single leaf image ready for Burn
#[derive(Clone, Debug)]
pub struct LeafItem {
    /// Image data as flattened CHW float array [3 * H * W]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
}

/// Lazily loading image dataset over a list of samples
#[derive(Debug, Clone)]
pub struct LeafImageDataset {
    samples: Vec<ImageSample>,
    image_size: usize,
}

impl LeafImageDataset {
    pub fn new(samples: Vec<ImageSample>, image_size: usize) -> Self {
        Self {
            samples,
            image_size,
        }
    }
}

impl Dataset<LeafItem> for LeafImageDataset {
    fn get(&self, index: usize) -> Option<LeafItem> {
        let sample = self.samples.get(index)?;

        match CropDataset::load_image_tensor(sample, self.image_size) {
            Ok(image) => Some(LeafItem {
                image,
                label: sample.label,
            }),
            Err(e) => {
                warn!("Skipping unreadable image: {}", e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of leaf images
#[derive(Clone, Debug)]
pub struct LeafBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Stacks [`LeafItem`]s into a [`LeafBatch`]
#[derive(Clone, Debug)]
pub struct LeafBatcher {
    image_size: usize,
}

impl Default for LeafBatcher {
    fn default() -> Self {
        Self::new(IMAGE_SIZE)
    }
}

impl LeafBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, LeafItem, LeafBatch<B>> for LeafBatcher {
    fn batch(&self, items: Vec<LeafItem>, device: &B::Device) -> LeafBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;

        let mut pixels = Vec::with_capacity(batch_size * 3 * size * size);
        let mut labels: Vec<i64> = Vec::with_capacity(batch_size);
        for item in items {
            pixels.extend_from_slice(&item.image);
            labels.push(item.label as i64);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, size, size]),
            device,
        );
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

        LeafBatch { images, targets }
    }
}
