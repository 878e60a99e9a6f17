//! Crop Disease Classifier
//!
//! A ResNet-50 backbone with a small dense head:
//! global average pool, Dense(256, ReLU), Dense(num_classes).
//! The network returns logits; softmax is applied by callers that need
//! probabilities.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig, Relu},
    tensor::{backend::Backend, Tensor},
};

use crate::model::config::CropClassifierConfig;
use crate::model::resnet::ResNet50;

/// Trainable classification head on top of pooled backbone features
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub fc1: Linear<B>,
    pub relu: Relu,
    pub fc2: Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    pub fn new(config: &CropClassifierConfig, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(config.feature_size, config.hidden_size).init(device),
            relu: Relu::new(),
            fc2: LinearConfig::new(config.hidden_size, config.num_classes).init(device),
        }
    }

    /// Map features `[batch, feature_size]` to logits `[batch, num_classes]`
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(features);
        let x = self.relu.forward(x);
        self.fc2.forward(x)
    }
}

/// Crop leaf disease classifier
#[derive(Module, Debug)]
pub struct CropClassifier<B: Backend> {
    pub backbone: ResNet50<B>,
    pub head: ClassifierHead<B>,
}

impl<B: Backend> CropClassifier<B> {
    /// Create a randomly initialized classifier
    pub fn new(config: &CropClassifierConfig, device: &B::Device) -> Self {
        Self {
            backbone: ResNet50::new(device),
            head: ClassifierHead::new(config, device),
        }
    }

    /// Assemble a classifier from a (pretrained) backbone and a head
    pub fn from_parts(backbone: ResNet50<B>, head: ClassifierHead<B>) -> Self {
        Self { backbone, head }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width], values in [0, 1]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(self.backbone.forward(x))
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.head.fc2.weight.dims()[1]
    }
}
