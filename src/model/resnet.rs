//! ResNet-50 feature extractor
//!
//! Bottleneck residual network with the torchvision layout (stride on the
//! 3x3 convolution). Field names mirror torchvision's parameter names so
//! ImageNet checkpoints map onto the record with only the downsample branch
//! remapped (see [`crate::model::pretrained`]).
//!
//! Architecture:
//! - Input: [B, 3, H, W]
//! - Stem: Conv 7x7 stride 2, BN, ReLU, MaxPool 3x3 stride 2
//! - 4 stages of bottleneck blocks: [3, 4, 6, 3], widths 64/128/256/512
//! - Global average pooling to [B, 2048]

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Channel expansion of the bottleneck's last 1x1 convolution
pub const EXPANSION: usize = 4;

/// Number of features produced by the backbone
pub const RESNET50_FEATURES: usize = 512 * EXPANSION;

/// Blocks per stage for ResNet-50
const STAGE_BLOCKS: [usize; 4] = [3, 4, 6, 3];

/// Bottleneck width per stage
const STAGE_WIDTHS: [usize; 4] = [64, 128, 256, 512];

/// 1x1 projection used when a block changes shape
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B>,
}

impl<B: Backend> Downsample<B> {
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Bottleneck residual block: 1x1 reduce, 3x3, 1x1 expand
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    pub conv1: Conv2d<B>,
    pub bn1: BatchNorm<B>,
    pub conv2: Conv2d<B>,
    pub bn2: BatchNorm<B>,
    pub conv3: Conv2d<B>,
    pub bn3: BatchNorm<B>,
    pub downsample: Option<Downsample<B>>,
    pub relu: Relu,
}

impl<B: Backend> Bottleneck<B> {
    pub fn new(in_channels: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = width * EXPANSION;

        let downsample = if stride != 1 || in_channels != out_channels {
            Some(Downsample::new(in_channels, out_channels, stride, device))
        } else {
            None
        };

        Self {
            conv1: Conv2dConfig::new([in_channels, width], [1, 1])
                .with_bias(false)
                .init(device),
            bn1: BatchNormConfig::new(width).init(device),
            conv2: Conv2dConfig::new([width, width], [3, 3])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .init(device),
            bn2: BatchNormConfig::new(width).init(device),
            conv3: Conv2dConfig::new([width, out_channels], [1, 1])
                .with_bias(false)
                .init(device),
            bn3: BatchNormConfig::new(out_channels).init(device),
            downsample,
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(input.clone()),
            None => input.clone(),
        };

        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(input)));
        let x = self.relu.forward(self.bn2.forward(self.conv2.forward(x)));
        let x = self.bn3.forward(self.conv3.forward(x));

        self.relu.forward(x + identity)
    }
}

/// ResNet-50 without its ImageNet classification layer
#[derive(Module, Debug)]
pub struct ResNet50<B: Backend> {
    pub conv1: Conv2d<B>,
    pub bn1: BatchNorm<B>,
    pub relu: Relu,
    pub maxpool: MaxPool2d,
    pub layer1: Vec<Bottleneck<B>>,
    pub layer2: Vec<Bottleneck<B>>,
    pub layer3: Vec<Bottleneck<B>>,
    pub layer4: Vec<Bottleneck<B>>,
    pub avgpool: AdaptiveAvgPool2d,
}

impl<B: Backend> ResNet50<B> {
    /// Create a randomly initialized backbone
    pub fn new(device: &B::Device) -> Self {
        let mut in_channels = 64;
        let [layer1, layer2, layer3, layer4] = [0, 1, 2, 3].map(|stage| {
            let stride = if stage == 0 { 1 } else { 2 };
            make_layer(
                &mut in_channels,
                STAGE_BLOCKS[stage],
                STAGE_WIDTHS[stage],
                stride,
                device,
            )
        });

        Self {
            conv1: Conv2dConfig::new([3, 64], [7, 7])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .with_bias(false)
                .init(device),
            bn1: BatchNormConfig::new(64).init(device),
            relu: Relu::new(),
            maxpool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    /// Extract pooled features
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Feature tensor of shape [batch_size, 2048]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.relu.forward(self.bn1.forward(x));
        let x = self.maxpool.forward(x);

        let x = self
            .layer1
            .iter()
            .chain(&self.layer2)
            .chain(&self.layer3)
            .chain(&self.layer4)
            .fold(x, |x, block| block.forward(x));

        let x = self.avgpool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

/// Build one stage; only its first block strides and projects the shortcut
fn make_layer<B: Backend>(
    in_channels: &mut usize,
    blocks: usize,
    width: usize,
    stride: usize,
    device: &B::Device,
) -> Vec<Bottleneck<B>> {
    (0..blocks)
        .map(|block| {
            let block_stride = if block == 0 { stride } else { 1 };
            let bottleneck = Bottleneck::new(*in_channels, width, block_stride, device);
            *in_channels = width * EXPANSION;
            bottleneck
        })
        .collect()
}
