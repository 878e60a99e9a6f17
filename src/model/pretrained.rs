//! ImageNet weights for the ResNet-50 backbone
//!
//! Imports a torchvision `resnet50` state dict (`.pth`) into [`ResNet50`].
//! Parameter names already line up except for the shortcut projection,
//! which torchvision stores as a `Sequential` (`downsample.0`/`downsample.1`).
//! BatchNorm `weight`/`bias` map to `gamma`/`beta` through the PyTorch
//! adapter, and the checkpoint's `fc.*` entries have no counterpart here.

use std::path::Path;

use burn::{
    module::Module,
    record::{FullPrecisionSettings, Recorder},
    tensor::backend::Backend,
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use tracing::info;

use crate::model::resnet::{ResNet50, ResNet50Record};
use crate::utils::error::{CropError, Result};

/// Load ImageNet-pretrained backbone weights from a torchvision checkpoint
pub fn load_imagenet_backbone<B: Backend>(path: &Path, device: &B::Device) -> Result<ResNet50<B>> {
    if !path.exists() {
        return Err(CropError::PathNotFound(path.to_path_buf()));
    }

    info!("Importing ResNet-50 weights from {:?}", path);

    let args = LoadArgs::new(path.to_path_buf())
        .with_key_remap(r"(.+)\.downsample\.0\.(.+)", "$1.downsample.conv.$2")
        .with_key_remap(r"(.+)\.downsample\.1\.(.+)", "$1.downsample.bn.$2");

    let record: ResNet50Record<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .map_err(|e| CropError::Model(format!("Failed to import {:?}: {}", path, e)))?;

    Ok(ResNet50::new(device).load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_missing_checkpoint() {
        let device = Default::default();
        let err = load_imagenet_backbone::<NdArray>(Path::new("/nope/resnet50.pth"), &device)
            .unwrap_err();
        assert!(matches!(err, CropError::PathNotFound(_)));
    }
}
