//! Image preprocessing shared by training and serving
//!
//! Every image is forced to 3-channel RGB, resized to exactly
//! `size x size` (no aspect preservation, no crop) and scaled to `[0, 1]`.
//! Pixels are laid out channel-first, which is what Burn's `Conv2d` expects.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::utils::error::{CropError, Result};

/// Resampling filter used when serving requests (bicubic)
pub const SERVING_FILTER: FilterType = FilterType::CatmullRom;

/// Resampling filter used when loading training images
pub const TRAINING_FILTER: FilterType = FilterType::Nearest;

/// A single preprocessed image with an implicit batch dimension of 1
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    /// Flattened CHW pixels in `[0, 1]`
    pub data: Vec<f32>,
    /// Height and width (square)
    pub size: usize,
}

impl ImageTensor {
    /// Tensor shape `[batch, channels, height, width]`
    pub fn shape(&self) -> [usize; 4] {
        [1, 3, self.size, self.size]
    }
}

/// Decode raw bytes (any format `image` understands) into an image
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Open and decode an image file
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)
        .map_err(|e| CropError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .with_guessed_format()
        .map_err(|e| CropError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| CropError::ImageLoad(path.to_path_buf(), e.to_string()))
}

/// Resize and convert an image to normalized CHW floats
pub fn image_to_chw(img: &DynamicImage, size: usize, filter: FilterType) -> Vec<f32> {
    let rgb = img
        .resize_exact(size as u32, size as u32, filter)
        .to_rgb8();

    let plane = size * size;
    let mut tensor = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * size + x as usize;
        tensor[offset] = pixel[0] as f32 / 255.0;
        tensor[plane + offset] = pixel[1] as f32 / 255.0;
        tensor[2 * plane + offset] = pixel[2] as f32 / 255.0;
    }

    tensor
}

/// Preprocess a decoded image into a single-image batch
pub fn preprocess_image(img: &DynamicImage, size: usize, filter: FilterType) -> ImageTensor {
    ImageTensor {
        data: image_to_chw(img, size, filter),
        size,
    }
}

/// Decode uploaded bytes and preprocess them the way the server does
pub fn preprocess_bytes(bytes: &[u8], size: usize) -> Result<ImageTensor> {
    let img = decode_image(bytes)?;
    Ok(preprocess_image(&img, size, SERVING_FILTER))
}
