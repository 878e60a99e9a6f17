//! Crop Leaf Dataset Loader
//!
//! Loads a class-per-directory image tree from disk. Classes are discovered
//! in sorted directory-name order, which defines the label index of each
//! class for training.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::inference::preprocess::{image_to_chw, open_image, TRAINING_FILTER};
use crate::utils::error::{CropError, Result};

/// Extensions accepted as images
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// A single image sample with its label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (e.g., "Tomato___Late_blight")
    pub class_name: String,
}

/// Labeled image dataset rooted at a directory
#[derive(Debug)]
pub struct CropDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples, grouped by class, files sorted by name within a class
    pub samples: Vec<ImageSample>,
    /// Class names in label order
    pub class_names: Vec<String>,
}

impl CropDataset {
    /// Load a dataset from a directory
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── Pepper__bell___Bacterial_spot/
    /// │   ├── image1.jpg
    /// │   └── image2.jpg
    /// ├── Potato___Early_blight/
    /// │   └── ...
    /// └── ...
    /// ```
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading dataset from: {:?}", root_dir);

        if !root_dir.is_dir() {
            return Err(CropError::PathNotFound(root_dir));
        }

        let mut class_names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    class_names.push(name.to_string());
                }
            }
        }
        class_names.sort();

        if class_names.is_empty() {
            return Err(CropError::Dataset(format!(
                "no class directories found in {:?}",
                root_dir
            )));
        }

        info!("Found {} classes", class_names.len());

        let mut samples = Vec::new();
        for (label, class_name) in class_names.iter().enumerate() {
            let class_dir = root_dir.join(class_name);

            // Nested folders inside a class belong to that class
            let mut paths: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_image_file(p))
                .collect();
            paths.sort();

            debug!(
                "Class '{}' (label {}): {} samples",
                class_name,
                label,
                paths.len()
            );

            samples.extend(paths.into_iter().map(|path| ImageSample {
                path,
                label,
                class_name: class_name.clone(),
            }));
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            root_dir,
            samples,
            class_names,
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Load an image and convert it to normalized CHW floats
    pub fn load_image_tensor(sample: &ImageSample, image_size: usize) -> Result<Vec<f32>> {
        let img = open_image(&sample.path)?;
        Ok(image_to_chw(&img, image_size, TRAINING_FILTER))
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.class_names.clone(),
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        for (idx, (name, count)) in self.class_names.iter().zip(&self.class_counts).enumerate() {
            let bar_len = (*count as f32 / self.total_samples.max(1) as f32 * 40.0) as usize;
            println!("    {:3}. {:40} {:5} {}", idx, name, count, "█".repeat(bar_len));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_images(root: &Path, class: &str, names: &[&str]) {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir).unwrap();
        for name in names {
            RgbImage::from_pixel(4, 4, Rgb([10, 200, 30]))
                .save(dir.join(name))
                .unwrap();
        }
    }

    #[test]
    fn test_classes_sorted_and_files_sorted() {
        let tmp = TempDir::new().unwrap();
        write_images(tmp.path(), "Tomato___healthy", &["b.png", "a.png"]);
        write_images(tmp.path(), "Potato___Early_blight", &["z.png"]);
        std::fs::write(tmp.path().join("Tomato___healthy").join("notes.txt"), "x").unwrap();

        let dataset = CropDataset::new(tmp.path()).unwrap();

        assert_eq!(
            dataset.class_names,
            vec!["Potato___Early_blight", "Tomato___healthy"]
        );
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.samples[0].label, 0);
        assert!(dataset.samples[1].path.ends_with("a.png"));
        assert!(dataset.samples[2].path.ends_with("b.png"));
        assert_eq!(dataset.get_stats().class_counts, vec![1, 2]);
    }

    #[test]
    fn test_nested_folders_and_tiff_are_collected() {
        let tmp = TempDir::new().unwrap();
        write_images(tmp.path(), "Potato___healthy", &["a.png"]);
        write_images(&tmp.path().join("Potato___healthy"), "field_2", &["b.png"]);
        std::fs::write(tmp.path().join("Potato___healthy").join("c.tiff"), "x").unwrap();

        let dataset = CropDataset::new(tmp.path()).unwrap();

        assert_eq!(dataset.class_names, vec!["Potato___healthy"]);
        assert_eq!(dataset.len(), 3);
        assert!(dataset.samples[2].path.ends_with("field_2/b.png"));
        assert!(dataset.samples.iter().all(|s| s.label == 0));
    }

    #[test]
    fn test_missing_root_is_error() {
        let err = CropDataset::new("/definitely/not/here").unwrap_err();
        assert!(matches!(err, CropError::PathNotFound(_)));
    }

    #[test]
    fn test_load_image_tensor() {
        let tmp = TempDir::new().unwrap();
        write_images(tmp.path(), "Tomato___healthy", &["leaf.png"]);
        let dataset = CropDataset::new(tmp.path()).unwrap();

        let tensor = CropDataset::load_image_tensor(&dataset.samples[0], 8).unwrap();
        assert_eq!(tensor.len(), 3 * 8 * 8);
    }
}
