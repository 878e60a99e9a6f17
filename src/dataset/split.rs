//! Train/validation split for head fine-tuning
//!
//! The split is per class and deterministic: within each class, with files
//! sorted by name, the first `floor(validation_fraction * n)` files go to the
//! validation set and the rest to the training set. No randomness is
//! involved, so the same directory always yields the same split.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::loader::ImageSample;
use crate::utils::error::{CropError, Result};

/// Default fraction of each class held out for validation
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

/// The two subsets produced by [`split_validation`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainValSplit {
    pub train: Vec<ImageSample>,
    pub validation: Vec<ImageSample>,
}

impl TrainValSplit {
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len()
    }
}

impl std::fmt::Display for TrainValSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.total().max(1) as f64;
        writeln!(f, "Dataset Split:")?;
        writeln!(
            f,
            "  Training:   {} ({:.1}%)",
            self.train.len(),
            100.0 * self.train.len() as f64 / total
        )?;
        write!(
            f,
            "  Validation: {} ({:.1}%)",
            self.validation.len(),
            100.0 * self.validation.len() as f64 / total
        )
    }
}

/// Split samples per class into training and validation subsets.
///
/// Samples are regrouped by label and sorted by path inside each class before
/// splitting, so the input order does not matter.
pub fn split_validation(samples: &[ImageSample], validation_fraction: f64) -> Result<TrainValSplit> {
    if !(0.0..1.0).contains(&validation_fraction) {
        return Err(CropError::Config(format!(
            "validation fraction must be in [0, 1), got {}",
            validation_fraction
        )));
    }

    let mut by_class: BTreeMap<usize, Vec<&ImageSample>> = BTreeMap::new();
    for sample in samples {
        by_class.entry(sample.label).or_default().push(sample);
    }

    let mut split = TrainValSplit::default();
    for (_, mut class_samples) in by_class {
        class_samples.sort_by(|a, b| a.path.cmp(&b.path));

        let n_val = (validation_fraction * class_samples.len() as f64).floor() as usize;
        let (val, train) = class_samples.split_at(n_val);

        split.validation.extend(val.iter().map(|s| (*s).clone()));
        split.train.extend(train.iter().map(|s| (*s).clone()));
    }

    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_samples(per_class: &[usize]) -> Vec<ImageSample> {
        let mut samples = Vec::new();
        for (class, &count) in per_class.iter().enumerate() {
            for i in 0..count {
                samples.push(ImageSample {
                    path: PathBuf::from(format!("class_{}/image_{:03}.jpg", class, i)),
                    label: class,
                    class_name: format!("Crop___Condition_{}", class),
                });
            }
        }
        samples
    }

    #[test]
    fn test_twenty_percent_per_class() {
        let samples = create_test_samples(&[10, 7, 3]);
        let split = split_validation(&samples, DEFAULT_VALIDATION_FRACTION).unwrap();

        // floor(2.0) + floor(1.4) + floor(0.6)
        assert_eq!(split.validation.len(), 2 + 1);
        assert_eq!(split.train.len(), 8 + 6 + 3);
        assert_eq!(split.total(), 20);
    }

    #[test]
    fn test_validation_takes_first_sorted_files() {
        let mut samples = create_test_samples(&[5]);
        samples.reverse();

        let split = split_validation(&samples, 0.2).unwrap();
        assert_eq!(split.validation.len(), 1);
        assert!(split.validation[0].path.ends_with("image_000.jpg"));
        assert!(split.train.iter().all(|s| !s.path.ends_with("image_000.jpg")));
    }

    #[test]
    fn test_split_is_deterministic() {
        let samples = create_test_samples(&[12, 9]);
        let a = split_validation(&samples, 0.2).unwrap();
        let b = split_validation(&samples, 0.2).unwrap();

        assert_eq!(a.train, b.train);
        assert_eq!(a.validation, b.validation);
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let samples = create_test_samples(&[4]);
        assert!(split_validation(&samples, 1.0).is_err());
        assert!(split_validation(&samples, -0.1).is_err());
    }
}
