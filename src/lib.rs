//! # Crop Diagnosis
//!
//! Leaf-disease diagnosis for pepper, potato and tomato crops built on the
//! Burn framework.
//!
//! ## Features
//!
//! - **ResNet-50 backbone** with ImageNet weights and a small dense head
//! - **15 leaf classes** split into crop, condition, severity and advice
//! - **PDF reports** for a diagnosis
//! - **Head fine-tuning** on a class-per-directory image tree
//!
//! ## Modules
//!
//! - `dataset`: Label list, directory loading, validation split, Burn batching
//! - `model`: ResNet-50, classifier head, checkpoints
//! - `inference`: Preprocessing, scoring and diagnosis rules
//! - `report`: PDF report rendering
//! - `training`: Frozen-feature extraction and head training
//! - `utils`: Errors and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crop_diagnosis::backend::{default_device, DefaultBackend};
//! use crop_diagnosis::DiagnosisService;
//!
//! let service = DiagnosisService::load_burn::<DefaultBackend>("model.mpk".as_ref(), default_device())?;
//! let diagnosis = service.diagnose_bytes(&std::fs::read("leaf.jpg")?)?;
//! println!("{}", serde_json::to_string(&diagnosis)?);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod report;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{CropDataset, CLASS_NAMES, NUM_CLASSES};
pub use inference::{Diagnosis, DiagnosisService, ScoreModel, Severity, Status};
pub use model::{CropClassifier, CropClassifierConfig};
pub use report::{write_report, ReportRequest};
pub use training::{run_training, TrainingConfig};
pub use utils::error::{CropError, Result};

/// Side length of the square network input
pub const IMAGE_SIZE: usize = 224;

/// Default batch size
pub const BATCH_SIZE: usize = 32;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
