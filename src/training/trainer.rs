//! Head Fine-Tuning Pipeline
//!
//! Trains the dense head on cached backbone features:
//! - Adam at a fixed learning rate, categorical cross-entropy on logits
//! - Training rows shuffled every epoch with a seeded `ChaCha8Rng`
//! - Validation loss/accuracy after every epoch
//! - Final weights saved together with the class order and config

use std::path::PathBuf;
use std::time::Instant;

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor, TensorData,
    },
};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::{split_validation, CropDataset, LeafBatcher, LeafImageDataset};
use crate::model::checkpoint::sidecar_path;
use crate::model::{
    load_imagenet_backbone, save_classifier, ClassifierHead, CropClassifier,
    CropClassifierConfig, ResNet50,
};
use crate::training::features::{extract_features, FeatureSet};
use crate::training::TrainingConfig;
use crate::utils::error::{CropError, Result};
use crate::utils::logging::TrainingLogger;

/// Loss and accuracy for one pass over a feature set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassMetrics {
    pub loss: f64,
    pub accuracy: f64,
}

/// Metrics recorded after each epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train: PassMetrics,
    pub validation: PassMetrics,
    pub duration_secs: f64,
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub weights_path: PathBuf,
    pub class_names: Vec<String>,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub history: Vec<EpochMetrics>,
}

/// One optimization pass over `train` in shuffled mini-batches
pub fn train_epoch<B, O>(
    mut head: ClassifierHead<B>,
    optimizer: &mut O,
    train: &FeatureSet,
    batch_size: usize,
    learning_rate: f64,
    rng: &mut ChaCha8Rng,
    device: &B::Device,
) -> (ClassifierHead<B>, PassMetrics)
where
    B: AutodiffBackend,
    O: Optimizer<ClassifierHead<B>, B>,
{
    let mut indices: Vec<usize> = (0..train.len()).collect();
    indices.shuffle(rng);

    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;

    for batch_indices in indices.chunks(batch_size.max(1)) {
        let (features, targets) = feature_batch::<B>(train, batch_indices, device);

        let output = head.forward(features);
        let loss = loss_fn.forward(output.clone(), targets.clone());

        loss_sum += loss.clone().into_scalar().elem::<f64>() * batch_indices.len() as f64;
        correct += count_correct(output, targets, batch_indices.len());

        let grads = GradientsParams::from_grads(loss.backward(), &head);
        head = optimizer.step(learning_rate, head, grads);
    }

    (head, pass_metrics(loss_sum, correct, train.len()))
}

/// Loss and accuracy of `head` on a feature set, without gradients
pub fn evaluate<B: Backend>(
    head: &ClassifierHead<B>,
    features: &FeatureSet,
    batch_size: usize,
    device: &B::Device,
) -> PassMetrics {
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;

    let indices: Vec<usize> = (0..features.len()).collect();
    for batch_indices in indices.chunks(batch_size.max(1)) {
        let (inputs, targets) = feature_batch::<B>(features, batch_indices, device);

        let output = head.forward(inputs);
        let loss = loss_fn.forward(output.clone(), targets.clone());

        loss_sum += loss.into_scalar().elem::<f64>() * batch_indices.len() as f64;
        correct += count_correct(output, targets, batch_indices.len());
    }

    pass_metrics(loss_sum, correct, features.len())
}

fn feature_batch<B: Backend>(
    set: &FeatureSet,
    indices: &[usize],
    device: &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 1, Int>) {
    let (features, labels) = set.gather(indices);
    let features = Tensor::<B, 2>::from_data(
        TensorData::new(features, [indices.len(), set.feature_size]),
        device,
    );
    let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [indices.len()]), device);
    (features, targets)
}

fn count_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>, n: usize) -> usize {
    let predictions = output.argmax(1).reshape([n]);
    let correct: i64 = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

fn pass_metrics(loss_sum: f64, correct: usize, total: usize) -> PassMetrics {
    if total == 0 {
        return PassMetrics::default();
    }
    PassMetrics {
        loss: loss_sum / total as f64,
        accuracy: correct as f64 / total as f64,
    }
}

/// Device for the frozen backbone and evaluation, the same one the head trains on
pub fn backbone_device<B: AutodiffBackend>(device: &B::Device) -> <B::InnerBackend as Backend>::Device {
    device.clone()
}

/// Run the full training procedure
///
/// # Type Parameters
/// * `B` - The autodiff backend used for the head (e.g. `Autodiff<NdArray>`)
pub fn run_training<B: AutodiffBackend>(
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<TrainingSummary> {
    println!("{}", "Loading Dataset...".cyan());
    let dataset = CropDataset::new(&config.data_dir)?;
    let stats = dataset.get_stats();
    stats.print();

    if dataset.is_empty() {
        return Err(CropError::Dataset(format!(
            "no images found under {:?}",
            config.data_dir
        )));
    }

    let split = split_validation(&dataset.samples, config.validation_fraction)?;
    println!();
    println!("{}", split);

    if split.train.is_empty() {
        return Err(CropError::Training("training split is empty".to_string()));
    }

    let inner_device = backbone_device::<B>(device);
    let backbone = match &config.backbone_weights {
        Some(path) => load_imagenet_backbone::<B::InnerBackend>(path, &inner_device)?,
        None => {
            warn!("No backbone weights given; training on a randomly initialized ResNet-50");
            ResNet50::new(&inner_device)
        }
    };

    println!();
    println!("{}", "Extracting Backbone Features...".cyan().bold());
    let batcher = LeafBatcher::new(config.image_size);
    let train_set = extract_features(
        &backbone,
        &LeafImageDataset::new(split.train.clone(), config.image_size),
        &batcher,
        config.batch_size,
        &inner_device,
    )?;
    let val_set = extract_features(
        &backbone,
        &LeafImageDataset::new(split.validation.clone(), config.image_size),
        &batcher,
        config.batch_size,
        &inner_device,
    )?;
    info!(
        "Features ready: {} train, {} validation",
        train_set.len(),
        val_set.len()
    );

    let model_config = CropClassifierConfig::for_classes(dataset.num_classes())
        .with_feature_size(train_set.feature_size);
    let mut head = ClassifierHead::<B>::new(&model_config, device);
    let mut optimizer = AdamConfig::new().init::<B, ClassifierHead<B>>();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  🏷️  Classes:           {}", dataset.num_classes());
    println!("  📊 Training samples:  {}", train_set.len());
    println!("  ✅ Validation samples: {}", val_set.len());
    println!("  🔄 Epochs:            {}", config.epochs);
    println!("  📦 Batch size:        {}", config.batch_size);
    println!("  📈 Learning rate:     {}", config.learning_rate);
    println!();

    let mut logger = TrainingLogger::new(config.epochs);
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);
        let started = Instant::now();

        let (trained, train_metrics) = train_epoch(
            head,
            &mut optimizer,
            &train_set,
            config.batch_size,
            config.learning_rate,
            &mut rng,
            device,
        );
        head = trained;

        let val_metrics = evaluate(&head.valid(), &val_set, config.batch_size, &inner_device);
        logger.end_epoch(
            train_metrics.loss,
            train_metrics.accuracy,
            val_metrics.loss,
            val_metrics.accuracy,
        );

        println!(
            "  {} Epoch {}/{} | Loss: {:.4} | Acc: {:.2}% | Val Loss: {:.4} | Val Acc: {:.2}%",
            "→".cyan(),
            epoch + 1,
            config.epochs,
            train_metrics.loss,
            train_metrics.accuracy * 100.0,
            val_metrics.loss,
            val_metrics.accuracy * 100.0
        );

        history.push(EpochMetrics {
            epoch: epoch + 1,
            train: train_metrics,
            validation: val_metrics,
            duration_secs: started.elapsed().as_secs_f64(),
        });
    }

    logger.log_complete(history.last().map(|m| m.validation.accuracy).unwrap_or(0.0));

    println!();
    println!("{}", "Saving Model...".cyan());
    let model = CropClassifier::from_parts(backbone, head.valid());
    let weights_path = save_classifier(model, &model_config, &dataset.class_names, &config.output)?;

    let summary = TrainingSummary {
        weights_path,
        class_names: dataset.class_names.clone(),
        train_samples: train_set.len(),
        validation_samples: val_set.len(),
        history,
    };
    std::fs::write(
        sidecar_path(&config.output, "history"),
        serde_json::to_string_pretty(&summary.history)?,
    )?;

    println!("  💾 Saved to: {:?}", summary.weights_path);
    Ok(summary)
}
