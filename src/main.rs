//! Crop Diagnosis CLI
//!
//! Trains the classifier head, diagnoses single images and prints dataset
//! statistics. The HTTP service lives in the `server` crate.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crop_diagnosis::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use crop_diagnosis::dataset::{split_validation, CropDataset, CLASS_NAMES};
use crop_diagnosis::inference::{compare_class_lists, ClassListMatch};
use crop_diagnosis::model::DEFAULT_WEIGHTS_FILE;
use crop_diagnosis::report::{write_report, ReportRequest};
use crop_diagnosis::training::{self, TrainingConfig};
use crop_diagnosis::utils::format_duration;
use crop_diagnosis::utils::logging::{init_logging, LogConfig, LogLevel};
use crop_diagnosis::DiagnosisService;

/// Crop Leaf Disease Diagnosis
///
/// Classifies pepper, potato and tomato leaf photos with a ResNet-50 based
/// model built on the Burn framework.
#[derive(Parser, Debug)]
#[command(name = "crop_diagnosis")]
#[command(version)]
#[command(about = "Crop leaf disease diagnosis with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fine-tune the classifier head on a class-per-directory dataset
    Train {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "dataset")]
        data_dir: PathBuf,

        /// Where to write the trained weights
        #[arg(short, long, default_value = DEFAULT_WEIGHTS_FILE)]
        output: PathBuf,

        /// ImageNet ResNet-50 weights (PyTorch .pth)
        #[arg(long)]
        backbone_weights: Option<PathBuf>,

        /// Number of training epochs
        #[arg(short, long, default_value_t = training::DEFAULT_EPOCHS)]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value_t = training::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value_t = training::DEFAULT_LEARNING_RATE)]
        learning_rate: f64,

        /// Share of each class held out for validation
        #[arg(long, default_value = "0.2")]
        validation_fraction: f64,

        /// Random seed for epoch shuffling
        #[arg(long, default_value_t = training::DEFAULT_SEED)]
        seed: u64,
    },

    /// Diagnose a single leaf image
    Infer {
        /// Path to input image
        #[arg(short, long)]
        input: PathBuf,

        /// Path to trained model
        #[arg(short, long, default_value = DEFAULT_WEIGHTS_FILE)]
        model: PathBuf,

        /// Also write a PDF report into this directory
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "dataset")]
        data_dir: PathBuf,

        /// Show the train/validation split
        #[arg(long, default_value = "false")]
        show_splits: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    if let Some(level) = cli.log_level {
        log_config = log_config.with_level(level);
    }

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            data_dir,
            output,
            backbone_weights,
            epochs,
            batch_size,
            learning_rate,
            validation_fraction,
            seed,
        } => {
            let config = TrainingConfig {
                data_dir,
                output,
                backbone_weights,
                epochs,
                batch_size,
                learning_rate,
                validation_fraction,
                seed,
                ..TrainingConfig::default()
            };
            cmd_train(&config)?;
        }

        Commands::Infer {
            input,
            model,
            report_dir,
        } => {
            cmd_infer(&input, &model, report_dir.as_deref())?;
        }

        Commands::Stats {
            data_dir,
            show_splits,
        } => {
            cmd_stats(&data_dir, show_splits)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════╗
 ║   🌱 Crop Diagnosis                                      ║
 ║   Leaf Disease Classification with Burn + Rust           ║
 ╚══════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn cmd_train(config: &TrainingConfig) -> Result<()> {
    info!("Training on backend: {}", backend_name());

    let start = std::time::Instant::now();
    let summary = training::run_training::<TrainingBackend>(config, &default_device())?;

    if let Some(warning) = class_list_warning(compare_class_lists(&summary.class_names, &CLASS_NAMES)) {
        println!();
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }

    println!();
    println!(
        "{} Training finished in {}",
        "✅".green(),
        format_duration(start.elapsed().as_secs_f64())
    );
    if let Some(last) = summary.history.last() {
        println!(
            "  Final validation accuracy: {:.2}%",
            last.validation.accuracy * 100.0
        );
    }

    Ok(())
}

/// What serving these weights will do, if anything goes wrong
fn class_list_warning(outcome: ClassListMatch) -> Option<String> {
    match outcome {
        ClassListMatch::Identical => None,
        ClassListMatch::WrongCount => Some(format!(
            "Dataset class count differs from the {} served labels; the server will refuse these weights.",
            CLASS_NAMES.len()
        )),
        ClassListMatch::Mismatched => Some(
            "Dataset class order differs from the served labels; the server will load these weights but mislabel predictions. Update CLASS_NAMES to the order in the .classes.json file.".to_string(),
        ),
    }
}

fn cmd_infer(input: &Path, model: &Path, report_dir: Option<&Path>) -> Result<()> {
    if !input.exists() {
        bail!("Input image not found: {:?}", input);
    }

    info!("Loading model from {:?} on {}", model, backend_name());
    let service = DiagnosisService::load_burn::<DefaultBackend>(model, default_device())?;

    let (prediction, diagnosis) = service.diagnose_file(input)?;

    println!("{}", "Diagnosis:".cyan().bold());
    println!("{}", serde_json::to_string_pretty(&diagnosis)?);
    println!();
    println!(
        "  Predicted class: {} ({:.2}%)",
        service.labels()[prediction.index].yellow(),
        prediction.confidence * 100.0
    );

    if let Some(dir) = report_dir {
        let path = write_report(&ReportRequest::from(&diagnosis), dir)?;
        println!("  📄 Report written to {:?}", path);
    }

    Ok(())
}

fn cmd_stats(data_dir: &Path, show_splits: bool) -> Result<()> {
    info!("Computing dataset statistics for: {:?}", data_dir);

    if !data_dir.exists() {
        println!(
            "{} Dataset directory not found: {:?}",
            "Error:".red(),
            data_dir
        );
        return Ok(());
    }

    let dataset = CropDataset::new(data_dir)?;
    dataset.get_stats().print();

    let unknown: Vec<&String> = dataset
        .class_names
        .iter()
        .filter(|name| !CLASS_NAMES.contains(&name.as_str()))
        .collect();
    if !unknown.is_empty() {
        println!();
        println!("{}", "Classes not in the served label list:".yellow());
        for name in unknown {
            println!("  - {}", name);
        }
    }

    if show_splits {
        let split = split_validation(&dataset.samples, training::DEFAULT_VALIDATION_FRACTION)?;
        println!();
        println!("{}", split);
    }

    Ok(())
}
