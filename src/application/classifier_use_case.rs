// ============================================================
// Layer 2 — Classifier Use Cases
// ============================================================
// Two workflows around the fault-injection subject:
//
//   TrainClassifierUseCase
//     Step 1: Load training digits           (Layer 4 - data)
//     Step 2: Build the [0, 1] pipeline      (Layer 4 - data)
//     Step 3: Train with SGD, save `net`     (Layer 5 - ml)
//
//   EvaluateUseCase
//     Step 1: Load `net` onto the plain
//             (non-autodiff) backend         (Layer 6 - infra)
//     Step 2: Load test digits, batch of 1   (Layer 4 - data)
//     Step 3: Evaluate, optionally with one
//             fault before every example     (Layer 5 - ml)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::application::{gan_use_case::{with_backend, DeviceKind}, image_source};
use crate::data::{batcher::{ImagePipeline, PixelScale}, dataset::ImageDataset};
use crate::domain::error::GanError;
use crate::domain::image::Split;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    classifier::ClassifierNetConfig,
    classifier_trainer::{run_classifier, ClassifierOutcome},
    fault::FaultInjector,
    inferencer::{EvalReport, Evaluator},
};

// ─── Classifier training ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub data_dir:         String,
    pub synthetic:        Option<usize>,
    pub model_dir:        String,
    pub device:           DeviceKind,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub checkpoint_every: usize,
    pub log_interval:     usize,
    pub seed:             u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data/mnist".to_string(),
            synthetic:        None,
            model_dir:        "model".to_string(),
            device:           DeviceKind::Cpu,
            batch_size:       64,
            epochs:           10,
            lr:               0.01,
            checkpoint_every: 100,
            log_interval:     100,
            seed:             1,
        }
    }
}

pub struct TrainClassifierUseCase {
    config: ClassifierConfig,
}

impl TrainClassifierUseCase {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ClassifierOutcome> {
        let cfg = &self.config;
        if cfg.batch_size == 0 || cfg.epochs == 0 || cfg.checkpoint_every == 0 || cfg.log_interval == 0 {
            return Err(GanError::config("batch size, epochs and intervals must be at least 1").into());
        }
        with_backend!(cfg.device, |B, device| self.run_on::<B>(device))
    }

    fn run_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<ClassifierOutcome> {
        let cfg = &self.config;
        B::seed(cfg.seed);

        // ── Step 1: Training digits ───────────────────────────────────────────
        let items = image_source(&cfg.data_dir, cfg.synthetic, cfg.seed)
            .load(Split::Train)
            .context("Cannot load training digits")?;

        // ── Step 2: Pipeline ──────────────────────────────────────────────────
        let pipeline = ImagePipeline::<B>::new(
            ImageDataset::new(items),
            cfg.batch_size,
            PixelScale::Unit,
            Some(cfg.seed),
            &device,
        );

        // ── Step 3: Train ─────────────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.model_dir)?;
        checkpoints.save_config(cfg)?;
        let model = ClassifierNetConfig::new().init::<B>(&device);
        let (_, outcome) = run_classifier(model, &pipeline, cfg, &checkpoints)?;

        tracing::info!("Classifier saved to '{}'", cfg.model_dir);
        Ok(outcome)
    }
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub data_dir:         String,
    pub synthetic:        Option<usize>,
    pub model_dir:        String,
    pub device:           DeviceKind,
    pub max_examples:     usize,
    pub fault_injection:  bool,
    pub flip_probability: f64,
    pub pattern_byte:     u8,
    pub seed:             u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data/mnist".to_string(),
            synthetic:        None,
            model_dir:        "model".to_string(),
            device:           DeviceKind::Cpu,
            max_examples:     1000,
            fault_injection:  false,
            flip_probability: 0.001,
            pattern_byte:     0xFF,
            seed:             1,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalReport> {
        with_backend!(self.config.device, |B, device| self.run_on::<B>(device))
    }

    /// Evaluation never needs gradients; everything runs on the inner backend.
    fn run_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<EvalReport> {
        let cfg = &self.config;

        // Built before anything is loaded so a bad probability fails fast
        let mut injector = if cfg.fault_injection {
            Some(FaultInjector::new(cfg.flip_probability, cfg.pattern_byte, cfg.seed)?)
        } else {
            None
        };

        // ── Step 1: Model ─────────────────────────────────────────────────────
        let checkpoints = CheckpointManager::open(&cfg.model_dir)
            .context("Cannot open model directory. Have you run 'train-classifier' first?")?;
        let evaluator = Evaluator::<B::InnerBackend>::from_checkpoint(&checkpoints, &device)?;

        // ── Step 2: Test digits ───────────────────────────────────────────────
        let items = image_source(&cfg.data_dir, cfg.synthetic, cfg.seed)
            .load(Split::Test)
            .context("Cannot load test digits")?;
        let pipeline = ImagePipeline::<B::InnerBackend>::new(
            ImageDataset::new(items),
            1,
            PixelScale::Unit,
            None,
            &device,
        );

        // ── Step 3: Evaluate ──────────────────────────────────────────────────
        let report = evaluator.evaluate(&pipeline, cfg.max_examples, injector.as_mut())?;
        tracing::info!(
            "Evaluated {} examples, {} correct, {} faults injected",
            report.evaluated, report.correct, report.faults_injected
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_then_evaluate_with_and_without_faults() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().to_string_lossy().into_owned();

        let train = ClassifierConfig {
            model_dir:        model_dir.clone(),
            synthetic:        Some(100),
            batch_size:       10,
            epochs:           1,
            checkpoint_every: 5,
            log_interval:     5,
            ..ClassifierConfig::default()
        };
        let outcome = TrainClassifierUseCase::new(train).execute().unwrap();
        assert_eq!(outcome.batches, 10);

        let eval = EvalConfig {
            model_dir:    model_dir.clone(),
            synthetic:    Some(50),
            max_examples: 50,
            ..EvalConfig::default()
        };
        let clean = EvaluateUseCase::new(eval.clone()).execute().unwrap();

        let faulty = EvaluateUseCase::new(EvalConfig {
            fault_injection:  true,
            flip_probability: 0.0,
            ..eval
        })
        .execute()
        .unwrap();

        assert_eq!(clean.evaluated, 50);
        assert_eq!(faulty.faults_injected, 50);
        assert_eq!(faulty.accuracy(), clean.accuracy());
    }

    #[test]
    fn test_evaluate_without_model_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let eval = EvalConfig {
            model_dir: dir.path().join("missing").to_string_lossy().into_owned(),
            synthetic: Some(5),
            ..EvalConfig::default()
        };
        let err = EvaluateUseCase::new(eval).execute().err().unwrap();
        assert!(matches!(err.downcast_ref::<GanError>(), Some(GanError::Io { .. })));
    }

    #[test]
    fn test_invalid_flip_probability_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let eval = EvalConfig {
            model_dir:        dir.path().to_string_lossy().into_owned(),
            synthetic:        Some(5),
            fault_injection:  true,
            flip_probability: 2.0,
            ..EvalConfig::default()
        };
        let err = EvaluateUseCase::new(eval).execute().err().unwrap();
        assert!(matches!(err.downcast_ref::<GanError>(), Some(GanError::Configuration { .. })));
    }
}
