// ============================================================
// Layer 2 — TrainGanUseCase
// ============================================================
// Orchestrates one adversarial training run:
//
//   Step 1: Validate the configuration          (Layer 2)
//   Step 2: Pick backend + device, seed it      (Layer 2)
//   Step 3: Load the training digits            (Layer 4 - data)
//   Step 4: Build the batch pipeline            (Layer 4 - data)
//   Step 5: Open the checkpoint directory; when
//           resuming, compare against the saved
//           train_config.json                   (Layer 6 - infra)
//   Step 6: Build generator + discriminator
//           and their Adam optimisers           (Layer 5 - ml)
//   Step 7: Restore the last checkpoint when
//           resuming, then write
//           train_config.json + metrics.csv     (Layer 6 - infra)
//   Step 8: Run the adversarial loop            (Layer 5 - ml)

use std::{fmt, str::FromStr};

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::image_source;
use crate::data::{batcher::{ImagePipeline, PixelScale}, dataset::ImageDataset};
use crate::domain::error::{GanError, GanResult};
use crate::domain::image::Split;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::model::{DcganConfig, ImageDiscriminator, ImageGenerator, MlpGanConfig};
use crate::ml::trainer::{run_adversarial, AdversarialState, TrainingOutcome};

// ─── Architecture / Device ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Dcgan,
    Mlp,
}

impl FromStr for Architecture {
    type Err = GanError;

    fn from_str(s: &str) -> GanResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dcgan" => Ok(Self::Dcgan),
            "mlp"   => Ok(Self::Mlp),
            other   => Err(GanError::config(format!("unknown architecture '{other}' (dcgan|mlp)"))),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dcgan => "dcgan",
            Self::Mlp   => "mlp",
        })
    }
}

/// Where tensors live for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Wgpu,
}

impl FromStr for DeviceKind {
    type Err = GanError;

    fn from_str(s: &str) -> GanResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu"  => Ok(Self::Cpu),
            "wgpu" => Ok(Self::Wgpu),
            other  => Err(GanError::config(format!("unknown device '{other}' (cpu|wgpu)"))),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu  => "cpu",
            Self::Wgpu => "wgpu",
        })
    }
}

/// Run `$body` with `$B` bound to the autodiff backend for `$kind`
/// and `$device` to its default device.
macro_rules! with_backend {
    ($kind:expr, |$B:ident, $device:ident| $body:expr) => {
        match $kind {
            $crate::application::gan_use_case::DeviceKind::Cpu => {
                type $B = ::burn::backend::Autodiff<::burn::backend::NdArray>;
                let $device = <$B as ::burn::tensor::backend::Backend>::Device::default();
                $body
            }
            #[cfg(feature = "wgpu")]
            $crate::application::gan_use_case::DeviceKind::Wgpu => {
                type $B = ::burn::backend::Autodiff<::burn::backend::Wgpu>;
                let $device = <$B as ::burn::tensor::backend::Backend>::Device::default();
                $body
            }
            #[cfg(not(feature = "wgpu"))]
            $crate::application::gan_use_case::DeviceKind::Wgpu => {
                return Err($crate::domain::error::GanError::config(
                    "built without the `wgpu` feature",
                ).into());
            }
        }
    };
}
pub(crate) use with_backend;

// ─── GAN Configuration ────────────────────────────────────────────────────────
// One immutable structure built at startup and threaded through
// every component. Written to train_config.json for each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanConfig {
    pub data_dir:               String,
    /// Train on N synthetic digits instead of MNIST
    pub synthetic_examples:     Option<usize>,
    pub checkpoint_dir:         String,
    pub resume:                 bool,
    pub arch:                   Architecture,
    pub device:                 DeviceKind,
    pub noise_dim:              usize,
    pub batch_size:             usize,
    pub epochs:                 usize,
    pub checkpoint_every:       usize,
    pub samples_per_checkpoint: usize,
    pub log_interval:           usize,
    pub lr:                     f64,
    pub beta1:                  f32,
    pub beta2:                  f32,
    pub real_label_min:         f64,
    pub real_label_max:         f64,
    pub fake_label:             f64,
    pub generator_target:       f64,
    pub seed:                   u64,
}

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            data_dir:               "data/mnist".to_string(),
            synthetic_examples:     None,
            checkpoint_dir:         "checkpoints".to_string(),
            resume:                 false,
            arch:                   Architecture::Dcgan,
            device:                 DeviceKind::Cpu,
            noise_dim:              100,
            batch_size:             64,
            epochs:                 30,
            checkpoint_every:       200,
            samples_per_checkpoint: 10,
            log_interval:           10,
            lr:                     2e-4,
            beta1:                  0.5,
            beta2:                  0.5,
            real_label_min:         0.8,
            real_label_max:         1.0,
            fake_label:             0.0,
            generator_target:       1.0,
            seed:                   1,
        }
    }
}

impl GanConfig {
    /// Reject anything that would only fail once training is under way.
    pub fn validate(&self) -> GanResult<()> {
        let positive = [
            ("batch size", self.batch_size),
            ("epochs", self.epochs),
            ("checkpoint interval", self.checkpoint_every),
            ("samples per checkpoint", self.samples_per_checkpoint),
            ("log interval", self.log_interval),
            ("noise dimension", self.noise_dim),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(GanError::config(format!("{name} must be at least 1")));
        }
        if self.synthetic_examples == Some(0) {
            return Err(GanError::config("synthetic dataset must hold at least one example"));
        }

        let (lo, hi) = (self.real_label_min, self.real_label_max);
        if !(lo > 0.0 && lo < hi && hi <= 1.0) {
            return Err(GanError::config(format!(
                "real label range [{lo}, {hi}] must be non-empty and inside (0, 1]"
            )));
        }
        for (name, v) in [("fake label", self.fake_label), ("generator target", self.generator_target)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(GanError::config(format!("{name} {v} must lie in [0, 1]")));
            }
        }
        if !(self.lr > 0.0) {
            return Err(GanError::config(format!("learning rate {} must be positive", self.lr)));
        }
        Ok(())
    }
}

// ─── TrainGanUseCase ──────────────────────────────────────────────────────────
pub struct TrainGanUseCase {
    config: GanConfig,
}

impl TrainGanUseCase {
    pub fn new(config: GanConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainingOutcome> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Backend ───────────────────────────────────────────────────
        tracing::info!("Training {} GAN on {}", cfg.arch, cfg.device);
        with_backend!(cfg.device, |B, device| self.run_on::<B>(device))
    }

    fn run_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainingOutcome> {
        let cfg = &self.config;
        B::seed(cfg.seed);

        // ── Step 3: Training digits ───────────────────────────────────────────
        let items = image_source(&cfg.data_dir, cfg.synthetic_examples, cfg.seed)
            .load(Split::Train)
            .context("Cannot load training digits")?;
        tracing::info!("Training on {} digits", items.len());

        // ── Step 4: Pipeline ──────────────────────────────────────────────────
        let pipeline = ImagePipeline::<B>::new(
            ImageDataset::new(items),
            cfg.batch_size,
            PixelScale::Symmetric,
            Some(cfg.seed),
            &device,
        );

        // ── Step 5: Checkpoint directory ──────────────────────────────────────
        // Resuming never creates the directory: there must be something to resume.
        let checkpoints = if cfg.resume {
            CheckpointManager::open(&cfg.checkpoint_dir)
        } else {
            CheckpointManager::new(&cfg.checkpoint_dir)
        }
        .with_context(|| format!("Cannot use checkpoint directory '{}'", cfg.checkpoint_dir))?;
        if cfg.resume {
            check_resumable(cfg, &checkpoints.load_config::<GanConfig>()?)
                .with_context(|| format!("Cannot resume from '{}'", cfg.checkpoint_dir))?;
        }

        // ── Step 6–8: Networks, optional restore, training ────────────────────
        let outcome = match cfg.arch {
            Architecture::Dcgan => {
                let arch = DcganConfig::new().with_noise_dim(cfg.noise_dim);
                self.train(
                    arch.init_generator::<B>(&device),
                    arch.init_discriminator::<B>(&device),
                    device, &pipeline, &checkpoints,
                )?
            }
            Architecture::Mlp => {
                let arch = MlpGanConfig::new().with_noise_dim(cfg.noise_dim);
                self.train(
                    arch.init_generator::<B>(&device),
                    arch.init_discriminator::<B>(&device),
                    device, &pipeline, &checkpoints,
                )?
            }
        };

        Ok(outcome)
    }

    fn train<B, G, D>(
        &self,
        generator:     G,
        discriminator: D,
        device:        B::Device,
        pipeline:      &ImagePipeline<B>,
        checkpoints:   &CheckpointManager,
    ) -> Result<TrainingOutcome>
    where
        B: AutodiffBackend,
        G: ImageGenerator<B> + AutodiffModule<B>,
        G::InnerModule: ImageGenerator<B::InnerBackend>,
        D: ImageDiscriminator<B> + AutodiffModule<B>,
    {
        let cfg  = &self.config;
        let adam = AdamConfig::new().with_beta_1(cfg.beta1).with_beta_2(cfg.beta2);

        let state = AdversarialState::new(
            generator,
            discriminator,
            adam.init::<B, G>(),
            adam.init::<B, D>(),
            device,
        );
        let state = if cfg.resume {
            state
                .restore(checkpoints)
                .with_context(|| format!("Cannot resume from '{}'", cfg.checkpoint_dir))?
        } else {
            state
        };

        // Only touch the directory once there is a run to record
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        let (_, outcome) = run_adversarial(state, pipeline, cfg, checkpoints, Some(&metrics))?;
        Ok(outcome)
    }
}

/// A resumed run must rebuild the networks the checkpoint was written from.
fn check_resumable(cfg: &GanConfig, saved: &GanConfig) -> GanResult<()> {
    if cfg.arch != saved.arch {
        return Err(GanError::config(format!(
            "checkpoint holds a {} pair, not {}",
            saved.arch, cfg.arch
        )));
    }
    if cfg.noise_dim != saved.noise_dim {
        return Err(GanError::Shape {
            context:  "noise vector",
            expected: vec![saved.noise_dim],
            actual:   vec![cfg.noise_dim],
        });
    }
    Ok(())
}
