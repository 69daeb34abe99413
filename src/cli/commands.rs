// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and all their flags:
//
//   train-gan         — adversarial training with checkpoints
//   train-classifier  — supervised training of the classifier
//   evaluate          — accuracy, optionally under weight faults
//
// Every Args struct converts into a plain application config;
// the application layer never sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::classifier_use_case::{ClassifierConfig, EvalConfig};
use crate::application::gan_use_case::{Architecture, DeviceKind, GanConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the generator / discriminator pair
    TrainGan(TrainGanArgs),

    /// Train the feed-forward digit classifier
    TrainClassifier(TrainClassifierArgs),

    /// Measure classifier accuracy, optionally with fault injection
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainGanArgs {
    /// Directory holding the four MNIST IDX files
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    /// Train on N synthetic digits instead of MNIST
    #[arg(long, value_name = "N")]
    pub synthetic: Option<usize>,

    /// Where weights, optimiser state and samples are written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Continue from the artifacts in --checkpoint-dir
    #[arg(long)]
    pub resume: bool,

    /// Network pair to train: dcgan or mlp
    #[arg(long, default_value = "dcgan")]
    pub arch: Architecture,

    /// cpu or wgpu
    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    /// Length of the generator's noise vector
    #[arg(long, default_value_t = 100)]
    pub noise_dim: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    /// Run a checkpoint cycle every N batches of an epoch
    #[arg(long, default_value_t = 200)]
    pub checkpoint_every: usize,

    /// Number of digits drawn at each checkpoint
    #[arg(long, default_value_t = 10)]
    pub samples_per_checkpoint: usize,

    /// Print losses every N batches
    #[arg(long, default_value_t = 10)]
    pub log_interval: usize,

    /// Adam learning rate for both networks
    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.5)]
    pub beta1: f32,

    #[arg(long, default_value_t = 0.5)]
    pub beta2: f32,

    /// Lower bound of the soft "real" label
    #[arg(long, default_value_t = 0.8)]
    pub real_label_min: f64,

    /// Upper bound of the soft "real" label
    #[arg(long, default_value_t = 1.0)]
    pub real_label_max: f64,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl From<TrainGanArgs> for GanConfig {
    fn from(a: TrainGanArgs) -> Self {
        GanConfig {
            data_dir:               a.data_dir,
            synthetic_examples:     a.synthetic,
            checkpoint_dir:         a.checkpoint_dir,
            resume:                 a.resume,
            arch:                   a.arch,
            device:                 a.device,
            noise_dim:              a.noise_dim,
            batch_size:             a.batch_size,
            epochs:                 a.epochs,
            checkpoint_every:       a.checkpoint_every,
            samples_per_checkpoint: a.samples_per_checkpoint,
            log_interval:           a.log_interval,
            lr:                     a.lr,
            beta1:                  a.beta1,
            beta2:                  a.beta2,
            real_label_min:         a.real_label_min,
            real_label_max:         a.real_label_max,
            seed:                   a.seed,
            ..GanConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainClassifierArgs {
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    #[arg(long, value_name = "N")]
    pub synthetic: Option<usize>,

    /// Where the `net` artifact is written
    #[arg(long, default_value = "model")]
    pub model_dir: String,

    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    #[arg(long, default_value_t = 100)]
    pub checkpoint_every: usize,

    #[arg(long, default_value_t = 100)]
    pub log_interval: usize,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl From<TrainClassifierArgs> for ClassifierConfig {
    fn from(a: TrainClassifierArgs) -> Self {
        ClassifierConfig {
            data_dir:         a.data_dir,
            synthetic:        a.synthetic,
            model_dir:        a.model_dir,
            device:           a.device,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            checkpoint_every: a.checkpoint_every,
            log_interval:     a.log_interval,
            seed:             a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    #[arg(long, value_name = "N")]
    pub synthetic: Option<usize>,

    #[arg(long, default_value = "model")]
    pub model_dir: String,

    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    /// Stop after this many test examples
    #[arg(long, default_value_t = 1000)]
    pub max_examples: usize,

    /// Corrupt one weight row before every example
    #[arg(long)]
    pub fault_injection: bool,

    /// Chance that each byte of the chosen row is flipped
    #[arg(long, default_value_t = 0.001)]
    pub flip_probability: f64,

    /// XOR mask applied to flipped bytes (decimal or 0x..)
    #[arg(long, default_value = "0xFF", value_parser = parse_byte)]
    pub pattern_byte: u8,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl From<EvaluateArgs> for EvalConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvalConfig {
            data_dir:         a.data_dir,
            synthetic:        a.synthetic,
            model_dir:        a.model_dir,
            device:           a.device,
            max_examples:     a.max_examples,
            fault_injection:  a.fault_injection,
            flip_probability: a.flip_probability,
            pattern_byte:     a.pattern_byte,
            seed:             a.seed,
        }
    }
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None      => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("'{s}' is not a byte: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_byte_accepts_hex_and_decimal() {
        assert_eq!(parse_byte("0xFF"), Ok(0xFF));
        assert_eq!(parse_byte("15"), Ok(15));
        assert!(parse_byte("0x100").is_err());
    }

    #[test]
    fn test_train_gan_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["mnist-gan-lab", "train-gan", "--arch", "mlp"]).unwrap();
        let Commands::TrainGan(args) = cli.command else { panic!("wrong subcommand") };
        let cfg: GanConfig = args.into();
        let default = GanConfig::default();

        assert_eq!(cfg.arch, Architecture::Mlp);
        assert_eq!(cfg.noise_dim, default.noise_dim);
        assert_eq!(cfg.batch_size, default.batch_size);
        assert_eq!(cfg.checkpoint_every, default.checkpoint_every);
        assert_eq!(cfg.real_label_min, default.real_label_min);
        assert!(!cfg.resume);
    }

    #[test]
    fn test_evaluate_flags() {
        let cli = Cli::try_parse_from([
            "mnist-gan-lab", "evaluate", "--fault-injection",
            "--flip-probability", "0.5", "--pattern-byte", "0x0f",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("wrong subcommand") };
        let cfg: EvalConfig = args.into();
        assert!(cfg.fault_injection);
        assert_eq!(cfg.flip_probability, 0.5);
        assert_eq!(cfg.pattern_byte, 0x0F);
    }
}
