// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal per
// subcommand. No tensor math here and no clap types: each use
// case receives a plain config struct built by Layer 1.
//
//   gan_use_case.rs        — adversarial training (train-gan)
//   classifier_use_case.rs — classifier training and fault
//                            evaluation (train-classifier,
//                            evaluate)
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

use crate::data::loader::{MnistLoader, SyntheticSource};
use crate::domain::traits::ImageSource;

/// The adversarial training workflow
pub mod gan_use_case;

/// Classifier training and fault-injection evaluation
pub mod classifier_use_case;

/// Synthetic digits when a count is given, MNIST from `data_dir` otherwise.
pub(crate) fn image_source(data_dir: &str, synthetic: Option<usize>, seed: u64) -> Box<dyn ImageSource> {
    match synthetic {
        Some(examples) => {
            tracing::info!("Using {} synthetic digits", examples);
            Box::new(SyntheticSource::new(examples, seed))
        }
        None => Box::new(MnistLoader::new(data_dir)),
    }
}
