// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with `clap` and routes each
// subcommand to its use case in Layer 2.
//
//   1. `train-gan`        — adversarial training
//   2. `train-classifier` — classifier training
//   3. `evaluate`         — accuracy with optional faults
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainClassifierArgs, TrainGanArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mnist-gan-lab",
    version = "0.1.0",
    about = "Train a GAN on MNIST digits, and probe a classifier under weight bit-faults."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::TrainGan(args)        => run_train_gan(args),
            Commands::TrainClassifier(args) => run_train_classifier(args),
            Commands::Evaluate(args)        => run_evaluate(args),
        }
    }
}

fn run_train_gan(args: TrainGanArgs) -> Result<()> {
    use crate::application::gan_use_case::TrainGanUseCase;

    tracing::info!("Checkpoints go to: {}", args.checkpoint_dir);
    let outcome = TrainGanUseCase::new(args.into()).execute()?;

    println!(
        "{} epochs, {} batches, {} checkpoints written.",
        outcome.epochs, outcome.batches, outcome.checkpoints
    );
    Ok(())
}

fn run_train_classifier(args: TrainClassifierArgs) -> Result<()> {
    use crate::application::classifier_use_case::TrainClassifierUseCase;

    let model_dir = args.model_dir.clone();
    let outcome   = TrainClassifierUseCase::new(args.into()).execute()?;

    if let Some(loss) = outcome.last_loss {
        println!("Final loss {:.4}. Classifier saved to '{}'.", loss, model_dir);
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::classifier_use_case::EvaluateUseCase;

    let faults = args.fault_injection;
    let report = EvaluateUseCase::new(args.into()).execute()?;

    println!(
        "Accuracy: {}/{} = {:.2}%{}",
        report.correct,
        report.evaluated,
        report.accuracy() * 100.0,
        if faults { format!(" ({} faults injected)", report.faults_injected) } else { String::new() },
    );
    Ok(())
}
