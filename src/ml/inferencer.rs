// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Measures classifier accuracy one example at a time.
//
// With a FaultInjector attached, one row of one randomly
// chosen weight matrix is corrupted before every example.
// Corruptions accumulate on the evaluator's own copy of the
// model; the copy is never trained or saved, so the damage
// ends with the evaluator.

use burn::prelude::*;

use crate::data::batcher::ImagePipeline;
use crate::domain::error::{GanError, GanResult};
use crate::infra::checkpoint::{CheckpointManager, CLASSIFIER};
use crate::ml::classifier::{ClassifierNet, ClassifierNetConfig};
use crate::ml::fault::FaultInjector;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalReport {
    pub evaluated:       usize,
    pub correct:         usize,
    pub faults_injected: usize,
}

impl EvalReport {
    /// correct / evaluated; 0 when nothing was evaluated
    pub fn accuracy(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.correct as f64 / self.evaluated as f64
        }
    }
}

pub struct Evaluator<B: Backend> {
    model: ClassifierNet<B>,
}

impl<B: Backend> Evaluator<B> {
    pub fn new(model: ClassifierNet<B>) -> Self {
        Self { model }
    }

    /// Rebuild the default classifier and load the `net` artifact into it.
    pub fn from_checkpoint(checkpoints: &CheckpointManager, device: &B::Device) -> GanResult<Self> {
        let model = ClassifierNetConfig::new().init::<B>(device);
        let model = checkpoints.load_network::<B, _>(CLASSIFIER, model, device)?;
        tracing::info!("Classifier loaded from '{}'", checkpoints.dir().display());
        Ok(Self { model })
    }

    /// Evaluate up to `max_examples` examples from `pipeline`.
    pub fn evaluate(
        self,
        pipeline:     &ImagePipeline<B>,
        max_examples: usize,
        mut injector: Option<&mut FaultInjector>,
    ) -> GanResult<EvalReport> {
        let mut model  = self.model;
        let weight_ids = model.weight_param_ids();
        let mut report = EvalReport::default();

        for batch in pipeline.iter() {
            if report.evaluated >= max_examples {
                break;
            }
            if batch.len() != 1 {
                return Err(GanError::Shape {
                    context:  "evaluation batch",
                    expected: vec![1],
                    actual:   vec![batch.len()],
                });
            }

            if let Some(injector) = injector.as_deref_mut() {
                let (corrupted, fault) = injector.corrupt_random_weight::<B, _>(model, &weight_ids)?;
                model = corrupted;
                report.faults_injected += 1;
                tracing::trace!("Fault {}: {} bytes flipped", report.faults_injected, fault.flipped);
            }

            let hits: i64 = model
                .predict(batch.images)
                .equal(batch.labels)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();

            report.evaluated += 1;
            report.correct   += hits as usize;
        }

        Ok(report)
    }
}
