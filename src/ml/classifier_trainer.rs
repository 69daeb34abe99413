// ============================================================
// Layer 5 — Classifier Training Loop
// ============================================================
// Plain supervised loop for the fault-injection subject:
//
//   forward → cross-entropy → backward → SGD step
//
// The `net` artifact is rewritten every `checkpoint_every`
// batches (per-epoch batch index) and once more at the end.
//
// Reference: Burn Book §5 (Training)

use burn::{
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::classifier_use_case::ClassifierConfig;
use crate::data::batcher::ImagePipeline;
use crate::domain::error::{GanError, GanResult};
use crate::domain::image::IMAGE_SIDE;
use crate::infra::checkpoint::{CheckpointManager, CLASSIFIER};
use crate::ml::classifier::ClassifierNet;

#[derive(Debug, Clone, Default)]
pub struct ClassifierOutcome {
    pub epochs:     usize,
    pub batches:    usize,
    pub first_loss: Option<f64>,
    pub last_loss:  Option<f64>,
}

pub fn run_classifier<B: AutodiffBackend>(
    mut model:   ClassifierNet<B>,
    pipeline:    &ImagePipeline<B>,
    cfg:         &ClassifierConfig,
    checkpoints: &CheckpointManager,
) -> GanResult<(ClassifierNet<B>, ClassifierOutcome)> {
    let mut optim = SgdConfig::new().init::<B, ClassifierNet<B>>();
    let batches_per_epoch = pipeline.batches_per_epoch();
    let mut outcome = ClassifierOutcome::default();

    for epoch in 1..=cfg.epochs {
        for (i, batch) in pipeline.iter().enumerate() {
            let batch_index = i + 1;

            let [_, c, h, w] = batch.images.dims();
            if [c, h, w] != [1, IMAGE_SIDE, IMAGE_SIDE] {
                return Err(GanError::Shape {
                    context:  "classifier batch",
                    expected: vec![1, IMAGE_SIDE, IMAGE_SIDE],
                    actual:   vec![c, h, w],
                });
            }

            let loss = model.forward_loss(batch.images, batch.labels);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads::<B, _>(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);

            outcome.batches += 1;
            outcome.first_loss.get_or_insert(loss_val);
            outcome.last_loss = Some(loss_val);

            if batch_index % cfg.log_interval == 0 {
                println!(
                    "[{:2}/{:2}][{:3}/{:3}] loss: {:.4}",
                    epoch, cfg.epochs, batch_index, batches_per_epoch, loss_val,
                );
            }
            if batch_index % cfg.checkpoint_every == 0 {
                checkpoints.save_network::<B, _>(CLASSIFIER, &model)?;
                tracing::debug!("Saved classifier at epoch {} batch {}", epoch, batch_index);
            }
        }
        outcome.epochs = epoch;
    }

    checkpoints.save_network::<B, _>(CLASSIFIER, &model)?;
    println!("Training complete");
    Ok((model, outcome))
}
