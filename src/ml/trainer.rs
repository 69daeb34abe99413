// ============================================================
// Layer 5 — Adversarial Training Loop
// ============================================================
// Alternating generator / discriminator optimisation.
//
// Per batch, strictly in this order:
//
//   discriminator
//     1. fresh gradient accumulator (nothing carries over)
//     2. real digits → D, soft positive labels ~ U[lo, hi)
//     3. real-branch BCE, backward, accumulate
//     4. fresh noise → G → fake digits
//     5. fake digits DETACHED → D, hard negative labels,
//        backward, accumulate (G receives nothing from this)
//     6. D optimiser step on real + fake gradients
//   generator
//     7. fresh gradients for G
//     8. the SAME fake digits, NOT detached → updated D,
//        hard positive labels
//     9. backward through D into G, G optimiser step
//   bookkeeping
//    10. progress line every `log_interval` batches
//    11. checkpoint cycle every `checkpoint_every` batches,
//        synchronous: training waits until it is on disk
//
// Burn returns gradients from backward() as values rather than
// accumulating them on the parameters, so "zeroing" a network's
// gradients means starting a new accumulator for it.
//
// Resuming restores weights and optimiser state only; the data
// pipeline restarts at epoch 1, batch 1.

use burn::{
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, Distribution},
};

use crate::application::gan_use_case::GanConfig;
use crate::data::batcher::{ImageBatch, ImagePipeline};
use crate::domain::counter::CheckpointCounter;
use crate::domain::error::{GanError, GanResult};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{MetricsLogger, ProgressRecord};
use crate::ml::model::{binary_cross_entropy, ImageDiscriminator, ImageGenerator};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchLosses {
    /// Real-branch + fake-branch discriminator loss
    pub d_loss: f64,
    pub g_loss: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingOutcome {
    pub epochs:      usize,
    pub batches:     usize,
    /// Checkpoint cycles completed in this process
    pub checkpoints: u64,
    pub last_losses: Option<BatchLosses>,
}

/// The two networks, their optimisers, and the device they live on.
pub struct AdversarialState<B: AutodiffBackend, G, D, OG, OD> {
    pub generator:     G,
    pub discriminator: D,
    pub gen_optim:     OG,
    pub disc_optim:    OD,
    pub device:        B::Device,
}

impl<B, G, D, OG, OD> AdversarialState<B, G, D, OG, OD>
where
    B:  AutodiffBackend,
    G:  ImageGenerator<B> + AutodiffModule<B>,
    G::InnerModule: ImageGenerator<B::InnerBackend>,
    D:  ImageDiscriminator<B> + AutodiffModule<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    pub fn new(generator: G, discriminator: D, gen_optim: OG, disc_optim: OD, device: B::Device) -> Self {
        Self { generator, discriminator, gen_optim, disc_optim, device }
    }

    /// Replace every component with the last checkpoint on disk.
    pub fn restore(self, checkpoints: &CheckpointManager) -> GanResult<Self> {
        let (generator, gen_optim, discriminator, disc_optim) = checkpoints.load::<B, G, OG, D, OD>(
            self.generator,
            self.gen_optim,
            self.discriminator,
            self.disc_optim,
            &self.device,
        )?;
        tracing::info!("Restored generator, discriminator and both optimisers");
        Ok(Self { generator, discriminator, gen_optim, disc_optim, device: self.device })
    }

    /// One checkpoint cycle: the four artifacts, then samples drawn
    /// from the very generator that was just written.
    pub fn checkpoint(&self, checkpoints: &CheckpointManager, cfg: &GanConfig, cycle: u64) -> GanResult<()> {
        checkpoints.save::<B, G, OG, D, OD>(
            &self.generator,
            &self.gen_optim,
            &self.discriminator,
            &self.disc_optim,
            cycle,
        )?;

        // Inference copy: batch norm uses running stats and nothing is updated
        let sampler = self.generator.valid();
        checkpoints.sample_and_save::<B::InnerBackend, G::InnerModule>(
            &sampler,
            cfg.samples_per_checkpoint,
            cfg.noise_dim,
            &self.device,
            cycle,
        )?;
        Ok(())
    }

    pub fn train_batch(self, batch: ImageBatch<B>, cfg: &GanConfig) -> GanResult<(Self, BatchLosses)> {
        let Self { mut generator, mut discriminator, mut gen_optim, mut disc_optim, device } = self;

        check_batch(&discriminator, &batch)?;
        let batch_size = batch.len();

        // ── Discriminator: real digits ────────────────────────────────────────
        let mut disc_grads = GradientsAccumulator::<D>::new();

        let real_labels = Tensor::<B, 1>::random(
            [batch_size],
            Distribution::Uniform(cfg.real_label_min, cfg.real_label_max),
            &device,
        );
        let d_loss_real = binary_cross_entropy(discriminator.forward(batch.images), real_labels);
        disc_grads.accumulate::<B>(
            &discriminator,
            GradientsParams::from_grads::<B, D>(d_loss_real.backward(), &discriminator),
        );

        // ── Discriminator: fake digits ────────────────────────────────────────
        let noise = Tensor::<B, 2>::random(
            [batch_size, generator.noise_dim()],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        let fake_images = generator.forward(noise);
        check_generated(&discriminator, &fake_images)?;

        let d_loss_fake = fake_branch_loss(&discriminator, fake_images.clone(), cfg.fake_label);
        disc_grads.accumulate::<B>(
            &discriminator,
            GradientsParams::from_grads::<B, D>(d_loss_fake.backward(), &discriminator),
        );

        let d_loss = scalar(d_loss_real) + scalar(d_loss_fake);
        discriminator = disc_optim.step(cfg.lr, discriminator, disc_grads.grads());

        // ── Generator ─────────────────────────────────────────────────────────
        let g_loss = generator_loss(&discriminator, fake_images, cfg.generator_target);
        let gen_grads = GradientsParams::from_grads::<B, G>(g_loss.backward(), &generator);
        generator = gen_optim.step(cfg.lr, generator, gen_grads);

        let losses = BatchLosses { d_loss, g_loss: scalar(g_loss) };
        Ok((Self { generator, discriminator, gen_optim, disc_optim, device }, losses))
    }
}

/// Discriminator loss on generated digits. The images are detached
/// first, so backward() stops at the discriminator.
pub fn fake_branch_loss<B: Backend, D: ImageDiscriminator<B>>(
    discriminator: &D,
    fake_images:   Tensor<B, 4>,
    fake_label:    f64,
) -> Tensor<B, 1> {
    let batch_size = fake_images.dims()[0];
    let labels = Tensor::<B, 1>::full([batch_size], fake_label, &fake_images.device());
    binary_cross_entropy(discriminator.forward(fake_images.detach()), labels)
}

/// Generator loss: how far the discriminator is from calling the
/// generated digits real. Gradients flow back into the generator.
pub fn generator_loss<B: Backend, D: ImageDiscriminator<B>>(
    discriminator: &D,
    fake_images:   Tensor<B, 4>,
    target:        f64,
) -> Tensor<B, 1> {
    let batch_size = fake_images.dims()[0];
    let labels = Tensor::<B, 1>::full([batch_size], target, &fake_images.device());
    binary_cross_entropy(discriminator.forward(fake_images), labels)
}

fn scalar<B: Backend>(loss: Tensor<B, 1>) -> f64 {
    loss.into_scalar().elem::<f64>()
}

fn check_batch<B: Backend, D: ImageDiscriminator<B>>(discriminator: &D, batch: &ImageBatch<B>) -> GanResult<()> {
    let [n, c, h, w] = batch.images.dims();
    let expected = discriminator.image_shape();
    if n == 0 || [c, h, w] != expected {
        return Err(GanError::Shape {
            context:  "real batch",
            expected: expected.to_vec(),
            actual:   vec![c, h, w],
        });
    }
    let labels = batch.labels.dims()[0];
    if labels != n {
        return Err(GanError::Shape {
            context:  "label batch",
            expected: vec![n],
            actual:   vec![labels],
        });
    }
    Ok(())
}

fn check_generated<B: Backend, D: ImageDiscriminator<B>>(discriminator: &D, fake: &Tensor<B, 4>) -> GanResult<()> {
    let [_, c, h, w] = fake.dims();
    let expected = discriminator.image_shape();
    if [c, h, w] != expected {
        return Err(GanError::Shape {
            context:  "generated batch",
            expected: expected.to_vec(),
            actual:   vec![c, h, w],
        });
    }
    Ok(())
}

/// Drive the epoch / batch loop to completion.
pub fn run_adversarial<B, G, D, OG, OD>(
    mut state:   AdversarialState<B, G, D, OG, OD>,
    pipeline:    &ImagePipeline<B>,
    cfg:         &GanConfig,
    checkpoints: &CheckpointManager,
    metrics:     Option<&MetricsLogger>,
) -> GanResult<(AdversarialState<B, G, D, OG, OD>, TrainingOutcome)>
where
    B:  AutodiffBackend,
    G:  ImageGenerator<B> + AutodiffModule<B>,
    G::InnerModule: ImageGenerator<B::InnerBackend>,
    D:  ImageDiscriminator<B> + AutodiffModule<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    if state.generator.noise_dim() != cfg.noise_dim {
        return Err(GanError::Shape {
            context:  "noise vector",
            expected: vec![state.generator.noise_dim()],
            actual:   vec![cfg.noise_dim],
        });
    }

    let batches_per_epoch = pipeline.batches_per_epoch();
    let mut counter = CheckpointCounter::new();
    let mut outcome = TrainingOutcome::default();

    for epoch in 1..=cfg.epochs {
        for (i, batch) in pipeline.iter().enumerate() {
            let batch_index = i + 1;

            let (next, losses) = state.train_batch(batch, cfg)?;
            state = next;
            outcome.batches += 1;
            outcome.last_losses = Some(losses);

            if batch_index % cfg.log_interval == 0 {
                println!(
                    "[{:2}/{:2}][{:3}/{:3}] D_loss: {:.4} | G_loss: {:.4}",
                    epoch, cfg.epochs, batch_index, batches_per_epoch,
                    losses.d_loss, losses.g_loss,
                );
                if let Some(metrics) = metrics {
                    metrics.log(&ProgressRecord::new(epoch, batch_index, losses.d_loss, losses.g_loss))?;
                }
            }

            if batch_index % cfg.checkpoint_every == 0 {
                state.checkpoint(checkpoints, cfg, counter.next())?;
                counter.advance();
                println!("-> checkpoint {}", counter.value());
            }
        }
        outcome.epochs = epoch;
    }

    outcome.checkpoints = counter.value();
    println!("Training complete");
    tracing::info!(
        "Adversarial training finished: {} batches, {} checkpoints",
        outcome.batches, outcome.checkpoints
    );
    Ok((state, outcome))
}
