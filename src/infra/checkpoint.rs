// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the adversarial pair, their optimisers,
// sample grids and the classifier.
//
// Directory layout:
//   checkpoints/
//     generator.mpk                 ← generator weights
//     generator-optimizer.mpk       ← generator Adam moments
//     discriminator.mpk             ← discriminator weights
//     discriminator-optimizer.mpk   ← discriminator Adam moments
//     manifest.json                 ← cycle counter + artifact list
//     dcgan-sample-<n>.json         ← noise + pixels of cycle n
//     dcgan-sample-<n>.pgm          ← the same pixels as a grid
//     train_config.json             ← hyperparameters of the run
//     net.mpk                       ← classifier weights
//
// A cycle writes all four network artifacts into .staging/
// first, renames them into place, and writes manifest.json
// last. If anything fails before the renames, the previous
// cycle's files are untouched.
//
// Records use full precision MessagePack so a save/load round
// trip is bit-identical.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::{backend::AutodiffBackend, Distribution},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::error::{GanError, GanResult};
use crate::ml::model::ImageGenerator;

pub const GENERATOR:           &str = "generator";
pub const GENERATOR_OPTIM:     &str = "generator-optimizer";
pub const DISCRIMINATOR:       &str = "discriminator";
pub const DISCRIMINATOR_OPTIM: &str = "discriminator-optimizer";
pub const CLASSIFIER:          &str = "net";

const ARTIFACT_EXT: &str = "mpk";
const MANIFEST:     &str = "manifest.json";
const CONFIG:       &str = "train_config.json";
const STAGING:      &str = ".staging";

type Rec = NamedMpkFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Cycle number of the artifacts currently on disk
    pub counter:   u64,
    pub artifacts: Vec<String>,
}

/// Everything needed to regenerate one sample grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub counter: u64,
    /// [N, C, H, W]
    pub shape:   Vec<usize>,
    /// Row-major [N, noise_dim]
    pub noise:   Vec<f32>,
    /// Generator output mapped to [0, 1], row-major over `shape`
    pub pixels:  Vec<f32>,
}

pub struct CheckpointManager {
    dir:      PathBuf,
    recorder: Rec,
}

impl CheckpointManager {
    /// Use `dir` for checkpoints, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> GanResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| GanError::io(dir.display(), e))?;
        Ok(Self { dir, recorder: Rec::new() })
    }

    /// Use an existing checkpoint directory; never creates one.
    pub fn open(dir: impl AsRef<Path>) -> GanResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(GanError::io(dir.display(), "checkpoint directory does not exist"));
        }
        Ok(Self { dir, recorder: Rec::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a named artifact, with the recorder's extension.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{ARTIFACT_EXT}"))
    }

    pub fn sample_path(&self, cycle: u64, ext: &str) -> PathBuf {
        self.dir.join(format!("dcgan-sample-{cycle}.{ext}"))
    }

    // ─── Adversarial pair ─────────────────────────────────────────────────────

    /// Persist both networks and both optimisers as one cycle.
    pub fn save<B, G, OG, D, OD>(
        &self,
        generator:     &G,
        gen_optim:     &OG,
        discriminator: &D,
        disc_optim:    &OD,
        cycle:         u64,
    ) -> GanResult<()>
    where
        B:  AutodiffBackend,
        G:  AutodiffModule<B>,
        D:  AutodiffModule<B>,
        OG: Optimizer<G, B>,
        OD: Optimizer<D, B>,
    {
        let staging = self.dir.join(STAGING);
        if staging.is_dir() {
            fs::remove_dir_all(&staging).map_err(|e| GanError::io(staging.display(), e))?;
        }
        fs::create_dir(&staging).map_err(|e| GanError::io(staging.display(), e))?;

        let staged = |name: &str| staging.join(name);

        generator
            .clone()
            .save_file(staged(GENERATOR), &self.recorder)
            .map_err(|e| GanError::io(GENERATOR, format!("{e:?}")))?;
        Recorder::<B>::record(&self.recorder, gen_optim.to_record(), staged(GENERATOR_OPTIM))
            .map_err(|e| GanError::io(GENERATOR_OPTIM, format!("{e:?}")))?;
        discriminator
            .clone()
            .save_file(staged(DISCRIMINATOR), &self.recorder)
            .map_err(|e| GanError::io(DISCRIMINATOR, format!("{e:?}")))?;
        Recorder::<B>::record(&self.recorder, disc_optim.to_record(), staged(DISCRIMINATOR_OPTIM))
            .map_err(|e| GanError::io(DISCRIMINATOR_OPTIM, format!("{e:?}")))?;

        let names = [GENERATOR, GENERATOR_OPTIM, DISCRIMINATOR, DISCRIMINATOR_OPTIM];
        for name in names {
            let file = format!("{name}.{ARTIFACT_EXT}");
            let from = staging.join(&file);
            let to   = self.dir.join(&file);
            fs::rename(&from, &to).map_err(|e| GanError::io(to.display(), e))?;
        }

        let manifest = Manifest {
            counter:   cycle,
            artifacts: names.iter().map(|n| format!("{n}.{ARTIFACT_EXT}")).collect(),
        };
        write_json(&self.dir.join(MANIFEST), &manifest)?;
        fs::remove_dir_all(&staging).map_err(|e| GanError::io(staging.display(), e))?;

        tracing::debug!("Saved checkpoint cycle {} to '{}'", cycle, self.dir.display());
        Ok(())
    }

    /// Restore both networks, then both optimisers. Any missing
    /// artifact fails the whole load before anything is read.
    pub fn load<B, G, OG, D, OD>(
        &self,
        generator:     G,
        gen_optim:     OG,
        discriminator: D,
        disc_optim:    OD,
        device:        &B::Device,
    ) -> GanResult<(G, OG, D, OD)>
    where
        B:  AutodiffBackend,
        G:  AutodiffModule<B>,
        D:  AutodiffModule<B>,
        OG: Optimizer<G, B>,
        OD: Optimizer<D, B>,
    {
        for name in [GENERATOR, DISCRIMINATOR, GENERATOR_OPTIM, DISCRIMINATOR_OPTIM] {
            let path = self.artifact_path(name);
            if !path.is_file() {
                return Err(GanError::io(path.display(), "artifact not found"));
            }
        }

        let generator     = self.load_network::<B, G>(GENERATOR, generator, device)?;
        let discriminator = self.load_network::<B, D>(DISCRIMINATOR, discriminator, device)?;

        let record = Recorder::<B>::load(&self.recorder, self.dir.join(GENERATOR_OPTIM), device)
            .map_err(|e| GanError::io(self.artifact_path(GENERATOR_OPTIM).display(), format!("{e:?}")))?;
        let gen_optim = gen_optim.load_record(record);

        let record = Recorder::<B>::load(&self.recorder, self.dir.join(DISCRIMINATOR_OPTIM), device)
            .map_err(|e| GanError::io(self.artifact_path(DISCRIMINATOR_OPTIM).display(), format!("{e:?}")))?;
        let disc_optim = disc_optim.load_record(record);

        tracing::info!("Loaded checkpoint from '{}'", self.dir.display());
        Ok((generator, gen_optim, discriminator, disc_optim))
    }

    pub fn manifest(&self) -> GanResult<Manifest> {
        read_json(&self.dir.join(MANIFEST))
    }

    // ─── Samples ──────────────────────────────────────────────────────────────

    /// Draw `count` fresh noise vectors, run them through `generator`,
    /// and write the JSON record plus a PGM grid for this cycle.
    pub fn sample_and_save<B: Backend, G: ImageGenerator<B>>(
        &self,
        generator: &G,
        count:     usize,
        noise_dim: usize,
        device:    &B::Device,
        cycle:     u64,
    ) -> GanResult<SampleRecord> {
        let json_path = self.sample_path(cycle, "json");

        let noise  = Tensor::<B, 2>::random([count, noise_dim], Distribution::Normal(0.0, 1.0), device);
        let images = generator.forward(noise.clone());
        let shape  = images.dims().to_vec();

        let noise = to_floats(noise, &json_path)?;
        let pixels = to_floats((images + 1.0) / 2.0, &json_path)?;

        let record = SampleRecord { counter: cycle, shape, noise, pixels };
        write_json(&json_path, &record)?;

        let pgm_path = self.sample_path(cycle, "pgm");
        fs::write(&pgm_path, grid_pgm(&record.pixels, &record.shape))
            .map_err(|e| GanError::io(pgm_path.display(), e))?;

        tracing::debug!("Wrote {} samples for cycle {}", count, cycle);
        Ok(record)
    }

    pub fn load_sample(&self, cycle: u64) -> GanResult<SampleRecord> {
        read_json(&self.sample_path(cycle, "json"))
    }

    // ─── Single networks and config ───────────────────────────────────────────

    pub fn save_network<B: Backend, M: Module<B>>(&self, name: &str, model: &M) -> GanResult<()> {
        model
            .clone()
            .save_file(self.dir.join(name), &self.recorder)
            .map_err(|e| GanError::io(self.artifact_path(name).display(), format!("{e:?}")))
    }

    pub fn load_network<B: Backend, M: Module<B>>(&self, name: &str, model: M, device: &B::Device) -> GanResult<M> {
        let path = self.artifact_path(name);
        if !path.is_file() {
            return Err(GanError::io(path.display(), "artifact not found"));
        }
        model
            .load_file(self.dir.join(name), &self.recorder, device)
            .map_err(|e| GanError::io(path.display(), format!("{e:?}")))
    }

    /// Write the run's configuration next to its artifacts.
    pub fn save_config<T: Serialize>(&self, cfg: &T) -> GanResult<()> {
        write_json(&self.dir.join(CONFIG), cfg)
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> GanResult<T> {
        read_json(&self.dir.join(CONFIG))
    }
}

fn to_floats<B: Backend, const D: usize>(tensor: Tensor<B, D>, artifact: &Path) -> GanResult<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| GanError::io(artifact.display(), format!("{e:?}")))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> GanResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| GanError::io(path.display(), e))?;
    fs::write(path, json).map_err(|e| GanError::io(path.display(), e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> GanResult<T> {
    let json = fs::read_to_string(path).map_err(|e| GanError::io(path.display(), e))?;
    serde_json::from_str(&json).map_err(|e| GanError::io(path.display(), e))
}

/// Tile the first channel of N images, values in [0, 1], into a
/// binary greyscale PGM with ceil(sqrt(N)) columns.
pub fn grid_pgm(pixels: &[f32], shape: &[usize]) -> Vec<u8> {
    let (n, c, h, w) = match *shape {
        [n, c, h, w] => (n, c, h, w),
        _ => return Vec::new(),
    };
    let cols = (1..=n.max(1)).find(|k| k * k >= n).unwrap_or(1);
    let rows = n.div_ceil(cols).max(1);
    let (width, height) = (cols * w, rows * h);

    let mut out = format!("P5\n{width} {height}\n255\n").into_bytes();
    let mut raster = vec![0u8; width * height];
    for i in 0..n {
        let (tile_y, tile_x) = (i / cols * h, i % cols * w);
        for y in 0..h {
            for x in 0..w {
                let v = pixels.get(i * c * h * w + y * w + x).copied().unwrap_or(0.0);
                raster[(tile_y + y) * width + tile_x + x] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }
    out.extend(raster);
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{MlpGanConfig, MlpGenerator, MlpDiscriminator};
    use crate::ml::test_support::float_params;
    use crate::ml::trainer::{fake_branch_loss, generator_loss};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams};

    type TestBackend = Autodiff<NdArray>;

    fn networks() -> (MlpGenerator<TestBackend>, MlpDiscriminator<TestBackend>) {
        let device = Default::default();
        let config = MlpGanConfig::new().with_noise_dim(8).with_hidden(16);
        (config.init_generator(&device), config.init_discriminator(&device))
    }

    fn noise() -> Tensor<TestBackend, 2> {
        Tensor::<TestBackend, 2>::ones([4, 8], &Default::default())
    }

    /// One deterministic generator update; gives Adam non-trivial moments.
    fn step<O: Optimizer<MlpGenerator<TestBackend>, TestBackend>>(
        generator:     MlpGenerator<TestBackend>,
        discriminator: &MlpDiscriminator<TestBackend>,
        optim:         &mut O,
    ) -> MlpGenerator<TestBackend> {
        let loss  = generator_loss(discriminator, generator.forward(noise()), 1.0);
        let grads = GradientsParams::from_grads::<TestBackend, _>(loss.backward(), &generator);
        optim.step(2e-4, generator, grads)
    }

    /// The matching discriminator update on the generator's fakes.
    fn disc_step<O: Optimizer<MlpDiscriminator<TestBackend>, TestBackend>>(
        generator:     &MlpGenerator<TestBackend>,
        discriminator: MlpDiscriminator<TestBackend>,
        optim:         &mut O,
    ) -> MlpDiscriminator<TestBackend> {
        let loss  = fake_branch_loss(&discriminator, generator.forward(noise()), 0.0);
        let grads = GradientsParams::from_grads::<TestBackend, _>(loss.backward(), &discriminator);
        optim.step(2e-4, discriminator, grads)
    }

    #[test]
    fn test_round_trip_restores_weights_and_optimiser_state() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let adam = AdamConfig::new().with_beta_1(0.5).with_beta_2(0.5);

        let (generator, discriminator) = networks();
        let mut gen_optim  = adam.init::<TestBackend, MlpGenerator<TestBackend>>();
        let mut disc_optim = adam.init::<TestBackend, MlpDiscriminator<TestBackend>>();
        let discriminator = disc_step(&generator, discriminator, &mut disc_optim);
        let generator     = step(generator, &discriminator, &mut gen_optim);

        checkpoints.save::<TestBackend, _, _, _, _>(&generator, &gen_optim, &discriminator, &disc_optim, 1).unwrap();

        let (fresh_gen, fresh_disc) = networks();
        let (restored_gen, mut restored_gen_optim, restored_disc, mut restored_disc_optim) = checkpoints
            .load::<TestBackend, _, _, _, _>(
                fresh_gen,
                adam.init::<TestBackend, MlpGenerator<TestBackend>>(),
                fresh_disc,
                adam.init::<TestBackend, MlpDiscriminator<TestBackend>>(),
                &Default::default(),
            )
            .unwrap();

        assert_eq!(float_params(&restored_gen), float_params(&generator));
        assert_eq!(float_params(&restored_disc), float_params(&discriminator));

        // Same moments ⇒ the next update of each network is identical
        let next_disc          = disc_step(&generator, discriminator.clone(), &mut disc_optim);
        let next_restored_disc = disc_step(&restored_gen, restored_disc.clone(), &mut restored_disc_optim);
        assert_eq!(float_params(&next_disc), float_params(&next_restored_disc));

        let next_gen          = step(generator, &discriminator, &mut gen_optim);
        let next_restored_gen = step(restored_gen, &restored_disc, &mut restored_gen_optim);
        assert_eq!(float_params(&next_gen), float_params(&next_restored_gen));

        assert_eq!(checkpoints.manifest().unwrap().counter, 1);
        assert!(!dir.path().join(STAGING).exists());
    }

    #[test]
    fn test_missing_artifacts_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let adam = AdamConfig::new();
        let (generator, discriminator) = networks();

        let err = checkpoints
            .load::<TestBackend, _, _, _, _>(
                generator,
                adam.init::<TestBackend, MlpGenerator<TestBackend>>(),
                discriminator,
                adam.init::<TestBackend, MlpDiscriminator<TestBackend>>(),
                &Default::default(),
            )
            .err()
            .unwrap();
        match err {
            GanError::Io { artifact, .. } => assert!(artifact.contains("generator.mpk")),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_open_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(CheckpointManager::open(&missing), Err(GanError::Io { .. })));
        assert!(CheckpointManager::open(dir.path()).is_ok());
    }

    #[test]
    fn test_failed_cycle_leaves_previous_cycle_intact() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let adam = AdamConfig::new();
        let (generator, discriminator) = networks();
        let gen_optim  = adam.init::<TestBackend, MlpGenerator<TestBackend>>();
        let disc_optim = adam.init::<TestBackend, MlpDiscriminator<TestBackend>>();

        checkpoints.save::<TestBackend, _, _, _, _>(&generator, &gen_optim, &discriminator, &disc_optim, 1).unwrap();
        let before = fs::read(checkpoints.artifact_path(GENERATOR)).unwrap();

        // A plain file where the staging directory should go
        fs::write(dir.path().join(STAGING), b"blocked").unwrap();
        let err = checkpoints.save::<TestBackend, _, _, _, _>(&generator, &gen_optim, &discriminator, &disc_optim, 2);
        assert!(matches!(err, Err(GanError::Io { .. })));

        assert_eq!(checkpoints.manifest().unwrap().counter, 1);
        assert_eq!(fs::read(checkpoints.artifact_path(GENERATOR)).unwrap(), before);
    }

    #[test]
    fn test_sample_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let (generator, _) = networks();

        let record = checkpoints
            .sample_and_save::<TestBackend, _>(&generator, 3, 8, &Default::default(), 4)
            .unwrap();
        assert_eq!(record.shape, vec![3, 1, 28, 28]);
        assert_eq!(record.noise.len(), 3 * 8);
        assert!(record.pixels.iter().all(|p| (0.0..=1.0).contains(p)));

        let loaded = checkpoints.load_sample(4).unwrap();
        assert_eq!(loaded.pixels, record.pixels);
        assert!(checkpoints.sample_path(4, "pgm").exists());
    }

    #[test]
    fn test_grid_pgm_layout() {
        // Three 2×2 images → 2 columns × 2 rows
        let pixels = vec![1.0; 3 * 4];
        let pgm = grid_pgm(&pixels, &[3, 1, 2, 2]);
        let header = b"P5\n4 4\n255\n";
        assert_eq!(&pgm[..header.len()], header);
        let raster = &pgm[header.len()..];
        assert_eq!(raster.len(), 16);
        // Bottom-right tile is empty
        assert_eq!(raster[2 * 4 + 2], 0);
        assert_eq!(raster[0], 255);
    }
}
