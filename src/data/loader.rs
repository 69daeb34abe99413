// ============================================================
// Layer 4 — MNIST Loader
// ============================================================
// Reads the MNIST digits from the four IDX files in a data
// directory, or synthesises look-alike digits when no
// dataset is available.
//
// IDX layout (all integers big-endian):
//
//   magic   u32   0x00000803 for images, 0x00000801 for labels
//                 (low byte = number of dimensions)
//   dims    u32 × ndims
//   payload u8  × product(dims)
//
// Unlike a best-effort corpus walk, a missing or malformed
// file here is fatal: a GAN trained on an empty or
// misaligned dataset is worse than no run at all.

use std::{fs, path::{Path, PathBuf}};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::error::{GanError, GanResult};
use crate::domain::image::{ImageItem, Split, IMAGE_PIXELS, IMAGE_SIDE, NUM_CLASSES};
use crate::domain::traits::ImageSource;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Loads MNIST from `train-*` / `t10k-*` IDX files in a directory.
pub struct MnistLoader {
    dir: PathBuf,
}

impl MnistLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_names(split: Split) -> (&'static str, &'static str) {
        match split {
            Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            Split::Test  => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }
}

impl ImageSource for MnistLoader {
    fn load(&self, split: Split) -> GanResult<Vec<ImageItem>> {
        if !self.dir.is_dir() {
            return Err(GanError::config(format!(
                "dataset directory '{}' does not exist",
                self.dir.display()
            )));
        }

        let (images_name, labels_name) = Self::file_names(split);
        let images_path = self.dir.join(images_name);
        let labels_path = self.dir.join(labels_name);

        let (image_dims, pixels) = read_idx(&images_path, IMAGES_MAGIC)?;
        let (label_dims, labels) = read_idx(&labels_path, LABELS_MAGIC)?;

        if image_dims[1] != IMAGE_SIDE || image_dims[2] != IMAGE_SIDE {
            return Err(GanError::config(format!(
                "'{}' holds {}x{} images, expected {IMAGE_SIDE}x{IMAGE_SIDE}",
                images_path.display(), image_dims[1], image_dims[2]
            )));
        }
        if image_dims[0] != label_dims[0] {
            return Err(GanError::config(format!(
                "'{}' has {} images but '{}' has {} labels",
                images_path.display(), image_dims[0],
                labels_path.display(), label_dims[0]
            )));
        }

        let items: Vec<ImageItem> = pixels
            .chunks_exact(IMAGE_PIXELS)
            .zip(labels)
            .map(|(px, label)| ImageItem::new(px.to_vec(), label))
            .collect();

        tracing::info!(
            "Loaded {} {:?} digits from '{}'",
            items.len(), split, self.dir.display()
        );
        Ok(items)
    }
}

/// Parse one IDX file, returning its dimensions and raw payload.
fn read_idx(path: &Path, magic: u32) -> GanResult<(Vec<usize>, Vec<u8>)> {
    let bytes = fs::read(path).map_err(|e| {
        GanError::config(format!("cannot read '{}': {e}", path.display()))
    })?;

    let malformed = |what: &str| GanError::config(format!("'{}' is not a valid IDX file: {what}", path.display()));

    let found = read_be_u32(&bytes, 0).ok_or_else(|| malformed("truncated header"))?;
    if found != magic {
        return Err(malformed(&format!("magic {found:#010x}, expected {magic:#010x}")));
    }

    let ndims = (magic & 0xFF) as usize;
    let dims: Vec<usize> = (0..ndims)
        .map(|i| read_be_u32(&bytes, 4 + 4 * i).map(|d| d as usize))
        .collect::<Option<_>>()
        .ok_or_else(|| malformed("truncated dimensions"))?;

    let header   = 4 + 4 * ndims;
    let expected = dims.iter().product::<usize>();
    let payload  = &bytes[header..];
    if payload.len() != expected {
        return Err(malformed(&format!(
            "payload is {} bytes, dimensions {:?} need {}",
            payload.len(), dims, expected
        )));
    }

    Ok((dims, payload.to_vec()))
}

fn read_be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let word: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(word))
}

// ─── Synthetic Digits ─────────────────────────────────────────────────────────
// Deterministic stand-ins for MNIST: low-level noise with one
// bright vertical bar whose column depends on the label, so a
// classifier has something learnable to latch onto.

/// Serves synthetic digits for both splits.
pub struct SyntheticSource {
    examples: usize,
    seed:     u64,
}

impl SyntheticSource {
    pub fn new(examples: usize, seed: u64) -> Self {
        Self { examples, seed }
    }
}

impl ImageSource for SyntheticSource {
    fn load(&self, split: Split) -> GanResult<Vec<ImageItem>> {
        // Distinct streams so train and test digits differ
        let seed = match split {
            Split::Train => self.seed,
            Split::Test  => self.seed.wrapping_add(1),
        };
        Ok(synthesize_digits(self.examples, seed))
    }
}

pub fn synthesize_digits(count: usize, seed: u64) -> Vec<ImageItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let label   = (i % NUM_CLASSES) as u8;
            let bar_col = 4 + 2 * label as usize;
            let pixels  = (0..IMAGE_PIXELS)
                .map(|p| {
                    let col = p % IMAGE_SIDE;
                    if (bar_col..bar_col + 3).contains(&col) {
                        rng.gen_range(200..=255)
                    } else {
                        rng.gen_range(0..48)
                    }
                })
                .collect();
            ImageItem::new(pixels, label)
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn write_idx(path: &Path, magic: u32, dims: &[u32], payload: &[u8]) {
        let mut bytes = magic.to_be_bytes().to_vec();
        for d in dims {
            bytes.extend_from_slice(&d.to_be_bytes());
        }
        bytes.extend_from_slice(payload);
        fs::write(path, bytes).unwrap();
    }

    fn write_split(dir: &Path, count: usize) {
        let pixels: Vec<u8> = (0..count * IMAGE_PIXELS).map(|i| (i % 251) as u8).collect();
        let labels: Vec<u8> = (0..count).map(|i| (i % 10) as u8).collect();
        let side = IMAGE_SIDE as u32;
        write_idx(&dir.join("train-images-idx3-ubyte"), IMAGES_MAGIC, &[count as u32, side, side], &pixels);
        write_idx(&dir.join("train-labels-idx1-ubyte"), LABELS_MAGIC, &[count as u32], &labels);
    }

    #[test]
    fn test_loads_valid_idx_pair() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), 3);

        let items = MnistLoader::new(dir.path()).load(Split::Train).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].label, 2);
        assert_eq!(items[1].pixels.len(), IMAGE_PIXELS);
        assert_eq!(items[1].pixels[0], (IMAGE_PIXELS % 251) as u8);
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let err = MnistLoader::new("/definitely/not/here").load(Split::Train).unwrap_err();
        assert!(matches!(err, GanError::Configuration { .. }));
    }

    #[test]
    fn test_missing_test_split_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), 2);
        let err = MnistLoader::new(dir.path()).load(Split::Test).unwrap_err();
        assert!(err.to_string().contains("t10k-images-idx3-ubyte"));
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), 2);
        write_idx(&dir.path().join("train-labels-idx1-ubyte"), IMAGES_MAGIC, &[2, 1, 1], &[0, 1]);
        let err = MnistLoader::new(dir.path()).load(Split::Train).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), 2);
        write_idx(&dir.path().join("train-labels-idx1-ubyte"), LABELS_MAGIC, &[3], &[0, 1, 2]);
        let err = MnistLoader::new(dir.path()).load(Split::Train).unwrap_err();
        assert!(matches!(err, GanError::Configuration { .. }));
    }

    #[test]
    fn test_synthetic_digits_are_deterministic() {
        let a = synthesize_digits(20, 7);
        let b = synthesize_digits(20, 7);
        assert_eq!(a.len(), 20);
        assert!(a.iter().zip(&b).all(|(x, y)| x.pixels == y.pixels && x.label == y.label));
    }

    #[test]
    fn test_synthetic_splits_differ() {
        let source = SyntheticSource::new(5, 1);
        let train  = source.load(Split::Train).unwrap();
        let test   = source.load(Split::Test).unwrap();
        assert_ne!(train[0].pixels, test[0].pixels);
    }
}
