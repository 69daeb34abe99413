// ============================================================
// Layer 4 — Image Batcher and Pipeline
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageItem>
// into one image tensor plus one label tensor, and wraps
// Burn's DataLoader into the restartable per-epoch batch
// sequence the trainers consume.
//
// Shapes:
//   Input:  N ImageItems of 28×28 bytes
//   Output: images [N, 1, 28, 28] (float), labels [N] (int)
//
// N is the number of items actually handed to batch(): the
// final batch of an epoch is smaller when the dataset size is
// not a multiple of the batch size, and nothing downstream
// may assume the configured size.
//
// Ordering:
//   The loader runs with a single worker so batches arrive in
//   the order the (optionally shuffled) sampler produced them.
//   More workers would interleave partitions non-deterministically.

use std::sync::Arc;

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
    tensor::TensorData,
};
use serde::{Deserialize, Serialize};

use crate::data::dataset::ImageDataset;
use crate::domain::image::{ImageItem, IMAGE_SIDE};

/// How raw 0..=255 pixels are mapped before they reach a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelScale {
    /// [-1, 1], matching a tanh generator head
    Symmetric,
    /// [0, 1], for the classifier
    Unit,
}

impl PixelScale {
    pub fn apply(self, pixel: u8) -> f32 {
        let unit = pixel as f32 / 255.0;
        match self {
            PixelScale::Symmetric => (unit - 0.5) / 0.5,
            PixelScale::Unit      => unit,
        }
    }
}

// ─── ImageBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Pixels — shape: [batch, 1, 28, 28]
    pub images: Tensor<B, 4>,

    /// Digit classes — shape: [batch]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    /// Leading (batch) dimension of this particular batch.
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
    scale:  PixelScale,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, scale: PixelScale) -> Self {
        Self { device, scale }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().map(|&p| self.scale.apply(p)))
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|item| item.label as i32)
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 1, IMAGE_SIDE, IMAGE_SIDE]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, labels }
    }
}

// ─── ImagePipeline ────────────────────────────────────────────────────────────
/// A finite batch sequence that can be iterated once per epoch.
pub struct ImagePipeline<B: Backend> {
    loader:     Arc<dyn DataLoader<ImageBatch<B>>>,
    num_items:  usize,
    batch_size: usize,
}

impl<B: Backend> ImagePipeline<B> {
    pub fn new(
        dataset:      ImageDataset,
        batch_size:   usize,
        scale:        PixelScale,
        shuffle_seed: Option<u64>,
        device:       &B::Device,
    ) -> Self {
        let num_items = dataset.sample_count();
        let batcher   = ImageBatcher::<B>::new(device.clone(), scale);

        let mut builder = DataLoaderBuilder::new(batcher)
            .batch_size(batch_size)
            .num_workers(1);
        if let Some(seed) = shuffle_seed {
            builder = builder.shuffle(seed);
        }

        Self { loader: builder.build(dataset), num_items, batch_size }
    }

    /// One pass over the dataset, in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = ImageBatch<B>> + '_ {
        self.loader.iter()
    }

    pub fn batches_per_epoch(&self) -> usize {
        self.num_items.div_ceil(self.batch_size)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_pixel_scales() {
        assert_eq!(PixelScale::Symmetric.apply(0), -1.0);
        assert_eq!(PixelScale::Symmetric.apply(255), 1.0);
        assert_eq!(PixelScale::Unit.apply(255), 1.0);
        assert_eq!(PixelScale::Unit.apply(0), 0.0);
    }

    #[test]
    fn test_batch_shapes_follow_item_count() {
        let device  = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device, PixelScale::Unit);
        let items   = crate::data::loader::synthesize_digits(3, 0);
        let batch   = batcher.batch(items);
        assert_eq!(batch.images.dims(), [3, 1, IMAGE_SIDE, IMAGE_SIDE]);
        assert_eq!(batch.labels.dims(), [3]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_final_batch_is_smaller() {
        let device   = Default::default();
        let pipeline = ImagePipeline::<TestBackend>::new(
            ImageDataset::synthetic(70, 1), 32, PixelScale::Symmetric, None, &device,
        );
        let sizes: Vec<usize> = pipeline.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![32, 32, 6]);
        assert_eq!(pipeline.batches_per_epoch(), 3);
    }

    #[test]
    fn test_pipeline_restarts_each_epoch() {
        let device   = Default::default();
        let pipeline = ImagePipeline::<TestBackend>::new(
            ImageDataset::synthetic(40, 2), 16, PixelScale::Unit, Some(5), &device,
        );
        assert_eq!(pipeline.iter().count(), 3);
        assert_eq!(pipeline.iter().count(), 3);
    }

    #[test]
    fn test_unshuffled_pipeline_preserves_order() {
        let device   = Default::default();
        let pipeline = ImagePipeline::<TestBackend>::new(
            ImageDataset::synthetic(30, 3), 10, PixelScale::Unit, None, &device,
        );
        let labels: Vec<i64> = pipeline
            .iter()
            .flat_map(|b| b.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap())
            .collect();
        let expected: Vec<i64> = (0..30).map(|i| (i % 10) as i64).collect();
        assert_eq!(labels, expected);
    }
}
