use burn::data::dataset::Dataset;

use crate::data::loader::synthesize_digits;
use crate::domain::image::ImageItem;

/// In-memory digit collection served to burn's DataLoader.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    items: Vec<ImageItem>,
}

impl ImageDataset {
    pub fn new(items: Vec<ImageItem>) -> Self { Self { items } }

    pub fn synthetic(count: usize, seed: u64) -> Self {
        Self::new(synthesize_digits(count, seed))
    }

    pub fn sample_count(&self) -> usize { self.items.len() }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
