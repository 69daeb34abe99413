// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks an ImageSource for digits and
// never learns whether they came from IDX files on disk or
// from the synthetic generator used in tests and smoke runs.
//
// Implementations:
//   - MnistLoader     → reads the four MNIST IDX files
//   - SyntheticSource → deterministic pseudo-digits

use crate::domain::error::GanResult;
use crate::domain::image::{ImageItem, Split};

pub trait ImageSource {
    /// Load every example of one split.
    fn load(&self, split: Split) -> GanResult<Vec<ImageItem>>;
}
