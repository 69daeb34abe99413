// ============================================================
// Layer 3 — Image Domain Types
// ============================================================
// A single greyscale digit and the split it was read from.
// Pixels stay as raw 0..=255 bytes here; scaling into the
// range a network expects happens in the batcher (Layer 4).

use serde::{Deserialize, Serialize};

/// Side length of an MNIST digit in pixels.
pub const IMAGE_SIDE: usize = 28;

/// Number of pixels in one digit.
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageItem {
    /// Row-major pixels, `IMAGE_PIXELS` long
    pub pixels: Vec<u8>,

    /// Digit class 0..=9
    pub label: u8,
}

impl ImageItem {
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        Self { pixels, label }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}
