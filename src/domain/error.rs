// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the core can produce is one of four kinds.
// All of them are fatal to the current run: the application
// layer wraps them in anyhow context and main() exits nonzero.
//
//   Configuration — bad flags or an unusable dataset directory,
//                   raised before any training starts
//   Io            — a checkpoint artifact could not be read
//                   or written
//   Shape         — a batch or noise tensor does not match
//                   what the model expects
//   Bounds        — a corruption window would leave the
//                   tensor's backing buffer

use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GanError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("artifact '{artifact}' failed: {reason}")]
    Io { artifact: String, reason: String },

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    Shape {
        context:  &'static str,
        expected: Vec<usize>,
        actual:   Vec<usize>,
    },

    #[error("window at byte {offset} of length {len} exceeds tensor of {total} bytes")]
    Bounds { offset: usize, len: usize, total: usize },
}

impl GanError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Build an `Io` error naming the artifact (usually a path) that failed.
    pub fn io(artifact: impl Display, reason: impl Display) -> Self {
        Self::Io {
            artifact: artifact.to_string(),
            reason:   reason.to_string(),
        }
    }
}

pub type GanResult<T> = Result<T, GanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_artifact() {
        let err = GanError::io("ckpt/generator.mpk", "missing");
        assert!(err.to_string().contains("ckpt/generator.mpk"));
        assert!(matches!(err, GanError::Io { .. }));
    }
}
