// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the trainers and the
// application layer:
//
//   checkpoint.rs — network, optimiser and sample artifacts
//                   written with Burn's full precision
//                   MessagePack recorder, plus the run config
//                   as JSON
//
//   metrics.rs    — progress points appended to a CSV file
//                   for plotting loss curves after a run
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §12 (I/O and File Handling)

/// Checkpoint cycles, samples and config persistence
pub mod checkpoint;

/// Training progress CSV logger
pub mod metrics;
