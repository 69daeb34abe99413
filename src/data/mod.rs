// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the dataset on disk and tensor batches:
//
//   IDX files / synthetic generator
//       │
//       ▼
//   MnistLoader / SyntheticSource  → Vec<ImageItem>
//       │
//       ▼
//   ImageDataset                   → implements Burn's Dataset
//       │
//       ▼
//   ImageBatcher                   → stacks items into tensors
//       │
//       ▼
//   ImagePipeline                  → one FIFO pass per epoch

/// Reads MNIST IDX files, or synthesises digits
pub mod loader;

/// Implements Burn's Dataset trait for digit images
pub mod dataset;

/// Implements Burn's Batcher trait and wraps the DataLoader
pub mod batcher;
