// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only structs, enums, traits and pure arithmetic
//
// The fault arithmetic lives here rather than next to the
// model code so its bounds rules are testable on bare byte
// buffers.

// Error taxonomy used by every core component
pub mod error;

// Monotonic checkpoint-cycle counter
pub mod counter;

// A single digit image and the dataset split it came from
pub mod image;

// Row-aligned corruption windows and byte flipping
pub mod fault;

// Core abstractions (traits) that other layers implement
pub mod traits;
