// ============================================================
// Layer 3 — Row-Aligned Fault Arithmetic
// ============================================================
// The byte-level half of the fault-injection harness. It
// knows only shapes, element sizes and byte buffers, so
// every bounds rule can be tested without a model.
//
// A corruption window is one "row": the bytes of one slice
// along a weight tensor's second dimension.
//
//   row_bytes   = element_size * dims[1]
//   total_bytes = element_size * product(dims)
//
// A raw offset in [0, total_bytes) is rounded UP to the next
// multiple of row_bytes. If that would run past the end of
// the buffer the window falls back to offset row_bytes (the
// second row), or to 0 when the tensor has a single row.
// offset + row_bytes <= total_bytes therefore holds for every
// accepted shape by construction.

use rand::Rng;

use crate::domain::error::{GanError, GanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorruptionTarget {
    pub offset: usize,
    pub len:    usize,
}

impl CorruptionTarget {
    /// Row-aligned window derived from `raw_offset`.
    pub fn aligned(dims: &[usize], elem_size: usize, raw_offset: usize) -> GanResult<Self> {
        if dims.len() < 2 {
            return Err(GanError::Shape {
                context:  "fault target",
                expected: vec![0, 0],
                actual:   dims.to_vec(),
            });
        }

        let total = total_bytes(dims, elem_size);
        let row   = elem_size * dims[1];

        if row == 0 || row > total {
            return Err(GanError::Bounds { offset: 0, len: row, total });
        }
        if raw_offset >= total {
            return Err(GanError::Bounds { offset: raw_offset, len: row, total });
        }

        let mut offset = raw_offset.div_ceil(row) * row;
        if offset + row > total {
            offset = if 2 * row <= total { row } else { 0 };
        }

        Ok(Self { offset, len: row })
    }

    /// Uniformly draw a raw offset and align it.
    pub fn random<R: Rng + ?Sized>(dims: &[usize], elem_size: usize, rng: &mut R) -> GanResult<Self> {
        let total = total_bytes(dims, elem_size);
        if total == 0 {
            return Err(GanError::Bounds { offset: 0, len: 0, total });
        }
        let raw = rng.gen_range(0..total);
        Self::aligned(dims, elem_size, raw)
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

pub fn total_bytes(dims: &[usize], elem_size: usize) -> usize {
    dims.iter().product::<usize>() * elem_size
}

/// XOR each byte of the window with `pattern`, independently with
/// probability `flip_probability`. Returns how many bytes were flipped.
pub fn flip_row<R: Rng + ?Sized>(
    bytes:            &mut [u8],
    target:           CorruptionTarget,
    flip_probability: f64,
    pattern:          u8,
    rng:              &mut R,
) -> GanResult<usize> {
    if !(0.0..=1.0).contains(&flip_probability) {
        return Err(GanError::config(format!(
            "flip probability must lie in [0, 1], got {flip_probability}"
        )));
    }

    let total  = bytes.len();
    let window = bytes
        .get_mut(target.offset..target.end())
        .ok_or(GanError::Bounds { offset: target.offset, len: target.len, total })?;

    let mut flipped = 0;
    for byte in window.iter_mut() {
        if rng.gen_bool(flip_probability) {
            *byte ^= pattern;
            flipped += 1;
        }
    }
    Ok(flipped)
}
