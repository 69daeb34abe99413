// ============================================================
// Layer 5 — Fault Injector
// ============================================================
// Applies one simulated memory fault to a live model:
//
//   1. pick one weight tensor uniformly from the ids supplied
//      by the caller (biases are filtered out before this)
//   2. view its storage as bytes (f32, native endian)
//   3. choose a row-aligned window (domain::fault)
//   4. XOR bytes of that window with the pattern byte, each
//      with the configured probability
//   5. write the bytes back into the same parameter
//
// The mutation is permanent. Only run this against a model
// that is evaluated and then dropped, never one that will be
// trained further or checkpointed.

use std::mem::size_of;

use burn::{
    module::{ModuleMapper, ParamId},
    prelude::*,
    tensor::TensorData,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::{GanError, GanResult};
use crate::domain::fault::{flip_row, CorruptionTarget};

/// What a single injection did.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptionReport {
    pub param:   ParamId,
    pub target:  CorruptionTarget,
    pub flipped: usize,
}

pub struct FaultInjector {
    flip_probability: f64,
    pattern_byte:     u8,
    rng:              StdRng,
}

impl FaultInjector {
    pub fn new(flip_probability: f64, pattern_byte: u8, seed: u64) -> GanResult<Self> {
        if !(0.0..=1.0).contains(&flip_probability) {
            return Err(GanError::config(format!(
                "flip probability must lie in [0, 1], got {flip_probability}"
            )));
        }
        Ok(Self {
            flip_probability,
            pattern_byte,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Corrupt one row of one randomly chosen weight tensor of `module`.
    pub fn corrupt_random_weight<B: Backend, M: Module<B>>(
        &mut self,
        module:     M,
        weight_ids: &[ParamId],
    ) -> GanResult<(M, CorruptionReport)> {
        let target = weight_ids
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| GanError::config("no weight tensors to corrupt"))?;

        let mut mapper = RowCorruptor {
            target,
            flip_probability: self.flip_probability,
            pattern_byte:     self.pattern_byte,
            rng:              &mut self.rng,
            outcome:          None,
        };
        let module = module.map(&mut mapper);

        let report = mapper
            .outcome
            .ok_or_else(|| GanError::config("selected weight tensor is not part of the model"))??;

        tracing::debug!(
            "Corrupted {} bytes at offset {} (row of {} bytes)",
            report.flipped, report.target.offset, report.target.len
        );
        Ok((module, report))
    }
}

struct RowCorruptor<'a> {
    target:           ParamId,
    flip_probability: f64,
    pattern_byte:     u8,
    rng:              &'a mut StdRng,
    outcome:          Option<GanResult<CorruptionReport>>,
}

impl RowCorruptor<'_> {
    fn corrupt<B: Backend, const D: usize>(
        &mut self,
        id:     ParamId,
        tensor: Tensor<B, D>,
    ) -> GanResult<(Tensor<B, D>, CorruptionReport)> {
        let device = tensor.device();
        let dims   = tensor.dims();

        let values = tensor
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| GanError::config(format!("cannot read weight tensor: {e:?}")))?;

        let mut bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();

        let target  = CorruptionTarget::random(&dims, size_of::<f32>(), self.rng)?;
        let flipped = flip_row(&mut bytes, target, self.flip_probability, self.pattern_byte, self.rng)?;

        let values: Vec<f32> = bytes
            .chunks_exact(size_of::<f32>())
            .map(|word| f32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
            .collect();

        let tensor = Tensor::<B, D>::from_data(TensorData::new(values, dims), &device);
        Ok((tensor, CorruptionReport { param: id, target, flipped }))
    }
}

impl<B: Backend> ModuleMapper<B> for RowCorruptor<'_> {
    fn map_float<const D: usize>(&mut self, id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        if id != self.target || self.outcome.is_some() {
            return tensor;
        }

        // Keep the original tensor around in case the window is rejected
        match self.corrupt(id.clone(), tensor.clone()) {
            Ok((corrupted, report)) => {
                self.outcome = Some(Ok(report));
                corrupted
            }
            Err(e) => {
                self.outcome = Some(Err(e));
                tensor
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::classifier::{ClassifierNet, ClassifierNetConfig};
    use crate::ml::test_support::float_params;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model() -> ClassifierNet<TestBackend> {
        ClassifierNetConfig::new().init::<TestBackend>(&Default::default())
    }

    #[test]
    fn test_zero_probability_is_bit_identical() {
        let net    = model();
        let ids    = net.weight_param_ids();
        let before = float_params(&net);

        let mut injector = FaultInjector::new(0.0, 0xFF, 11).unwrap();
        let (net, report) = injector.corrupt_random_weight::<TestBackend, _>(net, &ids).unwrap();

        assert_eq!(report.flipped, 0);
        let after = float_params(&net);
        for ((_, _, a), (_, _, b)) in before.iter().zip(&after) {
            let a_bits: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
            let b_bits: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
            assert_eq!(a_bits, b_bits);
        }
    }

    #[test]
    fn test_full_probability_flips_exactly_one_weight_row() {
        let net    = model();
        let ids    = net.weight_param_ids();
        let before = float_params(&net);

        let mut injector = FaultInjector::new(1.0, 0x0F, 5).unwrap();
        let (net, report) = injector.corrupt_random_weight::<TestBackend, _>(net, &ids).unwrap();
        let after = float_params(&net);

        assert!(ids.contains(&report.param));
        assert_eq!(report.flipped, report.target.len);

        for ((id, dims, a), (_, _, b)) in before.iter().zip(&after) {
            let a_bytes: Vec<u8> = a.iter().flat_map(|v| v.to_ne_bytes()).collect();
            let b_bytes: Vec<u8> = b.iter().flat_map(|v| v.to_ne_bytes()).collect();
            if *id == report.param {
                assert_eq!(report.target.len, 4 * dims[1]);
                for (i, (x, y)) in a_bytes.iter().zip(&b_bytes).enumerate() {
                    let inside = (report.target.offset..report.target.end()).contains(&i);
                    assert_eq!(x ^ y, if inside { 0x0F } else { 0 });
                }
            } else {
                assert_eq!(a_bytes, b_bytes, "untargeted tensor changed");
            }
        }
    }

    #[test]
    fn test_empty_weight_list_is_rejected() {
        let mut injector = FaultInjector::new(0.5, 0xFF, 1).unwrap();
        assert!(injector.corrupt_random_weight::<TestBackend, _>(model(), &[]).is_err());
    }

    #[test]
    fn test_probability_out_of_range_is_rejected() {
        assert!(FaultInjector::new(-0.1, 0xFF, 1).is_err());
        assert!(FaultInjector::new(1.1, 0xFF, 1).is_err());
    }
}
