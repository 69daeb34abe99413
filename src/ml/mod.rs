// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network definitions and training loops live here.
//
//   model.rs              — generator / discriminator capabilities
//                           plus the DCGAN and MLP variants
//
//   trainer.rs            — the adversarial loop: alternating
//                           D / G updates, progress lines and
//                           synchronous checkpoint cycles
//
//   classifier.rs         — the 784→64→32→10 digit classifier
//
//   classifier_trainer.rs — supervised SGD loop for the classifier
//
//   fault.rs              — row-aligned byte corruption of a live
//                           weight tensor
//
//   inferencer.rs         — accuracy evaluation, optionally with
//                           one fault injected before each example
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Radford et al. (2016) DCGAN

/// Generator / discriminator architectures
pub mod model;

/// Adversarial training loop with checkpoint cycles
pub mod trainer;

/// Feed-forward digit classifier
pub mod classifier;

/// Supervised training loop for the classifier
pub mod classifier_trainer;

/// Bit-flip fault injection into model weights
pub mod fault;

/// Classifier evaluation, clean or under injected faults
pub mod inferencer;

#[cfg(test)]
pub(crate) mod test_support {
    use burn::{
        module::{ModuleVisitor, ParamId},
        prelude::*,
    };

    struct Collector(Vec<(ParamId, Vec<usize>, Vec<f32>)>);

    impl<B: Backend> ModuleVisitor<B> for Collector {
        fn visit_float<const D: usize>(&mut self, id: ParamId, tensor: &Tensor<B, D>) {
            let values = tensor.to_data().convert::<f32>().to_vec::<f32>().unwrap();
            self.0.push((id, tensor.dims().to_vec(), values));
        }
    }

    /// Every float parameter of `module` in visit order.
    pub fn float_params<B: Backend, M: Module<B>>(module: &M) -> Vec<(ParamId, Vec<usize>, Vec<f32>)> {
        let mut collector = Collector(Vec::new());
        module.visit(&mut collector);
        collector.0
    }
}
