// ============================================================
// Layer 5 — Feed-Forward Classifier
// ============================================================
// The subject of the fault-injection experiments:
//
//   784 → 64 → 32 → 10   (ReLU between layers)
//
// forward() returns raw logits; training applies cross-entropy
// (log-softmax + negative log-likelihood) on top of them and
// evaluation takes the argmax.

use burn::{
    module::ParamId,
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::image::{IMAGE_PIXELS, NUM_CLASSES};

#[derive(Config, Debug)]
pub struct ClassifierNetConfig {
    #[config(default = 64)]
    pub hidden1: usize,
    #[config(default = 32)]
    pub hidden2: usize,
}

impl ClassifierNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierNet<B> {
        ClassifierNet {
            fc1: LinearConfig::new(IMAGE_PIXELS, self.hidden1).init(device),
            fc2: LinearConfig::new(self.hidden1, self.hidden2).init(device),
            fc3: LinearConfig::new(self.hidden2, NUM_CLASSES).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ClassifierNet<B: Backend> {
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,
}

impl<B: Backend> ClassifierNet<B> {
    /// images: [batch, 1, 28, 28] → logits: [batch, 10]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch_size = images.dims()[0];
        let x = images.reshape([batch_size, IMAGE_PIXELS]);
        let x = relu(self.fc1.forward(x));
        let x = relu(self.fc2.forward(x));
        self.fc3.forward(x)
    }

    pub fn forward_loss(&self, images: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let logits = self.forward(images);
        CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, labels)
    }

    /// Predicted class per example — shape [batch].
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 1, Int> {
        self.forward(images).argmax(1).flatten::<1>(0, 1)
    }

    /// Ids of the weight matrices only; biases are never corruption targets.
    pub fn weight_param_ids(&self) -> Vec<ParamId> {
        vec![
            self.fc1.weight.id.clone(),
            self.fc2.weight.id.clone(),
            self.fc3.weight.id.clone(),
        ]
    }
}
