// ============================================================
// Layer 5 — Generator and Discriminator Networks
// ============================================================
// Two capability traits and the architectures behind them:
//
//   DCGAN — transposed / strided convolutions with batch norm
//   MLP   — one hidden linear layer each, for quick CPU runs
//
// The noise width a generator accepts is read from its first
// layer's weights, so a generator restored from disk reports
// the width it was trained with.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{leaky_relu, relu, sigmoid, tanh},
};

use crate::domain::image::{IMAGE_PIXELS, IMAGE_SIDE};

const LEAKY_SLOPE: f64 = 0.2;

// ─── Capabilities ─────────────────────────────────────────────────────────────
// The trainer only ever needs these two capabilities plus burn's
// Module/AutodiffModule; concrete architectures are variants behind them.

/// Maps a noise batch [N, Z] to images [N, 1, 28, 28] in [-1, 1].
pub trait ImageGenerator<B: Backend>: Module<B> {
    fn noise_dim(&self) -> usize;
    fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4>;
}

/// Maps images [N, C, H, W] to the probability [N] that each one is real.
pub trait ImageDiscriminator<B: Backend>: Module<B> {
    /// Expected [C, H, W] of one input image.
    fn image_shape(&self) -> [usize; 3];
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1>;
}

/// Mean binary cross-entropy of probabilities against (possibly soft) targets.
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
    const EPS: f32 = 1e-7;
    let probs = probs.clamp(EPS, 1.0 - EPS);
    let positive = targets.clone() * probs.clone().log();
    let negative = (targets.neg() + 1.0) * (probs.neg() + 1.0).log();
    (positive + negative).neg().mean()
}

// ─── DCGAN ────────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DcganConfig {
    #[config(default = 100)]
    pub noise_dim: usize,
}

impl DcganConfig {
    pub fn init_generator<B: Backend>(&self, device: &B::Device) -> DcganGenerator<B> {
        // 1×1 → 4×4 → 7×7 → 14×14 → 28×28
        let deconv = |[i, o]: [usize; 2], k: usize, stride: usize, pad: usize| {
            ConvTranspose2dConfig::new([i, o], [k, k])
                .with_stride([stride, stride])
                .with_padding([pad, pad])
                .with_bias(false)
                .init(device)
        };
        DcganGenerator {
            deconv1:   deconv([self.noise_dim, 256], 4, 1, 0),
            norm1:     BatchNormConfig::new(256).init(device),
            deconv2:   deconv([256, 128], 3, 2, 1),
            norm2:     BatchNormConfig::new(128).init(device),
            deconv3:   deconv([128, 64], 4, 2, 1),
            norm3:     BatchNormConfig::new(64).init(device),
            deconv4:   deconv([64, 1], 4, 2, 1),
        }
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> DcganDiscriminator<B> {
        // 28×28 → 14×14 → 7×7 → 3×3 → 1×1
        let conv = |[i, o]: [usize; 2], k: usize, stride: usize, pad: usize| {
            Conv2dConfig::new([i, o], [k, k])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(pad, pad))
                .with_bias(false)
                .init(device)
        };
        DcganDiscriminator {
            conv1: conv([1, 64], 4, 2, 1),
            conv2: conv([64, 128], 4, 2, 1),
            norm2: BatchNormConfig::new(128).init(device),
            conv3: conv([128, 256], 4, 2, 1),
            norm3: BatchNormConfig::new(256).init(device),
            conv4: conv([256, 1], 3, 1, 0),
        }
    }
}

#[derive(Module, Debug)]
pub struct DcganGenerator<B: Backend> {
    pub deconv1:   ConvTranspose2d<B>,
    pub norm1:     BatchNorm<B, 2>,
    pub deconv2:   ConvTranspose2d<B>,
    pub norm2:     BatchNorm<B, 2>,
    pub deconv3:   ConvTranspose2d<B>,
    pub norm3:     BatchNorm<B, 2>,
    pub deconv4:   ConvTranspose2d<B>,
}

impl<B: Backend> ImageGenerator<B> for DcganGenerator<B> {
    fn noise_dim(&self) -> usize {
        // [channels_in, channels_out, k, k]
        self.deconv1.weight.val().dims()[0]
    }

    fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch_size, noise_dim] = noise.dims();
        let x = noise.reshape([batch_size, noise_dim, 1, 1]);
        let x = relu(self.norm1.forward(self.deconv1.forward(x)));
        let x = relu(self.norm2.forward(self.deconv2.forward(x)));
        let x = relu(self.norm3.forward(self.deconv3.forward(x)));
        tanh(self.deconv4.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct DcganDiscriminator<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub norm2: BatchNorm<B, 2>,
    pub conv3: Conv2d<B>,
    pub norm3: BatchNorm<B, 2>,
    pub conv4: Conv2d<B>,
}

impl<B: Backend> ImageDiscriminator<B> for DcganDiscriminator<B> {
    fn image_shape(&self) -> [usize; 3] {
        [1, IMAGE_SIDE, IMAGE_SIDE]
    }

    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let batch_size = images.dims()[0];
        let x = leaky_relu(self.conv1.forward(images), LEAKY_SLOPE);
        let x = leaky_relu(self.norm2.forward(self.conv2.forward(x)), LEAKY_SLOPE);
        let x = leaky_relu(self.norm3.forward(self.conv3.forward(x)), LEAKY_SLOPE);
        sigmoid(self.conv4.forward(x)).reshape([batch_size])
    }
}

// ─── MLP ──────────────────────────────────────────────────────────────────────
// Small fully-connected pair; trains in seconds on CPU.
#[derive(Config, Debug)]
pub struct MlpGanConfig {
    #[config(default = 100)]
    pub noise_dim: usize,
    #[config(default = 256)]
    pub hidden: usize,
}

impl MlpGanConfig {
    pub fn init_generator<B: Backend>(&self, device: &B::Device) -> MlpGenerator<B> {
        MlpGenerator {
            hidden:    LinearConfig::new(self.noise_dim, self.hidden).init(device),
            output:    LinearConfig::new(self.hidden, IMAGE_PIXELS).init(device),
        }
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> MlpDiscriminator<B> {
        MlpDiscriminator {
            hidden: LinearConfig::new(IMAGE_PIXELS, self.hidden).init(device),
            output: LinearConfig::new(self.hidden, 1).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct MlpGenerator<B: Backend> {
    pub hidden:    Linear<B>,
    pub output:    Linear<B>,
}

impl<B: Backend> ImageGenerator<B> for MlpGenerator<B> {
    fn noise_dim(&self) -> usize {
        // [d_input, d_output]
        self.hidden.weight.val().dims()[0]
    }

    fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        let batch_size = noise.dims()[0];
        let x = leaky_relu(self.hidden.forward(noise), LEAKY_SLOPE);
        tanh(self.output.forward(x)).reshape([batch_size, 1, IMAGE_SIDE, IMAGE_SIDE])
    }
}

#[derive(Module, Debug)]
pub struct MlpDiscriminator<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

impl<B: Backend> ImageDiscriminator<B> for MlpDiscriminator<B> {
    fn image_shape(&self) -> [usize; 3] {
        [1, IMAGE_SIDE, IMAGE_SIDE]
    }

    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let batch_size = images.dims()[0];
        let x = images.reshape([batch_size, IMAGE_PIXELS]);
        let x = leaky_relu(self.hidden.forward(x), LEAKY_SLOPE);
        sigmoid(self.output.forward(x)).reshape([batch_size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_dcgan_shapes() {
        let device = Default::default();
        let config = DcganConfig::new().with_noise_dim(16);
        let generator     = config.init_generator::<TestBackend>(&device);
        let discriminator = config.init_discriminator::<TestBackend>(&device);
        assert_eq!(generator.noise_dim(), 16);

        let noise  = Tensor::<TestBackend, 2>::zeros([3, 16], &device);
        let images = generator.forward(noise);
        assert_eq!(images.dims(), [3, 1, IMAGE_SIDE, IMAGE_SIDE]);
        assert_eq!(discriminator.forward(images).dims(), [3]);
    }

    #[test]
    fn test_mlp_outputs_are_bounded() {
        let device = Default::default();
        let config = MlpGanConfig::new().with_hidden(32);
        let generator     = config.init_generator::<TestBackend>(&device);
        let discriminator = config.init_discriminator::<TestBackend>(&device);
        assert_eq!(generator.noise_dim(), 100);

        let noise  = Tensor::<TestBackend, 2>::ones([2, 100], &device);
        let images = generator.forward(noise);
        let pixels = images.clone().into_data().to_vec::<f32>().unwrap();
        assert!(pixels.iter().all(|p| (-1.0..=1.0).contains(p)));

        let probs = discriminator.forward(images).into_data().to_vec::<f32>().unwrap();
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_bce_matches_closed_form() {
        let device  = Default::default();
        let probs   = Tensor::<TestBackend, 1>::from_floats([0.9, 0.2], &device);
        let targets = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);
        let loss: f32 = binary_cross_entropy(probs, targets).into_scalar();
        let expected = -((0.9f32).ln() + (0.8f32).ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-5);
    }
}
