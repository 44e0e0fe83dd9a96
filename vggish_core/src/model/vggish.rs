//! The VGGish network (VGG configuration "A" cut down for 96x64 log-mel input).

use burn::{
    config::Config,
    module::Module,
    nn::{
        Linear, LinearConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    tensor::{Tensor, activation::relu, backend::Backend},
};

use crate::params;

#[derive(Config, Debug)]
pub struct VggishConfig {
    /// Width of the two fc1 layers.
    #[config(default = 4096)]
    pub hidden_size: usize,
    #[config(default = 128)]
    pub embedding_size: usize,
    /// Apply ReLU to the embedding layer. Early releases of the checkpoint
    /// were trained with it; the current one is not.
    #[config(default = false)]
    pub embedding_relu: bool,
}

#[derive(Module, Debug)]
pub struct Vggish<B: Backend> {
    pub(crate) conv1: Conv2d<B>,
    pub(crate) conv2: Conv2d<B>,
    pub(crate) conv3_1: Conv2d<B>,
    pub(crate) conv3_2: Conv2d<B>,
    pub(crate) conv4_1: Conv2d<B>,
    pub(crate) conv4_2: Conv2d<B>,
    pool: MaxPool2d,
    pub(crate) fc1_1: Linear<B>,
    pub(crate) fc1_2: Linear<B>,
    pub(crate) fc2: Linear<B>,
    embedding_relu: bool,
}

/// Spatial size after the four 2x2 pools: 96x64 -> 6x4, 512 channels.
const FLATTENED: usize = 6 * 4 * 512;

impl VggishConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vggish<B> {
        let conv = |c_in: usize, c_out: usize| {
            Conv2dConfig::new([c_in, c_out], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };

        Vggish {
            conv1: conv(1, 64),
            conv2: conv(64, 128),
            conv3_1: conv(128, 256),
            conv3_2: conv(256, 256),
            conv4_1: conv(256, 512),
            conv4_2: conv(512, 512),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1_1: LinearConfig::new(FLATTENED, self.hidden_size).init(device),
            fc1_2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.embedding_size).init(device),
            embedding_relu: self.embedding_relu,
        }
    }
}

impl<B: Backend> Vggish<B> {
    /// `[batch, 96, 64]` log-mel examples to `[batch, embedding_size]`.
    pub fn forward(&self, examples: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, frames, bands] = examples.dims();
        debug_assert_eq!(frames, params::example_window_frames());
        debug_assert_eq!(bands, params::NUM_MEL_BINS);

        let x = examples.reshape([batch, 1, frames, bands]);

        let x = self.pool.forward(relu(self.conv1.forward(x)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = relu(self.conv3_1.forward(x));
        let x = self.pool.forward(relu(self.conv3_2.forward(x)));
        let x = relu(self.conv4_1.forward(x));
        let x = self.pool.forward(relu(self.conv4_2.forward(x)));

        // Flatten channels-last so fc1 lines up with the NHWC checkpoint.
        let [batch, channels, height, width] = x.dims();
        let x = x
            .permute([0, 2, 3, 1])
            .reshape([batch, height * width * channels]);

        let x = relu(self.fc1_1.forward(x));
        let x = relu(self.fc1_2.forward(x));
        let x = self.fc2.forward(x);
        if self.embedding_relu { relu(x) } else { x }
    }
}
