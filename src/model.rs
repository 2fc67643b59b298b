// src/model.rs

use candle_core::{Result, Tensor, D};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, Module, VarBuilder};

/// Binary road-quality classifier.
///
/// Four stride-2 conv stages feed a global-average-pool head with a single
/// output logit. The last conv output doubles as the Grad-CAM target layer,
/// which is why the feature extractor and the head are separately callable.
pub struct QualityNet {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    conv4: Conv2d,
    fc: Linear,
}

impl QualityNet {
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };

        let conv1 = conv2d(3, 32, 3, cfg, vb.pp("conv1"))?;
        let conv2 = conv2d(32, 64, 3, cfg, vb.pp("conv2"))?;
        let conv3 = conv2d(64, 128, 3, cfg, vb.pp("conv3"))?;
        let conv4 = conv2d(128, 256, 3, cfg, vb.pp("conv4"))?;
        let fc = linear(256, 1, vb.pp("fc"))?;

        Ok(Self {
            conv1,
            conv2,
            conv3,
            conv4,
            fc,
        })
    }

    /// Forward up to and including the target layer: [N, 256, H/16, W/16].
    pub fn features(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.conv1.forward(x)?.relu()?;
        let x = self.conv2.forward(&x)?.relu()?;
        let x = self.conv3.forward(&x)?.relu()?;
        self.conv4.forward(&x)?.relu()
    }

    /// Global average pool over the spatial dims, then the logit: [N, 1].
    pub fn head(&self, features: &Tensor) -> Result<Tensor> {
        let pooled = features.mean(D::Minus1)?.mean(D::Minus1)?;
        self.fc.forward(&pooled)
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.head(&self.features(x)?)
    }
}
