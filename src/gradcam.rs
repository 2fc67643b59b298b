// src/gradcam.rs
//
// Gradient-weighted class activation mapping against the last conv layer.
// Each generate() call is a self-contained forward + backward cycle; the
// (activation, gradient) pair is ordinary local data, so there is no
// capture state to clear between frames and no call-ordering hazard.

use crate::error::PipelineError;
use crate::model::QualityNet;
use candle_core::{Tensor, Var, D};
use ndarray::Array2;

/// Normalized heatmap at the target layer's spatial resolution, values in
/// [0, 1]. All zeros when nothing contributes positively to the class.
pub type Heatmap = Array2<f32>;

pub struct GradCam<'m> {
    net: &'m QualityNet,
}

impl<'m> GradCam<'m> {
    pub fn new(net: &'m QualityNet) -> Self {
        Self { net }
    }

    pub fn generate(&self, input: &Tensor) -> Result<Heatmap, PipelineError> {
        // Forward to the target layer. Model weights are plain tensors, so
        // this pass records no graph.
        let activation = self.net.features(input)?;

        // Root the backward graph at a detached copy of the activation; the
        // channel weighting below reuses the same detached values.
        let leaf = Var::from_tensor(&activation.detach())?;
        let logit = self.net.head(leaf.as_tensor())?;

        // The head has one output neuron, so seeding backward with ones
        // over the [1, 1] logit is the one-hot for class index 0.
        let grads = logit.backward()?;
        let gradient = grads
            .get(leaf.as_tensor())
            .ok_or(PipelineError::MissingGradient)?;

        let activation = activation.squeeze(0)?; // [C, H, W]
        let gradient = gradient.squeeze(0)?; // [C, H, W]
        let (channels, height, width) = gradient.dims3()?;

        // weight[c] = spatial mean of the gradient map.
        let weights = gradient
            .reshape((channels, height * width))?
            .mean(D::Minus1)?;

        let combined = activation
            .broadcast_mul(&weights.reshape((channels, 1, 1))?)?
            .sum(0)?
            .relu()?;

        let max = combined.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        let values = combined.flatten_all()?.to_vec1::<f32>()?;

        // Uniformly non-positive contribution: emit a flat zero map instead
        // of dividing by zero.
        let values: Vec<f32> = if max > 0.0 {
            values.into_iter().map(|v| v / max).collect()
        } else {
            vec![0.0; height * width]
        };

        Ok(Array2::from_shape_vec((height, width), values)
            .expect("heatmap dims match target layer"))
    }
}
