// src/classifier.rs

use crate::error::PipelineError;
use crate::gradcam::{GradCam, Heatmap};
use crate::model::QualityNet;
use crate::types::ModelConfig;
use candle_core::{DType, Device, Tensor};
use candle_nn::{ops, VarBuilder};
use std::path::PathBuf;
use tracing::info;

/// Per-frame classifier seam. Implementations must be movable onto the
/// blocking pool; tests drive the pipeline with scripted stand-ins.
pub trait Classifier: Send {
    fn name(&self) -> &'static str;

    /// Probability that the frame shows good road surface, in [0, 1].
    fn predict(&mut self, input: &[f32]) -> Result<f32, PipelineError>;

    /// Localization heatmap for the same input.
    fn explain(&mut self, input: &[f32]) -> Result<Heatmap, PipelineError>;
}

pub struct CnnClassifier {
    net: QualityNet,
    device: Device,
    input_width: usize,
    input_height: usize,
}

impl CnnClassifier {
    pub fn load(cfg: &ModelConfig) -> Result<Self, PipelineError> {
        let path = PathBuf::from(&cfg.path);
        let device = Device::cuda_if_available(0)?;
        info!("Loading checkpoint {} on {:?}", path.display(), device);

        if !path.exists() {
            return Err(PipelineError::ModelLoad {
                path,
                source: candle_core::Error::Msg("checkpoint file not found".to_string()),
            });
        }

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&path], DType::F32, &device) }
            .map_err(|source| PipelineError::ModelLoad {
                path: path.clone(),
                source,
            })?;

        // Shape or naming mismatches against the declared architecture
        // surface here.
        let net = QualityNet::new(vb).map_err(|source| PipelineError::ModelLoad {
            path: path.clone(),
            source,
        })?;

        info!("✓ Classifier ready");
        Ok(Self {
            net,
            device,
            input_width: cfg.input_width,
            input_height: cfg.input_height,
        })
    }

    fn input_tensor(&self, input: &[f32]) -> Result<Tensor, candle_core::Error> {
        Tensor::from_slice(
            input,
            (1, 3, self.input_height, self.input_width),
            &self.device,
        )
    }
}

impl Classifier for CnnClassifier {
    fn name(&self) -> &'static str {
        "quality-net"
    }

    fn predict(&mut self, input: &[f32]) -> Result<f32, PipelineError> {
        let x = self.input_tensor(input)?;
        let logit = self.net.forward(&x)?;
        let prob = ops::sigmoid(&logit)?
            .squeeze(1)?
            .squeeze(0)?
            .to_scalar::<f32>()?;
        Ok(prob)
    }

    fn explain(&mut self, input: &[f32]) -> Result<Heatmap, PipelineError> {
        let x = self.input_tensor(input)?;
        GradCam::new(&self.net).generate(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_net_predicts_at_the_decision_boundary() {
        let device = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &device);
        let mut classifier = CnnClassifier {
            net: QualityNet::new(vb).expect("build net"),
            device,
            input_width: 48,
            input_height: 64,
        };

        let input = vec![0.5f32; 3 * 64 * 48];
        let prob = classifier.predict(&input).expect("predict");
        assert!((0.0..=1.0).contains(&prob));
        assert!((prob - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_checkpoint_is_a_model_load_error() {
        let cfg = ModelConfig {
            path: "does/not/exist.safetensors".to_string(),
            input_width: 48,
            input_height: 64,
        };
        let err = match CnnClassifier::load(&cfg) {
            Err(err) => err,
            Ok(_) => panic!("loading a missing checkpoint should fail"),
        };
        assert!(matches!(err, PipelineError::ModelLoad { .. }), "{err}");
    }
}
