// src/smoothing.rs

use crate::error::PipelineError;
use crate::types::SmoothingConfig;
use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 7;
pub const DEFAULT_EMA_ALPHA: f32 = 0.3;

/// Causal temporal filter over the raw probability sequence.
///
/// Every variant is strictly causal and emits exactly one output per input,
/// in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    /// Raw passthrough.
    None,
    /// Mean of the `window` most recent samples.
    MovingAverage { window: usize },
    /// Exponential moving average with smoothing factor `alpha`.
    Ema { alpha: f32 },
}

impl Smoothing {
    pub fn from_config(cfg: &SmoothingConfig) -> Result<Self, PipelineError> {
        match cfg.method.as_str() {
            "none" => Ok(Smoothing::None),
            "moving_average" => Ok(Smoothing::MovingAverage {
                window: if cfg.window_size == 0 {
                    DEFAULT_WINDOW
                } else {
                    cfg.window_size
                },
            }),
            "ema" => Ok(Smoothing::Ema {
                alpha: if cfg.ema_alpha > 0.0 && cfg.ema_alpha <= 1.0 {
                    cfg.ema_alpha
                } else {
                    DEFAULT_EMA_ALPHA
                },
            }),
            other => Err(PipelineError::InvalidSmoothing(other.to_string())),
        }
    }

    pub fn apply(&self, raw: &[f32]) -> Vec<f32> {
        match *self {
            Smoothing::None => raw.to_vec(),
            Smoothing::MovingAverage { window } => moving_average(raw, window),
            Smoothing::Ema { alpha } => ema(raw, alpha),
        }
    }
}

fn moving_average(raw: &[f32], window: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(raw.len());
    let mut ring: VecDeque<f32> = VecDeque::with_capacity(window);
    let mut sum = 0.0f64;

    for &p in raw {
        if ring.len() == window {
            if let Some(old) = ring.pop_front() {
                sum -= old as f64;
            }
        }
        ring.push_back(p);
        sum += p as f64;
        out.push((sum / ring.len() as f64) as f32);
    }

    out
}

fn ema(raw: &[f32], alpha: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(raw.len());

    for (i, &p) in raw.iter().enumerate() {
        if i == 0 {
            out.push(p);
        } else {
            let prev = out[i - 1];
            out.push(alpha * p + (1.0 - alpha) * prev);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn moving_average_is_identity_on_constant_input() {
        let raw = vec![0.42f32; 20];
        for v in (Smoothing::MovingAverage { window: 7 }).apply(&raw) {
            approx(v, 0.42);
        }
    }

    #[test]
    fn moving_average_warms_up_with_partial_window() {
        let raw = vec![0.9, 0.1, 0.9, 0.1];
        let out = Smoothing::MovingAverage { window: 3 }.apply(&raw);
        approx(out[0], 0.9);
        approx(out[1], 0.5);
        approx(out[2], (0.9 + 0.1 + 0.9) / 3.0);
        approx(out[3], (0.1 + 0.9 + 0.1) / 3.0);
    }

    #[test]
    fn ema_starts_at_first_sample() {
        let raw = vec![0.8, 0.2, 0.6];
        let out = Smoothing::Ema { alpha: 0.3 }.apply(&raw);
        approx(out[0], 0.8);
        approx(out[1], 0.3 * 0.2 + 0.7 * 0.8);
        approx(out[2], 0.3 * 0.6 + 0.7 * out[1]);
    }

    #[test]
    fn ema_output_stays_between_input_and_previous() {
        let raw = vec![0.9, 0.1, 0.9, 0.1, 0.9];
        let out = Smoothing::Ema { alpha: 0.3 }.apply(&raw);
        for i in 1..raw.len() {
            let (lo, hi) = if raw[i] < out[i - 1] {
                (raw[i], out[i - 1])
            } else {
                (out[i - 1], raw[i])
            };
            assert!(out[i] > lo && out[i] < hi);
        }
    }

    #[test]
    fn passthrough_preserves_length_and_values() {
        let raw = vec![0.1, 0.2, 0.3];
        assert_eq!(Smoothing::None.apply(&raw), raw);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let cfg = SmoothingConfig {
            method: "median".to_string(),
            window_size: 7,
            ema_alpha: 0.3,
        };
        assert!(Smoothing::from_config(&cfg).is_err());
    }
}
