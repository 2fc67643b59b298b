// src/preprocessing.rs

use crate::error::PipelineError;

// Training-time normalization constants. Inference must match them exactly;
// a drift here degrades accuracy with no runtime signal.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// RGB frame → normalized CHW tensor data for the classifier.
///
/// Steps, in order: bilinear resize to the model input size, scale to
/// [0, 1], per-channel mean/std normalization, HWC → CHW.
pub fn preprocess(
    src: &[u8],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> Result<Vec<f32>, PipelineError> {
    if src.len() != src_width * src_height * 3 {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "frame buffer is {} bytes, expected {}x{}x3",
                src.len(),
                src_width,
                src_height
            ),
        )));
    }

    let resized = resize_bilinear(src, src_width, src_height, dst_width, dst_height);

    let plane = dst_height * dst_width;
    let mut output = vec![0.0f32; 3 * plane];

    for (i, chunk) in resized.chunks_exact(3).enumerate() {
        for c in 0..3 {
            let pixel = chunk[c] as f32 / 255.0;
            output[c * plane + i] = (pixel - MEAN[c]) / STD[c];
        }
    }

    Ok(output)
}

/// Bilinear RGB resize.
fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;

            let sx0 = sx.floor() as usize;
            let sy0 = sy.floor() as usize;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);

            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_chw_sized_for_the_target() {
        let src = vec![128u8; 640 * 480 * 3];
        let out = preprocess(&src, 640, 480, 384, 512).expect("preprocess");
        assert_eq!(out.len(), 3 * 512 * 384);
    }

    #[test]
    fn constant_input_normalizes_per_channel() {
        let src = vec![128u8; 32 * 32 * 3];
        let out = preprocess(&src, 32, 32, 16, 16).expect("preprocess");

        let plane = 16 * 16;
        for c in 0..3 {
            let expected = (128.0 / 255.0 - MEAN[c]) / STD[c];
            for i in 0..plane {
                assert!((out[c * plane + i] - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        let src = vec![0u8; 100];
        assert!(preprocess(&src, 640, 480, 384, 512).is_err());
    }

    #[test]
    fn resize_preserves_uniform_color() {
        let src = vec![255u8; 100 * 100 * 3];
        let dst = resize_bilinear(&src, 100, 100, 50, 50);
        assert_eq!(dst.len(), 50 * 50 * 3);
        assert!(dst.iter().all(|&v| v == 255));
    }
}
