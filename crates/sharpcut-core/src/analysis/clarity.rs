use imageproc::filter::laplacian_filter;
use tracing::debug;

use super::{luminance, AnalysisError};
use crate::video::frame::Frame;

/// Sharpness of a frame: variance of the Laplacian response over its luminance.
///
/// Higher means more high-frequency detail. A flat image scores 0.
pub fn clarity(frame: &Frame) -> Result<f64, AnalysisError> {
    if frame.is_malformed() {
        return Err(AnalysisError::EmptyFrame {
            frame_number: frame.frame_number,
        });
    }

    let response = laplacian_filter(&luminance(&frame.image));
    let score = variance(response.as_raw().iter().map(|&v| v as f64));

    debug!(frame_number = frame.frame_number, score, "clarity scored");
    Ok(score)
}

/// Population variance, computed in one pass.
fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for v in values {
        count += 1;
        let delta = v - mean;
        mean += delta / count as f64;
        m2 += delta * (v - mean);
    }
    if count == 0 {
        0.0
    } else {
        m2 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn frame(image: RgbImage) -> Frame {
        Frame::new(image, 0, 30.0)
    }

    fn checkerboard(w: u32, h: u32, cell: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn flat_frame_scores_zero() {
        let flat = RgbImage::from_pixel(64, 48, Rgb([120, 80, 200]));
        let score = clarity(&frame(flat)).unwrap();
        assert!(score.abs() < 1e-9, "flat frame scored {score}");
    }

    #[test]
    fn checkerboard_beats_blurred_copy() {
        let sharp = checkerboard(64, 64, 4);
        let blurred = image::imageops::blur(&sharp, 2.0);
        let sharp_score = clarity(&frame(sharp)).unwrap();
        let blurred_score = clarity(&frame(blurred)).unwrap();
        assert!(
            sharp_score > blurred_score,
            "sharp {sharp_score} should exceed blurred {blurred_score}"
        );
    }

    #[test]
    fn empty_frame_is_rejected() {
        let err = clarity(&frame(RgbImage::new(0, 0))).unwrap_err();
        assert_eq!(err, AnalysisError::EmptyFrame { frame_number: 0 });
    }

    #[test]
    fn variance_of_known_values() {
        let v = variance([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter());
        assert!((v - 4.0).abs() < 1e-12);
        assert_eq!(variance(std::iter::empty()), 0.0);
    }
}
