// sequential.rs — Single-threaded reference implementation of all filters.
//
// This is the oracle. Every other engine is validated against it channel
// for channel (tolerance ±1, see tests/test_equivalence.rs).
//
// Traversal is plain nested loops in row-major order, y outer, x inner,
// channel innermost. Pointwise filters run in place on the caller's buffer.
// Box blur and Sobel read the untouched input and write a separate output;
// writing in place would let an already-filtered pixel leak into its
// neighbour's 3×3 window.
//
// Cost: O(w·h) for the pointwise filters, O(9·w·h) for the two
// neighborhood filters.

use crate::engine::Engine;
use crate::error::FilterError;
use crate::filter::{
    box_blur_at, brightness_value, contrast_value, grayscale_value, sobel_at, FilterKind,
    FilterParams, FilterRequest,
};
use crate::image::{RgbImage, CHANNELS};

/// Replace every pixel with its luma, replicated across R, G, B.
pub fn grayscale(img: &mut RgbImage) {
    let (w, h) = (img.width(), img.height());
    let data = img.as_mut_slice();
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * CHANNELS;
            let g = grayscale_value(data[i], data[i + 1], data[i + 2]);
            data[i] = g;
            data[i + 1] = g;
            data[i + 2] = g;
        }
    }
}

/// Add `delta` (clamped to [-1, 1]) to every channel in normalised space.
pub fn brightness(img: &mut RgbImage, delta: f32) {
    let delta = FilterParams { delta, ..Default::default() }.clamped().delta;
    let (w, h) = (img.width(), img.height());
    let data = img.as_mut_slice();
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * CHANNELS;
            for c in 0..CHANNELS {
                data[i + c] = brightness_value(data[i + c], delta);
            }
        }
    }
}

/// Scale every channel around mid-grey by `factor` (clamped to >= 0).
pub fn contrast(img: &mut RgbImage, factor: f32) {
    let factor = FilterParams { factor, ..Default::default() }.clamped().factor;
    let (w, h) = (img.width(), img.height());
    let data = img.as_mut_slice();
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * CHANNELS;
            for c in 0..CHANNELS {
                data[i + c] = contrast_value(data[i + c], factor);
            }
        }
    }
}

/// 3×3 box blur with clamp-to-edge borders. Returns a new image.
pub fn box_blur(src: &RgbImage) -> RgbImage {
    let mut dst = RgbImage::new(src.width(), src.height());
    for y in 0..src.height() {
        for x in 0..src.width() {
            for c in 0..CHANNELS {
                dst[(x, y, c)] = box_blur_at(src, x, y, c);
            }
        }
    }
    dst
}

/// Sobel edge magnitude on luma, replicated across R, G, B. Returns a new
/// image.
pub fn sobel(src: &RgbImage) -> RgbImage {
    let mut dst = RgbImage::new(src.width(), src.height());
    for y in 0..src.height() {
        for x in 0..src.width() {
            let m = sobel_at(src, x, y);
            dst.set_pixel(x, y, [m, m, m]);
        }
    }
    dst
}

/// Apply any request to an owned image, reusing the buffer where the filter
/// allows it.
pub fn apply(request: &FilterRequest, mut img: RgbImage) -> RgbImage {
    let p = request.effective_params();
    match request.kind {
        FilterKind::Grayscale => {
            grayscale(&mut img);
            img
        }
        FilterKind::Brightness => {
            brightness(&mut img, p.delta);
            img
        }
        FilterKind::Contrast => {
            contrast(&mut img, p.factor);
            img
        }
        FilterKind::BoxBlur => box_blur(&img),
        FilterKind::Sobel => sobel(&img),
    }
}

// ---------------------------------------------------------------------------
// SequentialEngine
// ---------------------------------------------------------------------------

/// The reference engine: one thread, deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    pub fn new() -> Self {
        SequentialEngine
    }
}

impl Engine for SequentialEngine {
    fn name(&self) -> &str {
        "sequential"
    }

    fn apply(&self, request: &FilterRequest, image: RgbImage) -> Result<RgbImage, FilterError> {
        image.validate()?;
        Ok(apply(request, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> RgbImage {
        let mut img = RgbImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set_pixel(x, y, [(x * 20) as u8, (y * 30) as u8, ((x + y) * 10) as u8]);
            }
        }
        img
    }

    #[test]
    fn test_grayscale_in_place() {
        let mut img = RgbImage::filled(4, 4, [100, 150, 200]);
        grayscale(&mut img);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(img.pixel(x, y), [141, 141, 141]);
            }
        }
    }

    #[test]
    fn test_brightness_clamps_delta() {
        let mut a = gradient(5, 3);
        let mut b = a.clone();
        brightness(&mut a, 1.0);
        brightness(&mut b, 42.0);
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_contrast_negative_factor_flattens() {
        let mut img = gradient(5, 3);
        contrast(&mut img, -3.0);
        assert!(img.as_slice().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_box_blur_does_not_read_own_output() {
        // A single bright pixel in the middle of a 3×3 black image.
        let mut img = RgbImage::new(3, 3);
        img.set_pixel(1, 1, [90, 90, 90]);
        let out = box_blur(&img);
        // Centre window contains the bright pixel once.
        assert_eq!(out.pixel(1, 1), [10, 10, 10]);
        // Corner (0,0): window rows y=-1,0,1 → 0,0,1; cols x=-1,0,1 → 0,0,1.
        // Only (1,1) is bright and appears once.
        assert_eq!(out.pixel(0, 0), [10, 10, 10]);
        // Input untouched.
        assert_eq!(img.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_sobel_output_is_gray() {
        let out = sobel(&gradient(6, 6));
        for y in 0..6 {
            for x in 0..6 {
                let [r, g, b] = out.pixel(x, y);
                assert!(r == g && g == b, "non-gray Sobel output at ({x},{y})");
            }
        }
    }

    #[test]
    fn test_engine_preserves_shape() {
        let engine = SequentialEngine::new();
        for kind in FilterKind::ALL {
            let req = FilterRequest::new(kind, Default::default());
            let out = engine.apply(&req, gradient(5, 2)).unwrap();
            assert_eq!((out.width(), out.height(), out.channels()), (5, 2, 3), "{kind}");
        }
    }

    #[test]
    fn test_apply_matches_free_functions() {
        let src = gradient(7, 5);
        let via_apply = apply(&FilterRequest::sobel(), src.clone());
        assert_eq!(via_apply, sobel(&src));

        let via_apply = apply(&FilterRequest::contrast(1.7), src.clone());
        let mut expected = src.clone();
        contrast(&mut expected, 1.7);
        assert_eq!(via_apply, expected);
    }
}
